//! HTTP client for the spreadsheet-backed script endpoint.
//!
//! Every call is a single `GET {base_url}?action=<name>&…` with its own time
//! bound. Nothing is retried here; failures come back as a [`FetchError`]
//! and the caller decides what to do with them.

use crate::config::BackendSection;
use crate::errors::{FetchError, Result};
use crate::models::{ConnectionStatus, Customer, Suggestion, Transaction};
use crate::validation::{CustomerQuery, SearchCriteria};
use anyhow::Context;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Marker the script host puts in its HTML page when the daily quota is gone.
const QUOTA_MARKER: &str = "Service invoked too many times";

pub struct StatementClient {
    http: reqwest::Client,
    base_url: String,
    lookup_timeout: Duration,
    statement_timeout: Duration,
}

impl StatementClient {
    pub fn new(backend: &BackendSection) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if !backend.use_system_proxy {
            builder = builder.no_proxy();
        }
        let http = builder.build().context("build HTTP client")?;
        Ok(Self {
            http,
            base_url: backend.base_url.trim().to_string(),
            lookup_timeout: backend.lookup_timeout(),
            statement_timeout: backend.statement_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `Ok(None)` when the backend found no matching customer.
    pub async fn search_customer(
        &self,
        query: &CustomerQuery,
    ) -> std::result::Result<Option<Customer>, FetchError> {
        let params = [
            ("type", Some(query.by().as_str().to_string())),
            ("value", Some(query.value().to_string())),
        ];
        let payload = self.call("search", &params, self.lookup_timeout).await?;
        if is_not_found(&payload) {
            return Ok(None);
        }
        decode(payload).map(Some)
    }

    /// Name suggestions; matching happens entirely on the backend.
    pub async fn autocomplete_names(
        &self,
        prefix: &str,
    ) -> std::result::Result<Vec<Suggestion>, FetchError> {
        let params = [("value", Some(prefix.to_string()))];
        match self.call("autocomplete", &params, self.lookup_timeout).await? {
            Value::Null => Ok(Vec::new()),
            payload => decode(payload),
        }
    }

    /// Raw ledger feed for an account, in the backend's order.
    ///
    /// Anything other than a JSON array is a [`FetchError::MalformedResponse`].
    pub async fn generate_statement(
        &self,
        criteria: &SearchCriteria,
    ) -> std::result::Result<Vec<Transaction>, FetchError> {
        let params = [
            ("accountNumber", Some(criteria.account_number().to_string())),
            ("dateFrom", criteria.date_from().map(|d| d.to_string())),
            ("dateTo", criteria.date_to().map(|d| d.to_string())),
        ];
        let payload = self.call("generateStatement", &params, self.statement_timeout).await?;
        if !payload.is_array() {
            return Err(FetchError::MalformedResponse(format!(
                "expected a transaction list, got {}",
                kind_of(&payload)
            )));
        }
        decode(payload)
    }

    /// Never fails: a failed check is reported through the status itself.
    pub async fn test_connection(&self) -> ConnectionStatus {
        match self.call("test", &[], self.lookup_timeout).await {
            Ok(_) => ConnectionStatus {
                success: true,
                message: "Connected to the statement backend".to_string(),
            },
            Err(e) => ConnectionStatus {
                success: false,
                message: e.to_string(),
            },
        }
    }

    async fn call(
        &self,
        action: &str,
        params: &[(&str, Option<String>)],
        timeout: Duration,
    ) -> std::result::Result<Value, FetchError> {
        let mut query: Vec<(&str, &str)> = vec![("action", action)];
        query.extend(params.iter().filter_map(|(k, v)| v.as_deref().map(|v| (*k, v))));

        let started = Instant::now();
        debug!(action, timeout_ms = timeout.as_millis() as u64, "backend request");

        let outcome = async {
            let resp = self
                .http
                .get(&self.base_url)
                .query(&query)
                .timeout(timeout)
                .send()
                .await
                .map_err(transport_error)?;
            let status = resp.status();
            let body = resp.text().await.map_err(transport_error)?;
            classify_response(status.as_u16(), status.canonical_reason(), &body)
        }
        .await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(_) => debug!(action, elapsed_ms, "backend response"),
            Err(e) => warn!(action, elapsed_ms, error = %e, "backend request failed"),
        }
        outcome
    }
}

fn transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::NetworkUnavailable(err.to_string())
    }
}

/// Fold an HTTP status and body into a payload or a classified failure.
pub fn classify_response(
    status: u16,
    reason: Option<&str>,
    body: &str,
) -> std::result::Result<Value, FetchError> {
    if (200..300).contains(&status) {
        return classify_body(body);
    }
    match classify_body(body) {
        Err(e @ FetchError::BackendReportedError(_)) => Err(e),
        _ => Err(FetchError::BackendReportedError(format!(
            "backend answered HTTP {status} {}",
            reason.unwrap_or_default()
        )
        .trim_end()
        .to_string())),
    }
}

/// Classify a response body.
///
/// * JSON (optionally wrapped as `callback(…)`) is the payload, unless it is
///   an object carrying a truthy `error` member.
/// * Non-JSON text is checked for the host's quota page and for generic
///   error markers.
/// * Anything else is malformed.
pub fn classify_body(body: &str) -> std::result::Result<Value, FetchError> {
    let json = unwrap_jsonp(body).unwrap_or(body);
    match serde_json::from_str::<Value>(json) {
        Ok(value) => match reported_error(&value) {
            Some(message) => Err(FetchError::BackendReportedError(message)),
            None => Ok(value),
        },
        Err(_) => Err(classify_text(body)),
    }
}

fn classify_text(body: &str) -> FetchError {
    if body.contains(QUOTA_MARKER) {
        return FetchError::BackendReportedError(
            "backend quota exceeded, please try again later".to_string(),
        );
    }
    let lower = body.to_ascii_lowercase();
    if lower.contains("error") || lower.contains("exception") {
        return FetchError::BackendReportedError("backend returned an error".to_string());
    }
    FetchError::MalformedResponse(snippet(body))
}

/// `{"error": …}` in any of the shapes the backend has used.
fn reported_error(value: &Value) -> Option<String> {
    let err = value.as_object()?.get("error")?;
    match err {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(o) => Some(
            o.get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or("backend reported an error")
                .to_string(),
        ),
        _ => Some("backend reported an error".to_string()),
    }
}

fn jsonp_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*[A-Za-z_$][\w$.]*\s*\((?s)(.*)\)\s*;?\s*$").expect("static regex")
    })
}

/// Inner text of a `name(…);` response, if the body has that shape.
fn unwrap_jsonp(body: &str) -> Option<&str> {
    jsonp_pattern()
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn is_not_found(payload: &Value) -> bool {
    match payload {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn decode<T: DeserializeOwned>(payload: Value) -> std::result::Result<T, FetchError> {
    serde_json::from_value(payload).map_err(|e| FetchError::MalformedResponse(e.to_string()))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn snippet(body: &str) -> String {
    const MAX: usize = 80;
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None if trimmed.is_empty() => "empty body".to_string(),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_json_is_the_payload() {
        assert_eq!(classify_body(r#"[{"desc":"x"}]"#), Ok(json!([{"desc": "x"}])));
        assert_eq!(classify_body("null"), Ok(Value::Null));
    }

    #[test]
    fn jsonp_wrapper_is_unwrapped() {
        assert_eq!(classify_body("gasCallback({\"ok\":true});"), Ok(json!({"ok": true})));
        assert_eq!(classify_body("  cb.handle([1,\n2])  "), Ok(json!([1, 2])));
    }

    #[test]
    fn error_objects_are_backend_errors() {
        assert_eq!(
            classify_body(r#"{"error":{"message":"Sheet not found"}}"#),
            Err(FetchError::BackendReportedError("Sheet not found".into()))
        );
        assert_eq!(
            classify_body(r#"{"error":"Account locked"}"#),
            Err(FetchError::BackendReportedError("Account locked".into()))
        );
        assert_eq!(
            classify_body(r#"{"error":{}}"#),
            Err(FetchError::BackendReportedError("backend reported an error".into()))
        );
        assert_eq!(classify_body(r#"{"error":null,"x":1}"#), Ok(json!({"error": null, "x": 1})));
    }

    #[test]
    fn html_pages_are_classified_by_marker() {
        let quota = "<html><body>Service invoked too many times for one day</body></html>";
        assert!(matches!(
            classify_body(quota),
            Err(FetchError::BackendReportedError(m)) if m.contains("quota")
        ));
        let exception = "<html>TypeError: Cannot read property 'x'</html>";
        assert_eq!(
            classify_body(exception),
            Err(FetchError::BackendReportedError("backend returned an error".into()))
        );
        assert!(matches!(
            classify_body("<html>hello</html>"),
            Err(FetchError::MalformedResponse(_))
        ));
        assert_eq!(
            classify_body(""),
            Err(FetchError::MalformedResponse("empty body".into()))
        );
    }

    #[test]
    fn non_success_status_prefers_backend_message() {
        assert_eq!(
            classify_response(500, Some("Internal Server Error"), r#"{"error":"boom"}"#),
            Err(FetchError::BackendReportedError("boom".into()))
        );
        assert_eq!(
            classify_response(502, Some("Bad Gateway"), "[]"),
            Err(FetchError::BackendReportedError("backend answered HTTP 502 Bad Gateway".into()))
        );
        assert_eq!(
            classify_response(599, None, "<html></html>"),
            Err(FetchError::BackendReportedError("backend answered HTTP 599".into()))
        );
    }

    #[test]
    fn not_found_shapes() {
        assert!(is_not_found(&Value::Null));
        assert!(is_not_found(&json!(false)));
        assert!(is_not_found(&json!("")));
        assert!(is_not_found(&json!({})));
        assert!(!is_not_found(&json!({"accountName": "A"})));
    }

    #[test]
    fn long_bodies_are_shortened_in_errors() {
        let body = "x".repeat(200);
        let s = snippet(&body);
        assert!(s.ends_with('…'));
        assert_eq!(s.chars().count(), 81);
    }
}
