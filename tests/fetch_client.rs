mod common;

use common::{Reply, client, dead_url, serve};
use statement_viewer::models::Suggestion;
use statement_viewer::validation::CustomerQuery;
use statement_viewer::{FetchError, SearchCriteria, SearchType, TxType};
use std::time::Duration;

#[tokio::test]
async fn statement_request_carries_action_and_criteria() {
    let url = serve(|target| {
        assert!(target.contains("action=generateStatement"), "{target}");
        assert!(target.contains("accountNumber=1234567"), "{target}");
        assert!(target.contains("dateFrom=2024-01-01"), "{target}");
        assert!(!target.contains("dateTo"), "{target}");
        Reply::json(
            r#"[{"desc":"OPENING BALANCE","balance":"1000.00"},
                {"date":"2024-01-05","desc":"ATM","type":"DEBIT","amount":"200"}]"#,
        )
    })
    .await;

    let criteria = SearchCriteria::new("1234567", Some("2024-01-01"), None).unwrap();
    let feed = client(&url).generate_statement(&criteria).await.unwrap();
    assert_eq!(feed.len(), 2);
    assert!(feed[0].is_opening_balance());
    assert_eq!(feed[1].kind, TxType::Debit);
}

#[tokio::test]
async fn jsonp_wrapped_statement_is_accepted() {
    let url = serve(|_| {
        Reply::html(r#"gasCallback([{"desc":"Fee","type":"DEBIT","amount":1}]);"#)
    })
    .await;
    let criteria = SearchCriteria::new("1234567", None, None).unwrap();
    let feed = client(&url).generate_statement(&criteria).await.unwrap();
    assert_eq!(feed[0].amount.as_deref(), Some("1"));
}

#[tokio::test]
async fn object_instead_of_list_is_malformed() {
    let url = serve(|_| Reply::json(r#"{"rows":[]}"#)).await;
    let criteria = SearchCriteria::new("1234567", None, None).unwrap();
    let err = client(&url).generate_statement(&criteria).await.unwrap_err();
    assert!(matches!(err, FetchError::MalformedResponse(_)), "{err:?}");
}

#[tokio::test]
async fn backend_error_object_is_surfaced_verbatim() {
    let url = serve(|_| Reply::json(r#"{"error":{"message":"Account not found"}}"#)).await;
    let criteria = SearchCriteria::new("1234567", None, None).unwrap();
    let err = client(&url).generate_statement(&criteria).await.unwrap_err();
    assert_eq!(err, FetchError::BackendReportedError("Account not found".into()));
    assert_eq!(err.to_string(), "Account not found");
}

#[tokio::test]
async fn quota_page_is_a_backend_error() {
    let url = serve(|_| {
        Reply::html("<html>Service invoked too many times for one day: urlfetch.</html>")
            .status(500)
    })
    .await;
    let err = client(&url).autocomplete_names("Ja").await.unwrap_err();
    assert!(
        matches!(&err, FetchError::BackendReportedError(m) if m.contains("quota")),
        "{err:?}"
    );
    assert!(!err.is_transient());
}

#[tokio::test]
async fn unrecognised_html_is_malformed() {
    let url = serve(|_| Reply::html("<html><body>Moved</body></html>")).await;
    let err = client(&url).autocomplete_names("Ja").await.unwrap_err();
    assert!(matches!(err, FetchError::MalformedResponse(_)), "{err:?}");
}

#[tokio::test]
async fn slow_statement_times_out() {
    let url = serve(|_| Reply::json("[]").after(Duration::from_secs(3))).await;
    let criteria = SearchCriteria::new("1234567", None, None).unwrap();
    let err = client(&url).generate_statement(&criteria).await.unwrap_err();
    assert_eq!(err, FetchError::Timeout);
    assert!(err.is_transient());
}

#[tokio::test]
async fn refused_connection_is_network_unavailable() {
    let url = dead_url().await;
    let err = client(&url).autocomplete_names("Ja").await.unwrap_err();
    assert!(matches!(err, FetchError::NetworkUnavailable(_)), "{err:?}");
}

#[tokio::test]
async fn search_customer_found_and_not_found() {
    let url = serve(|target| {
        assert!(target.contains("action=search"), "{target}");
        assert!(target.contains("type=accountNumber"), "{target}");
        if target.contains("value=1234567") {
            Reply::json(
                r#"{"accountName":"Jane Roe","accountNumber":"1234567",
                    "customerId":"C1","clearBalance":"12.00"}"#,
            )
        } else {
            Reply::json("null")
        }
    })
    .await;
    let c = client(&url);

    let query = CustomerQuery::new(SearchType::AccountNumber, "1234567").unwrap();
    let found = c.search_customer(&query).await.unwrap();
    assert_eq!(found.unwrap().account_name, "Jane Roe");

    let query = CustomerQuery::new(SearchType::AccountNumber, "7654321").unwrap();
    let missing = c.search_customer(&query).await.unwrap();
    assert_eq!(missing, None);
}

#[tokio::test]
async fn autocomplete_returns_backend_order() {
    let url = serve(|target| {
        assert!(target.contains("action=autocomplete"), "{target}");
        assert!(target.contains("value=Ja"), "{target}");
        Reply::json(
            r#"[{"accountName":"Jane Roe","accountNumber":"1234567"},
                {"accountName":"Jack Poe","accountNumber":7654321}]"#,
        )
    })
    .await;
    let suggestions = client(&url).autocomplete_names("Ja").await.unwrap();
    assert_eq!(
        suggestions,
        vec![
            Suggestion {
                account_name: "Jane Roe".into(),
                account_number: "1234567".into(),
            },
            Suggestion {
                account_name: "Jack Poe".into(),
                account_number: "7654321".into(),
            },
        ]
    );
}

#[tokio::test]
async fn connection_test_reports_instead_of_failing() {
    let up = serve(|_| Reply::json(r#"{"status":"ok"}"#)).await;
    let status = client(&up).test_connection().await;
    assert!(status.success);

    let down = dead_url().await;
    let status = client(&down).test_connection().await;
    assert!(!status.success);
    assert!(status.message.contains("cannot connect"), "{}", status.message);
}
