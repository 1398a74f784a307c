//! Common domain types: raw ledger entries as the backend sends them, the
//! reconciled statement, and the customer lookup shapes.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Description the backend puts on the synthetic first row of a statement.
pub const OPENING_BALANCE: &str = "OPENING BALANCE";

/// Direction of a ledger entry.
///
/// The backend sends `"DEBIT"` / `"CREDIT"`; the match is exact and
/// case-sensitive. Anything else (including a missing field) is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TxType {
    #[serde(rename = "DEBIT")]
    Debit,
    #[serde(rename = "CREDIT")]
    Credit,
    #[default]
    #[serde(rename = "")]
    Other,
}

impl From<&str> for TxType {
    fn from(raw: &str) -> Self {
        match raw {
            "DEBIT" => TxType::Debit,
            "CREDIT" => TxType::Credit,
            _ => TxType::Other,
        }
    }
}

impl<'de> Deserialize<'de> for TxType {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let raw = Option::<serde_json::Value>::deserialize(de)?;
        Ok(match raw {
            Some(serde_json::Value::String(s)) => TxType::from(s.as_str()),
            _ => TxType::Other,
        })
    }
}

/// One ledger entry as received from the backend.
///
/// Numeric fields are kept as text: the backend sends numbers, numeric
/// strings, or formatted strings (`"1,250.00"`), and the reconciliation
/// engine owns the lenient parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Transaction {
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: String,
    #[serde(rename = "desc", alias = "description", default, deserialize_with = "lenient_text")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_figure")]
    pub amount: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: TxType,
    #[serde(default, deserialize_with = "lenient_figure")]
    pub balance: Option<String>,
}

impl Transaction {
    pub fn is_opening_balance(&self) -> bool {
        self.description == OPENING_BALANCE
    }
}

/// A rendered line of the statement. `debit` / `credit` hold the display
/// amount for the matching side and are both `None` for unclassified rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementRow {
    pub date: String,
    pub description: String,
    pub debit: Option<Decimal>,
    pub credit: Option<Decimal>,
    pub running_balance: Decimal,
}

/// Output of [`crate::engine::reconcile`]. Never mutated after creation.
///
/// `closing_balance == opening_balance - total_debits + total_credits`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementResult {
    pub rows: Vec<StatementRow>,
    /// `Some` when the feed opened with an opening-balance row; holds that
    /// row's date, which may be empty.
    #[serde(default)]
    pub opening_date: Option<String>,
    pub opening_balance: Decimal,
    pub total_debits: Decimal,
    pub total_credits: Decimal,
    pub closing_balance: Decimal,
}

impl StatementResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Which customer field a search value is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchType {
    #[default]
    AccountName,
    AccountNumber,
    CustomerId,
}

impl SearchType {
    /// Name used on the wire and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            SearchType::AccountName => "accountName",
            SearchType::AccountNumber => "accountNumber",
            SearchType::CustomerId => "customerId",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SearchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accountName" => Ok(SearchType::AccountName),
            "accountNumber" => Ok(SearchType::AccountNumber),
            "customerId" => Ok(SearchType::CustomerId),
            other => Err(format!("unknown search type {other:?}")),
        }
    }
}

/// Customer record returned by a search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(default, deserialize_with = "lenient_text")]
    pub account_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub account_number: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub customer_id: String,
    #[serde(default, deserialize_with = "lenient_figure")]
    pub clear_balance: Option<String>,
}

/// Autocomplete entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    #[serde(default, deserialize_with = "lenient_text")]
    pub account_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub account_number: String,
}

impl Suggestion {
    /// What the user sees for this entry.
    pub fn label(&self) -> &str {
        if !self.account_name.is_empty() {
            &self.account_name
        } else if !self.account_number.is_empty() {
            &self.account_number
        } else {
            "Unknown"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub success: bool,
    pub message: String,
}

// ---------------------------------------------------------------------------
// serde helpers
// ---------------------------------------------------------------------------

/// Strings stay strings, numbers and bools become their text, null/absent is "".
fn lenient_text<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(lenient_figure(de)?.unwrap_or_default())
}

/// Like [`lenient_text`] but keeps "absent" distinguishable.
fn lenient_figure<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    use serde_json::Value;
    Ok(match Option::<Value>::deserialize(de)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_accepts_backend_field_names_and_mixed_figures() {
        let json = r#"{"date":"2024-01-05","desc":"ATM","type":"DEBIT",
            "amount":200,"balance":"800.00"}"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.description, "ATM");
        assert_eq!(tx.kind, TxType::Debit);
        assert_eq!(tx.amount.as_deref(), Some("200"));
        assert_eq!(tx.balance.as_deref(), Some("800.00"));
    }

    #[test]
    fn unknown_or_missing_type_is_other() {
        let tx: Transaction = serde_json::from_str(r#"{"desc":"Adj","type":"debit"}"#).unwrap();
        assert_eq!(tx.kind, TxType::Other);
        let tx: Transaction = serde_json::from_str(r#"{"desc":"Adj","type":null}"#).unwrap();
        assert_eq!(tx.kind, TxType::Other);
        let tx: Transaction = serde_json::from_str(r#"{"description":"Adj"}"#).unwrap();
        assert_eq!(tx.kind, TxType::Other);
        assert_eq!(tx.description, "Adj");
        assert_eq!(tx.amount, None);
    }

    #[test]
    fn customer_tolerates_numeric_fields() {
        let json = r#"{"accountName":"Jane Roe","accountNumber":1234567,
            "customerId":"C-9","clearBalance":1500.5}"#;
        let c: Customer = serde_json::from_str(json).unwrap();
        assert_eq!(c.account_number, "1234567");
        assert_eq!(c.clear_balance.as_deref(), Some("1500.5"));
    }

    #[test]
    fn search_type_round_trips_through_its_wire_name() {
        for t in [SearchType::AccountName, SearchType::AccountNumber, SearchType::CustomerId] {
            assert_eq!(t.as_str().parse::<SearchType>().unwrap(), t);
        }
        assert!("name".parse::<SearchType>().is_err());
    }

    #[test]
    fn suggestion_label_falls_back() {
        let s = Suggestion {
            account_name: String::new(),
            account_number: "123456".into(),
        };
        assert_eq!(s.label(), "123456");
        assert_eq!(Suggestion::default().label(), "Unknown");
    }
}
