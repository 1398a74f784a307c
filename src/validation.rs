//! Caller-side checks that run before anything is sent to the backend.

use crate::errors::ValidationError;
use crate::models::SearchType;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

fn account_number_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]{6,13}$").expect("static regex"))
}

fn iso_date_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("static regex"))
}

/// Validated request for a statement.
///
/// Only obtainable through [`SearchCriteria::new`], so holding one means the
/// account number and date range already passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    account_number: String,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
}

impl SearchCriteria {
    /// Blank date strings count as "not given".
    pub fn new(
        account_number: &str,
        date_from: Option<&str>,
        date_to: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let account_number = self::account_number(account_number)?;
        let date_from = parse_date("from", date_from)?;
        let date_to = parse_date("to", date_to)?;
        if let (Some(from), Some(to)) = (date_from, date_to) {
            if from > to {
                return Err(ValidationError::DateRangeInverted);
            }
        }
        Ok(Self {
            account_number: account_number.to_string(),
            date_from,
            date_to,
        })
    }

    pub fn account_number(&self) -> &str {
        &self.account_number
    }

    pub fn date_from(&self) -> Option<NaiveDate> {
        self.date_from
    }

    pub fn date_to(&self) -> Option<NaiveDate> {
        self.date_to
    }
}

fn parse_date(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<NaiveDate>, ValidationError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let invalid = || ValidationError::InvalidDate {
        field,
        value: raw.to_string(),
    };
    if !iso_date_pattern().is_match(raw) {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| invalid())
}

/// Trimmed account number of 6 to 13 ASCII digits.
pub fn account_number(raw: &str) -> Result<&str, ValidationError> {
    let trimmed = raw.trim();
    if !account_number_pattern().is_match(trimmed) {
        return Err(ValidationError::InvalidAccountNumber(trimmed.to_string()));
    }
    Ok(trimmed)
}

/// Trimmed, non-empty search value.
pub fn search_value(raw: &str) -> Result<&str, ValidationError> {
    match raw.trim() {
        "" => Err(ValidationError::EmptySearchValue),
        v => Ok(v),
    }
}

/// Validated customer search.
///
/// Every value must be non-empty; account-number searches must also be a
/// well-formed account number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerQuery {
    by: SearchType,
    value: String,
}

impl CustomerQuery {
    pub fn new(by: SearchType, value: &str) -> Result<Self, ValidationError> {
        let value = search_value(value)?;
        let value = match by {
            SearchType::AccountNumber => account_number(value)?,
            SearchType::AccountName | SearchType::CustomerId => value,
        };
        Ok(Self {
            by,
            value: value.to_string(),
        })
    }

    pub fn by(&self) -> SearchType {
        self.by
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}
