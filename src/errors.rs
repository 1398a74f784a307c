//! Error types.
//!
//! The binary and the glue modules (config, cache, rendering) return the
//! `anyhow`-backed [`Result`] alias. The two places where a caller has to
//! branch on the *kind* of failure get their own typed enums.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, anyhow::Error>;

/// Everything a single backend call can fail with.
///
/// None of these are retried by the client; retrying is the caller's call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// No complete response within the request's time bound.
    #[error("request timed out")]
    Timeout,

    /// The transport could not reach the backend.
    #[error("cannot connect to the statement backend: {0}")]
    NetworkUnavailable(String),

    /// The backend answered with something we cannot interpret.
    #[error("invalid response from the statement backend: {0}")]
    MalformedResponse(String),

    /// The backend explicitly said the call failed. Shown to the user as-is.
    #[error("{0}")]
    BackendReportedError(String),
}

impl FetchError {
    /// `true` for the failures a user can reasonably retry straight away.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Timeout | FetchError::NetworkUnavailable(_))
    }
}

/// A statement whose amounts or sums do not fit in a `Decimal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("statement amounts exceed the supported range")]
pub struct AmountOverflow;

/// Caller-side input checks, run before any request is issued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("account number must be 6 to 13 digits, got {0:?}")]
    InvalidAccountNumber(String),

    #[error("{field} must be a YYYY-MM-DD date, got {value:?}")]
    InvalidDate { field: &'static str, value: String },

    #[error("From date cannot be after To date")]
    DateRangeInverted,

    #[error("Please enter a search value")]
    EmptySearchValue,
}
