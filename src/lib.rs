//! Public API for the statement viewer crate.

pub mod cache;
pub mod client;
pub mod config;
pub mod engine;
pub mod errors;
pub mod models;
pub mod render;
pub mod session;
pub mod validation;
pub mod workflow;

pub use client::StatementClient;
pub use engine::{Reconciler, reconcile, try_reconcile};
pub use errors::{AmountOverflow, FetchError, ValidationError};
pub use models::{Customer, SearchType, StatementResult, StatementRow, Transaction, TxType};
pub use session::Session;
pub use validation::SearchCriteria;
