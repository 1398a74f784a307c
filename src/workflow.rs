//! Controller operations: validate, fetch, reconcile, then commit to the
//! session if the result is still wanted.
//!
//! The session sits in a `RefCell` because everything runs on one thread;
//! no borrow is ever held across an `.await`.

use crate::client::StatementClient;
use crate::engine::try_reconcile;
use crate::errors::FetchError;
use crate::models::{Customer, StatementResult};
use crate::session::{RequestToken, Session, Slot};
use crate::validation::{CustomerQuery, SearchCriteria};
use std::cell::RefCell;
use std::sync::Arc;
use tracing::{debug, info};

/// What happened to a completed fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// Result is now the session's current value.
    Applied(T),
    /// A newer request superseded this one; the result was dropped.
    Stale,
}

impl<T> Outcome<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(v) => Some(v),
            Outcome::Stale => None,
        }
    }
}

/// Fetch and reconcile a statement, then make it the current one.
///
/// On failure the current statement is left as it was; on timeout the
/// request's token is expired so nothing can land for it later.
pub async fn generate_statement(
    session: &RefCell<Session>,
    client: &StatementClient,
    criteria: &SearchCriteria,
) -> Result<Outcome<Arc<StatementResult>>, FetchError> {
    let token = session.borrow_mut().statement.begin();
    let fetched = client.generate_statement(criteria).await;
    let feed = settle(session, token, |s| &mut s.statement, fetched)?;

    let result =
        try_reconcile(&feed).map_err(|e| FetchError::MalformedResponse(e.to_string()))?;
    info!(
        account = criteria.account_number(),
        rows = result.rows.len(),
        closing = %result.closing_balance,
        "statement reconciled"
    );

    match session.borrow_mut().statement.commit(token, result) {
        Some(current) => Ok(Outcome::Applied(current)),
        None => {
            debug!(account = criteria.account_number(), "discarding superseded statement");
            Ok(Outcome::Stale)
        }
    }
}

/// Look a customer up and make it the current one. `Applied(None)` means
/// the backend found nothing and the current customer was cleared.
pub async fn search_customer(
    session: &RefCell<Session>,
    client: &StatementClient,
    query: &CustomerQuery,
) -> Result<Outcome<Option<Arc<Customer>>>, FetchError> {
    let token = session.borrow_mut().customer.begin();
    let fetched = client.search_customer(query).await;
    let found = settle(session, token, |s| &mut s.customer, fetched)?;

    let mut session = session.borrow_mut();
    let outcome = match found {
        Some(customer) => session.customer.commit(token, customer).map(Some),
        None => session.customer.clear(token).then_some(None),
    };
    Ok(match outcome {
        Some(v) => Outcome::Applied(v),
        None => {
            debug!(by = %query.by(), "discarding superseded customer search");
            Outcome::Stale
        }
    })
}

/// Expire the token of a timed-out request, then pass the result through.
fn settle<T, V>(
    session: &RefCell<Session>,
    token: RequestToken,
    slot: impl FnOnce(&mut Session) -> &mut Slot<T>,
    result: Result<V, FetchError>,
) -> Result<V, FetchError> {
    if let Err(FetchError::Timeout) = &result {
        slot(&mut *session.borrow_mut()).expire(token);
    }
    result
}
