//! Per-user display state: the current customer and the current statement.
//!
//! Each slot hands out a [`RequestToken`] when a fetch starts. A result is
//! only applied if its token is still the newest one for that slot and has
//! not been expired by a timeout, so an overtaken or late response can never
//! overwrite what is on screen.

use crate::models::{Customer, StatementResult};
use std::sync::Arc;

/// Identity of one fetch against one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken(u64);

/// A value plus the generation counter guarding writes to it.
#[derive(Debug)]
pub struct Slot<T> {
    generation: u64,
    current: Option<Arc<T>>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            generation: 0,
            current: None,
        }
    }
}

impl<T> Slot<T> {
    /// Start a new request. Every earlier token for this slot becomes stale.
    pub fn begin(&mut self) -> RequestToken {
        self.generation += 1;
        RequestToken(self.generation)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.generation
    }

    /// Give up on `token` (its time bound ran out). A newer request is left alone.
    pub fn expire(&mut self, token: RequestToken) {
        if self.is_current(token) {
            self.generation += 1;
        }
    }

    /// Replace the current value if `token` is still current.
    ///
    /// Returns the stored value, or `None` when the result was stale and dropped.
    pub fn commit(&mut self, token: RequestToken, value: T) -> Option<Arc<T>> {
        if !self.is_current(token) {
            return None;
        }
        let value = Arc::new(value);
        self.current = Some(Arc::clone(&value));
        Some(value)
    }

    /// Clear the value if `token` is still current (e.g. a search found nothing).
    pub fn clear(&mut self, token: RequestToken) -> bool {
        if !self.is_current(token) {
            return false;
        }
        self.current = None;
        true
    }

    pub fn current(&self) -> Option<Arc<T>> {
        self.current.clone()
    }
}

/// Explicit session context; the reconciliation engine never touches it.
#[derive(Debug, Default)]
pub struct Session {
    pub customer: Slot<Customer>,
    pub statement: Slot<StatementResult>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from previously cached values without issuing a request.
    pub fn restore(&mut self, customer: Option<Customer>, statement: Option<StatementResult>) {
        if let Some(c) = customer {
            let token = self.customer.begin();
            self.customer.commit(token, c);
        }
        if let Some(s) = statement {
            let token = self.statement.begin();
            self.statement.commit(token, s);
        }
    }
}
