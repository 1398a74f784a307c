//! Last customer / last statement, persisted as JSON between runs.
//!
//! Entries carry the time they were stored and are ignored once they are
//! older than the freshness window.

use crate::errors::Result;
use crate::models::{Customer, StatementResult};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamped<T> {
    pub stored_at: DateTime<Utc>,
    pub value: T,
}

impl<T> Stamped<T> {
    pub fn new(value: T, stored_at: DateTime<Utc>) -> Self {
        Self { stored_at, value }
    }

    /// Fresh while `now - stored_at < freshness`. Future stamps count as fresh.
    pub fn is_fresh(&self, now: DateTime<Utc>, freshness: Duration) -> bool {
        match (now - self.stored_at).to_std() {
            Ok(age) => age < freshness,
            Err(_) => true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub customer: Option<Stamped<Customer>>,
    /// Account number the statement belongs to, alongside the statement.
    pub statement: Option<Stamped<(String, StatementResult)>>,
}

impl Snapshot {
    /// Drop everything that has gone stale.
    pub fn retain_fresh(mut self, now: DateTime<Utc>, freshness: Duration) -> Self {
        if self.customer.as_ref().is_some_and(|c| !c.is_fresh(now, freshness)) {
            debug!("cached customer expired");
            self.customer = None;
        }
        if self.statement.as_ref().is_some_and(|s| !s.is_fresh(now, freshness)) {
            debug!("cached statement expired");
            self.statement = None;
        }
        self
    }
}

/// Read the snapshot at `path`, keeping only fresh entries.
///
/// A missing or unreadable file is an empty snapshot; the cache is a
/// convenience and never blocks a run.
pub fn load(path: &Path, now: DateTime<Utc>, freshness: Duration) -> Snapshot {
    if !path.exists() {
        return Snapshot::default();
    }
    match read(path) {
        Ok(snap) => snap.retain_fresh(now, freshness),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable cache");
            Snapshot::default()
        }
    }
}

fn read(path: &Path) -> Result<Snapshot> {
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))
}

pub fn save(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let s = serde_json::to_string_pretty(snapshot).context("serialize cache")?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Load, apply `edit`, save. Stale entries are dropped on the way through.
pub fn update(
    path: &Path,
    now: DateTime<Utc>,
    freshness: Duration,
    edit: impl FnOnce(&mut Snapshot),
) -> Result<()> {
    let mut snap = load(path, now, freshness);
    edit(&mut snap);
    save(path, &snap)
}
