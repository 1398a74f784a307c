//! Statement reconciliation: feed the backend's ledger entries in order,
//! then take the finished [`StatementResult`].
//!
//! Most callers want the one-shot [`reconcile`].

use crate::errors::AmountOverflow;
use crate::models::{StatementResult, StatementRow, Transaction, TxType};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::str::FromStr;

/// Single-pass reconciler.
///
/// ```rust
/// use statement_viewer::engine::Reconciler;
/// # let feed: Vec<statement_viewer::Transaction> = Vec::new();
/// let mut rec = Reconciler::new();
/// for tx in &feed {
///     rec.process(tx);
/// }
/// let statement = rec.finish();
/// assert_eq!(statement.closing_balance, statement.opening_balance);
/// ```
#[derive(Debug, Default)]
pub struct Reconciler {
    started: bool,
    opening_date: Option<String>,
    opening_balance: Decimal,
    running_balance: Decimal,
    total_debits: Decimal,
    total_credits: Decimal,
    rows: Vec<StatementRow>,
    /// Some figure or sum fell outside `Decimal`'s range and was saturated.
    overflowed: bool,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the next entry of the feed.
    ///
    /// * Only the very first entry may be the opening-balance sentinel; it
    ///   seeds the balance and produces no row.
    /// * Entries that are neither `DEBIT` nor `CREDIT` still get a row but
    ///   leave the balance alone.
    /// * The backend's own `balance` on ordinary rows is ignored.
    /// * Sums saturate at `Decimal::MAX` / `Decimal::MIN` instead of
    ///   panicking; [`Reconciler::overflowed`] reports it.
    pub fn process(&mut self, tx: &Transaction) {
        let first = !self.started;
        self.started = true;

        if first && tx.is_opening_balance() {
            self.opening_date = Some(tx.date.clone());
            self.opening_balance = self.read(tx.balance.as_deref());
            self.running_balance = self.opening_balance;
            return;
        }

        let amount = self.read(tx.amount.as_deref());
        let (debit, credit) = match tx.kind {
            TxType::Debit => {
                self.total_debits = self.add(self.total_debits, amount);
                self.running_balance = self.sub(self.running_balance, amount);
                (Some(amount), None)
            }
            TxType::Credit => {
                self.total_credits = self.add(self.total_credits, amount);
                self.running_balance = self.add(self.running_balance, amount);
                (None, Some(amount))
            }
            TxType::Other => (None, None),
        };

        self.rows.push(StatementRow {
            date: tx.date.clone(),
            description: tx.description.clone(),
            debit,
            credit,
            running_balance: self.running_balance,
        });
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    pub fn finish(self) -> StatementResult {
        StatementResult {
            rows: self.rows,
            opening_date: self.opening_date,
            opening_balance: self.opening_balance,
            total_debits: self.total_debits,
            total_credits: self.total_credits,
            closing_balance: self.running_balance,
        }
    }

    /// Like [`Reconciler::finish`], but refuses a statement whose figures
    /// had to be saturated.
    pub fn try_finish(self) -> Result<StatementResult, AmountOverflow> {
        if self.overflowed {
            return Err(AmountOverflow);
        }
        Ok(self.finish())
    }

    fn read(&mut self, raw: Option<&str>) -> Decimal {
        let Some(raw) = raw else {
            return Decimal::ZERO;
        };
        let (value, clamped) = read_amount(raw);
        self.overflowed |= clamped;
        value
    }

    fn add(&mut self, a: Decimal, b: Decimal) -> Decimal {
        a.checked_add(b).unwrap_or_else(|| {
            self.overflowed = true;
            a.saturating_add(b)
        })
    }

    fn sub(&mut self, a: Decimal, b: Decimal) -> Decimal {
        a.checked_sub(b).unwrap_or_else(|| {
            self.overflowed = true;
            a.saturating_sub(b)
        })
    }
}

/// Reconcile a whole feed. Pure: the same input always gives the same result.
///
/// Never fails; out-of-range figures saturate. Use [`try_reconcile`] to
/// reject such a feed instead.
pub fn reconcile(feed: &[Transaction]) -> StatementResult {
    let mut rec = Reconciler::new();
    for tx in feed {
        rec.process(tx);
    }
    rec.finish()
}

/// Reconcile a whole feed, failing if any figure or sum leaves `Decimal`'s range.
pub fn try_reconcile(feed: &[Transaction]) -> Result<StatementResult, AmountOverflow> {
    let mut rec = Reconciler::new();
    for tx in feed {
        rec.process(tx);
    }
    rec.try_finish()
}

/// Lenient amount parse.
///
/// Drops everything except digits, `.` and `-` (currency symbols, thousands
/// separators, spaces), then reads the longest leading `-?digits[.digits]`.
/// No digits at all means zero. Numbers too large for a `Decimal` clamp to
/// `Decimal::MAX` / `Decimal::MIN`.
pub fn parse_amount(raw: &str) -> Decimal {
    read_amount(raw).0
}

/// [`parse_amount`], plus whether the value had to be clamped.
fn read_amount(raw: &str) -> (Decimal, bool) {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    let bytes = cleaned.as_bytes();
    let mut end = 0;
    if bytes.first() == Some(&b'-') {
        end = 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }
    if digits == 0 {
        return (Decimal::ZERO, false);
    }

    let mut prefix = &cleaned[..end];
    // "-.5" / ".5" are valid floats but not valid Decimal text.
    let padded;
    if prefix.starts_with("-.") || prefix.starts_with('.') {
        padded = prefix.replacen('.', "0.", 1);
        prefix = &padded;
    }
    if let Ok(d) = Decimal::from_str(prefix) {
        return (d, false);
    }
    // Too many digits for exact text parsing: go through f64, and clamp
    // whatever still does not fit.
    let approx = prefix.parse::<f64>().ok().and_then(Decimal::from_f64);
    match approx {
        Some(d) => (d, false),
        None if prefix.starts_with('-') => (Decimal::MIN, true),
        None => (Decimal::MAX, true),
    }
}
