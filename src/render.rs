//! Plain-text output: the statement as CSV and the customer / suggestion views.

use crate::errors::Result;
use crate::models::{Customer, OPENING_BALANCE, StatementResult, Suggestion};
use csv::WriterBuilder;
use rust_decimal::{Decimal, RoundingStrategy};
use std::io::Write;

/// Date shown on an opening row the backend sent without one.
const PRIOR: &str = "Prior";

/// Two decimal places, rounded half away from zero.
pub fn money(d: Decimal) -> String {
    format!("{:.2}", d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Write the statement as CSV: header, opening row, transactions, total.
///
/// The opening row is written whenever the feed carried one, dated "Prior"
/// if the backend left its date blank. The total row needs at least one
/// transaction. A statement with neither gets the header only.
pub fn write_statement<W: Write>(sink: W, st: &StatementResult) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(sink);
    wtr.write_record(["date", "description", "debit", "credit", "balance"])?;

    if let Some(date) = st.opening_date.as_deref() {
        let date = if date.is_empty() { PRIOR } else { date };
        let opening = money(st.opening_balance);
        wtr.write_record([date, OPENING_BALANCE, "", "", opening.as_str()])?;
    }

    for row in &st.rows {
        let debit = row.debit.map(money).unwrap_or_default();
        let credit = row.credit.map(money).unwrap_or_default();
        let balance = money(row.running_balance);
        wtr.write_record([
            row.date.as_str(),
            row.description.as_str(),
            debit.as_str(),
            credit.as_str(),
            balance.as_str(),
        ])?;
    }

    if !st.is_empty() {
        let (debits, credits) = (money(st.total_debits), money(st.total_credits));
        let closing = money(st.closing_balance);
        wtr.write_record(["", "TOTAL", debits.as_str(), credits.as_str(), closing.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_customer<W: Write>(mut sink: W, customer: &Customer) -> Result<()> {
    serde_json::to_writer_pretty(&mut sink, customer)?;
    writeln!(sink)?;
    Ok(())
}

pub fn write_suggestions<W: Write>(mut sink: W, suggestions: &[Suggestion]) -> Result<()> {
    for s in suggestions {
        writeln!(sink, "{}\t{}", s.label(), s.account_number)?;
    }
    Ok(())
}
