//! Ledger history queries
//!
//! Two views over a `LedgerLog`: the most recent entries for a user, newest
//! first, and a monthly statement, oldest first, with human-readable dates.

use crate::core::ledger::{LedgerFilter, SortOrder};
use crate::core::traits::LedgerLog;
use crate::types::{
    AccountId, Balance, HistoryError, LedgerEntry, LedgerError, LedgerStatus, Timestamp,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;

const STATEMENT_DATE_FORMAT: &str = "%d %b %Y";

/// Statement request for one calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementQuery {
    pub user_id: AccountId,
    /// 1 through 12
    pub month: u32,
    pub year: i32,
}

impl StatementQuery {
    pub fn new(user_id: AccountId, month: u32, year: i32) -> Self {
        StatementQuery {
            user_id,
            month,
            year,
        }
    }

    /// Inclusive UTC timestamp window covering the whole month
    pub fn window(&self) -> Result<(Timestamp, Timestamp), HistoryError> {
        if !(1..=12).contains(&self.month) {
            return Err(HistoryError::InvalidMonth { month: self.month });
        }
        if self.year < 0 {
            return Err(HistoryError::InvalidYear { year: self.year });
        }

        let invalid_year = || HistoryError::InvalidYear { year: self.year };
        let first = NaiveDate::from_ymd_opt(self.year, self.month, 1).ok_or_else(invalid_year)?;
        let next = if self.month == 12 {
            NaiveDate::from_ymd_opt(self.year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(self.year, self.month + 1, 1)
        }
        .ok_or_else(invalid_year)?;

        let start = first.and_hms_opt(0, 0, 0).ok_or_else(invalid_year)?;
        let end = next.and_hms_opt(0, 0, 0).ok_or_else(invalid_year)?;

        let from = Utc.from_utc_datetime(&start).timestamp();
        let to = Utc.from_utc_datetime(&end).timestamp() - 1;
        Ok((from, to))
    }
}

/// One row of a monthly statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementLine {
    pub sender_id: AccountId,
    pub receiver_id: AccountId,
    pub amount: Balance,
    pub remarks: String,
    /// `DD Mon YYYY`, in UTC
    pub date: String,
    pub status: LedgerStatus,
}

impl From<LedgerEntry> for StatementLine {
    fn from(entry: LedgerEntry) -> Self {
        StatementLine {
            sender_id: entry.sender_id,
            receiver_id: entry.receiver_id,
            amount: entry.amount,
            remarks: entry.remarks,
            date: format_date(entry.timestamp),
            status: entry.status,
        }
    }
}

fn format_date(timestamp: Timestamp) -> String {
    match DateTime::<Utc>::from_timestamp(timestamp, 0) {
        Some(at) => at.format(STATEMENT_DATE_FORMAT).to_string(),
        None => timestamp.to_string(),
    }
}

/// Entries involving the user, newest first, at most `limit`
pub fn recent_activity<L: LedgerLog + ?Sized>(
    ledger: &L,
    user_id: AccountId,
    limit: usize,
) -> Result<Vec<LedgerEntry>, LedgerError> {
    let filter = LedgerFilter::for_user(user_id)
        .order(SortOrder::Descending)
        .limit(limit);
    ledger.scan(&filter)
}

/// Statement lines for the requested month, oldest first
///
/// # Errors
///
/// `InvalidMonth`/`InvalidYear` for a malformed query, `NotFound` when the
/// month holds no entries for the user.
pub fn monthly_statement<L: LedgerLog + ?Sized>(
    ledger: &L,
    query: &StatementQuery,
) -> Result<Vec<StatementLine>, HistoryError> {
    let (from, to) = query.window()?;
    let filter = LedgerFilter::for_user(query.user_id).between(from, to);

    let lines: Vec<StatementLine> = ledger
        .scan(&filter)?
        .into_iter()
        .map(StatementLine::from)
        .collect();

    if lines.is_empty() {
        return Err(HistoryError::NotFound);
    }
    Ok(lines)
}
