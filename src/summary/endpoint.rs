//! The cash flow summary endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, Query, State},
};
use rusqlite::Connection;
use serde::Deserialize;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::{
    AccountId, AppState, Error,
    account::get_account,
    calendar::{add_days, parse_iso_date},
    db::lock_connection,
    summary::aggregation::{CashFlowSummary, SummaryEntry, summarize, summary_start},
    timezone::{get_local_offset, local_midnight_utc},
};

/// The state needed for the summary.
#[derive(Debug, Clone)]
pub struct SummaryState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for SummaryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The query parameters for the summary.
#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    /// Summarize the twelve months ending with this date (`YYYY-MM-DD`), defaults to today.
    pub as_of: Option<String>,
}

/// The cash flow of an account over the last twelve months.
pub async fn get_summary_endpoint(
    State(state): State<SummaryState>,
    Path(account_id): Path<AccountId>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<CashFlowSummary>, Error> {
    let local_offset = get_local_offset(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;
    let as_of = match query.as_of.as_deref() {
        Some(as_of) => parse_iso_date(as_of)?,
        None => OffsetDateTime::now_utc().to_offset(local_offset).date(),
    };

    let connection = lock_connection(&state.db_connection)?;
    get_account(account_id, &connection)?;

    let entries = get_summary_entries(account_id, as_of, local_offset, &connection)?;

    Ok(Json(summarize(&entries, as_of)))
}

/// The transactions of an account from the start of the summary window up to
/// the end of `as_of`, with their dates in `local_offset`.
fn get_summary_entries(
    account_id: AccountId,
    as_of: Date,
    local_offset: UtcOffset,
    connection: &Connection,
) -> Result<Vec<SummaryEntry>, Error> {
    let start = local_midnight_utc(summary_start(as_of), local_offset);
    let end = local_midnight_utc(
        add_days(as_of, 1).ok_or(Error::DateOutOfRange(as_of))?,
        local_offset,
    );

    connection
        .prepare(
            "SELECT t.occurred_at, t.amount, c.name
             FROM \"transaction\" t
             LEFT JOIN category c ON t.category_id = c.id
             WHERE t.account_id = ?1 AND t.occurred_at >= ?2 AND t.occurred_at < ?3
             ORDER BY t.occurred_at ASC",
        )?
        .query_map((account_id, start, end), |row| {
            let occurred_at: OffsetDateTime = row.get(0)?;

            Ok(SummaryEntry {
                local_date: occurred_at.to_offset(local_offset).date(),
                amount: row.get(1)?,
                category_name: row.get(2)?,
            })
        })?
        .map(|maybe_entry| maybe_entry.map_err(|error| error.into()))
        .collect()
}
