//! The endpoint that posts the due recurring rules of an account.

use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use axum::{
    Json,
    extract::{FromRef, Path, Query, State},
};
use rusqlite::Connection;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    AccountId, AppState, Error,
    account::get_account,
    calendar::parse_iso_date,
    db::lock_connection,
    recurring::{RunReport, RunRequest, SQLiteRuleStore, run_due},
    timezone::local_today,
    transaction::SQLiteLedger,
};

/// The state needed for running recurring rules.
#[derive(Debug, Clone)]
pub struct RunRulesState {
    /// The database connection for reading rules and posting entries.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// How long a single run may take before the remaining rules are deferred.
    pub run_timeout: Duration,
}

impl FromRef<AppState> for RunRulesState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            run_timeout: state.run_timeout,
        }
    }
}

/// The query parameters for a run.
#[derive(Debug, Default, Deserialize)]
pub struct RunQuery {
    /// Run the rules due on or before this date (`YYYY-MM-DD`), defaults to today.
    pub as_of: Option<String>,
}

/// Post every due recurring rule of an account and report the outcome of each.
///
/// The database lock is held for the whole run, so runs never overlap.
pub async fn run_rules_endpoint(
    State(state): State<RunRulesState>,
    Path(account_id): Path<AccountId>,
    Query(query): Query<RunQuery>,
) -> Result<Json<RunReport>, Error> {
    let as_of = match query.as_of.as_deref() {
        Some(as_of) => parse_iso_date(as_of)?,
        None => local_today(&state.local_timezone)?,
    };
    let deadline = Instant::now().checked_add(state.run_timeout);

    let connection = lock_connection(&state.db_connection)?;
    get_account(account_id, &connection)?;

    let report = run_due(
        &SQLiteRuleStore::new(&connection),
        &SQLiteLedger::new(&connection),
        RunRequest {
            account_id,
            as_of,
            now: OffsetDateTime::now_utc(),
            deadline,
        },
    )?;

    tracing::info!(
        "Posted {} of {} due recurring rule(s) for account #{account_id}",
        report.posted_count,
        report.outcomes.len()
    );
    let failed_rule_ids = report.failed_rule_ids();
    if !failed_rule_ids.is_empty() {
        tracing::warn!("Recurring rules {failed_rule_ids:?} could not be posted");
    }

    Ok(Json(report))
}
