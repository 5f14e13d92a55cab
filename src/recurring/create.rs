//! Recurring rule creation endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AccountId, AppState, Error,
    account::get_account,
    db::lock_connection,
    endpoints::{self, format_endpoint},
    recurring::{NewRecurringRuleForm, RuleStore, SQLiteRuleStore},
    timezone::local_today,
};

/// The state needed for managing recurring rules.
#[derive(Debug, Clone)]
pub struct RecurringRuleState {
    /// The database connection for managing rules.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for RecurringRuleState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Create a recurring rule for an account.
///
/// The rule's first run date is worked out from its schedule. Responds with
/// `201 Created` and the stored rule.
pub async fn create_rule_endpoint(
    State(state): State<RecurringRuleState>,
    Path(account_id): Path<AccountId>,
    Json(form): Json<NewRecurringRuleForm>,
) -> Result<Response, Error> {
    let today = local_today(&state.local_timezone)?;
    let new_rule = form.validate(account_id, today)?;

    let connection = lock_connection(&state.db_connection)?;
    get_account(account_id, &connection)?;

    let rule = SQLiteRuleStore::new(&connection).create_rule(new_rule)?;
    tracing::info!(
        "Created {} recurring rule #{} for account #{account_id}, first run on {}",
        rule.cadence,
        rule.id,
        rule.next_run_date
    );

    Ok((
        StatusCode::CREATED,
        [(LOCATION, format_endpoint(endpoints::RECURRING_RULE, rule.id))],
        Json(rule),
    )
        .into_response())
}
