use axum::{
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    Error,
    db::lock_connection,
    recurring::{RecurringRuleId, RecurringRuleState, RuleStore, SQLiteRuleStore},
};

/// Delete a recurring rule. Entries it already posted are kept.
pub async fn delete_rule_endpoint(
    State(state): State<RecurringRuleState>,
    Path(rule_id): Path<RecurringRuleId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    SQLiteRuleStore::new(&connection).delete_rule(rule_id)?;
    tracing::info!("Deleted recurring rule #{rule_id}");

    Ok(StatusCode::NO_CONTENT)
}
