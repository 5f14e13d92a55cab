use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    AccountId, Error,
    account::get_account,
    db::lock_connection,
    recurring::{RecurringRule, RecurringRuleState, RuleStore, SQLiteRuleStore},
};

/// List the recurring rules of an account, newest first.
pub async fn list_rules_endpoint(
    State(state): State<RecurringRuleState>,
    Path(account_id): Path<AccountId>,
) -> Result<Json<Vec<RecurringRule>>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    get_account(account_id, &connection)?;

    SQLiteRuleStore::new(&connection)
        .list_rules(account_id)
        .map(Json)
}
