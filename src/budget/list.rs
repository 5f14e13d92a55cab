use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    AccountId, Error,
    account::get_account,
    budget::{Budget, BudgetState, list_budgets},
    db::lock_connection,
};

/// List the budgets of an account, newest first.
pub async fn list_budgets_endpoint(
    State(state): State<BudgetState>,
    Path(account_id): Path<AccountId>,
) -> Result<Json<Vec<Budget>>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    get_account(account_id, &connection)?;

    list_budgets(account_id, &connection).map(Json)
}
