use axum::{
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    Error,
    budget::{BudgetId, BudgetState, delete_budget},
    db::lock_connection,
};

/// Delete a budget.
pub async fn delete_budget_endpoint(
    State(state): State<BudgetState>,
    Path(budget_id): Path<BudgetId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_budget(budget_id, &connection)?;
    tracing::info!("Deleted budget #{budget_id}");

    Ok(StatusCode::NO_CONTENT)
}
