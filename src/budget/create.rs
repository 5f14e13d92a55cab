//! Budget creation endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AccountId, AppState, CategoryId, Error,
    account::get_account,
    budget::{BudgetName, NewBudget, create_budget, validate_monthly_limit},
    db::lock_connection,
    endpoints::{self, format_endpoint},
};

/// The state needed for managing budgets.
#[derive(Debug, Clone)]
pub struct BudgetState {
    /// The database connection for managing budgets.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for BudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The request body for creating a budget.
#[derive(Debug, Deserialize)]
pub struct BudgetForm {
    /// The name of the budget.
    pub name: String,
    /// How much may be spent per calendar month.
    pub monthly_limit: f64,
    /// Limit the expenses of this category instead of all expenses.
    pub category_id: Option<CategoryId>,
}

impl BudgetForm {
    fn validate(self, account_id: AccountId) -> Result<NewBudget, Error> {
        Ok(NewBudget {
            account_id,
            name: BudgetName::new(&self.name)?,
            monthly_limit: validate_monthly_limit(self.monthly_limit)?,
            category_id: self.category_id,
        })
    }
}

/// Create a budget for an account.
pub async fn create_budget_endpoint(
    State(state): State<BudgetState>,
    Path(account_id): Path<AccountId>,
    Json(form): Json<BudgetForm>,
) -> Result<Response, Error> {
    let new_budget = form.validate(account_id)?;

    let connection = lock_connection(&state.db_connection)?;
    get_account(account_id, &connection)?;

    let budget = create_budget(new_budget, &connection)?;
    tracing::info!(
        "Created budget #{} \"{}\" for account #{account_id}",
        budget.id,
        budget.name
    );

    Ok((
        StatusCode::CREATED,
        [(LOCATION, format_endpoint(endpoints::BUDGET, budget.id))],
        Json(budget),
    )
        .into_response())
}
