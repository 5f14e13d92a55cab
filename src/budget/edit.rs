//! Budget editing endpoint.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use crate::{
    CategoryId, Error,
    budget::{Budget, BudgetId, BudgetName, BudgetPatch, BudgetState, update_budget, validate_monthly_limit},
    db::lock_connection,
    patch::deserialize_present,
};

/// The request body for editing a budget. Missing fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct BudgetPatchForm {
    /// The new name.
    pub name: Option<String>,
    /// The new monthly limit.
    pub monthly_limit: Option<f64>,
    /// The new category, `null` makes it an overall budget.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub category_id: Option<Option<CategoryId>>,
}

impl BudgetPatchForm {
    fn into_patch(self) -> Result<BudgetPatch, Error> {
        Ok(BudgetPatch {
            name: self.name.as_deref().map(BudgetName::new).transpose()?,
            monthly_limit: self.monthly_limit.map(validate_monthly_limit).transpose()?,
            category_id: self.category_id,
        })
    }
}

/// Edit the name, limit or category of a budget.
pub async fn update_budget_endpoint(
    State(state): State<BudgetState>,
    Path(budget_id): Path<BudgetId>,
    Json(form): Json<BudgetPatchForm>,
) -> Result<Json<Budget>, Error> {
    let patch = form.into_patch()?;
    let connection = lock_connection(&state.db_connection)?;

    let budget = update_budget(budget_id, &patch, &connection)?;
    tracing::info!("Updated budget #{budget_id}");

    Ok(Json(budget))
}

#[cfg(test)]
mod tests {
    use axum::{
        Json,
        extract::{Path, State},
    };
    use serde_json::json;

    use crate::{
        Error,
        budget::{BudgetName, NewBudget, create::test_state::get_test_state, create_budget},
        category::create_test_category,
    };

    use super::{BudgetPatchForm, update_budget_endpoint};

    fn form(value: serde_json::Value) -> Json<BudgetPatchForm> {
        Json(serde_json::from_value(value).expect("Could not parse budget patch"))
    }

    #[tokio::test]
    async fn null_category_makes_overall_budget() {
        let state = get_test_state();
        let budget = {
            let connection = state.db_connection.lock().unwrap();
            let food = create_test_category(1, "Food", &connection);
            create_budget(
                NewBudget {
                    account_id: 1,
                    name: BudgetName::new("Eating").unwrap(),
                    monthly_limit: 300.0,
                    category_id: Some(food.id),
                },
                &connection,
            )
            .unwrap()
        };

        let Json(updated) = update_budget_endpoint(
            State(state),
            Path(budget.id),
            form(json!({ "name": "Everything", "category_id": null })),
        )
        .await
        .unwrap();

        assert_eq!(updated.name.as_ref(), "Everything");
        assert_eq!(updated.monthly_limit, 300.0);
        assert_eq!(updated.category_id, None);
        assert_eq!(updated.category_name, None);
    }

    #[tokio::test]
    async fn invalid_limit_is_rejected() {
        let state = get_test_state();

        let result =
            update_budget_endpoint(State(state), Path(1), form(json!({ "monthly_limit": -1 })))
                .await;

        assert_eq!(result.unwrap_err(), Error::InvalidBudgetLimit);
    }

    #[tokio::test]
    async fn missing_budget_is_not_found() {
        let state = get_test_state();

        let result = update_budget_endpoint(State(state), Path(1), form(json!({}))).await;

        assert_eq!(result.unwrap_err(), Error::UpdateMissingBudget);
    }
}
