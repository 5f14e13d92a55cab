//! Defines the endpoint for editing a ledger entry.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    CategoryId, Error,
    db::lock_connection,
    patch::deserialize_present,
    recurring::{Direction, normalize_description, normalize_signed_amount, validate_amount},
    transaction::{
        Transaction, TransactionId, TransactionPatch, TransactionState, TransactionStatus,
        update_transaction,
    },
};

/// The request body for editing a transaction. Missing fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionPatchForm {
    /// The new amount. Its sign is kept unless `direction` is given.
    pub amount: Option<f64>,
    /// `income` or `expense`, only used together with `amount`.
    pub direction: Option<Direction>,
    /// RFC 3339 timestamp.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub occurred_at: Option<OffsetDateTime>,
    /// The new description, `null` clears it.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub description: Option<Option<String>>,
    /// The new category, `null` clears it.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub category_id: Option<Option<CategoryId>>,
    /// `pending` or `posted`.
    pub status: Option<TransactionStatus>,
}

impl TransactionPatchForm {
    fn into_patch(self) -> Result<TransactionPatch, Error> {
        let amount = self
            .amount
            .map(validate_amount)
            .transpose()?
            .map(|amount| match self.direction {
                Some(direction) => normalize_signed_amount(amount, direction),
                None => amount,
            });

        Ok(TransactionPatch {
            amount,
            occurred_at: self.occurred_at,
            description: self.description.map(normalize_description),
            category_id: self.category_id,
            status: self.status,
        })
    }
}

/// A route handler for editing a transaction.
pub async fn update_transaction_endpoint(
    State(state): State<TransactionState>,
    Path(transaction_id): Path<TransactionId>,
    Json(form): Json<TransactionPatchForm>,
) -> Result<Json<Transaction>, Error> {
    let patch = form.into_patch()?;
    let connection = lock_connection(&state.db_connection)?;

    let transaction = update_transaction(transaction_id, &patch, &connection)?;
    tracing::debug!("Updated transaction #{transaction_id}");

    Ok(Json(transaction))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Json,
        extract::{Path, State},
    };
    use rusqlite::Connection;
    use serde_json::json;
    use time::{OffsetDateTime, macros::datetime};

    use crate::{
        Error,
        account::{create_named_test_account, create_test_account},
        category::create_test_category,
        db::initialize,
        transaction::{Transaction, TransactionState, TransactionStatus, create_transaction},
    };

    use super::{TransactionPatchForm, update_transaction_endpoint};

    fn get_test_state() -> TransactionState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        create_test_account(&conn);
        create_transaction(
            Transaction::build(1, -20.0, OffsetDateTime::now_utc())
                .description(Some("Lunch".to_owned())),
            &conn,
        )
        .unwrap();

        TransactionState {
            db_connection: Arc::new(Mutex::new(conn)),
        }
    }

    fn form(value: serde_json::Value) -> Json<TransactionPatchForm> {
        Json(serde_json::from_value(value).expect("Could not parse transaction patch"))
    }

    #[tokio::test]
    async fn direction_sets_sign_of_new_amount() {
        let state = get_test_state();

        let Json(transaction) = update_transaction_endpoint(
            State(state),
            Path(1),
            form(json!({ "amount": -15.0, "direction": "income" })),
        )
        .await
        .unwrap();

        assert_eq!(transaction.amount, 15.0);
        assert_eq!(transaction.description.as_deref(), Some("Lunch"));
    }

    #[tokio::test]
    async fn amount_keeps_sign_without_direction() {
        let state = get_test_state();

        let Json(transaction) =
            update_transaction_endpoint(State(state), Path(1), form(json!({ "amount": -7.5 })))
                .await
                .unwrap();

        assert_eq!(transaction.amount, -7.5);
    }

    #[tokio::test]
    async fn null_clears_and_blank_description_is_dropped() {
        let state = get_test_state();
        let category = {
            let connection = state.db_connection.lock().unwrap();
            create_test_category(1, "Food", &connection)
        };
        update_transaction_endpoint(
            State(state.clone()),
            Path(1),
            form(json!({ "category_id": category.id })),
        )
        .await
        .unwrap();

        let Json(transaction) = update_transaction_endpoint(
            State(state),
            Path(1),
            form(json!({
                "category_id": null,
                "description": "   ",
                "occurred_at": "2024-05-01T08:00:00Z",
                "status": "pending",
            })),
        )
        .await
        .unwrap();

        assert_eq!(transaction.category_id, None);
        assert_eq!(transaction.description, None);
        assert_eq!(transaction.occurred_at, datetime!(2024-05-01 08:00 UTC));
        assert_eq!(transaction.status, TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn category_of_other_account_is_rejected() {
        let state = get_test_state();
        let foreign = {
            let connection = state.db_connection.lock().unwrap();
            let savings = create_named_test_account("Savings", &connection);
            create_test_category(savings.id, "Foreign", &connection)
        };

        let result = update_transaction_endpoint(
            State(state),
            Path(1),
            form(json!({ "category_id": foreign.id })),
        )
        .await;

        assert_eq!(result.unwrap_err(), Error::InvalidCategory(Some(foreign.id)));
    }

    #[tokio::test]
    async fn non_finite_amount_is_rejected() {
        let state = get_test_state();
        let patch = TransactionPatchForm {
            amount: Some(f64::INFINITY),
            ..Default::default()
        };

        let result = update_transaction_endpoint(State(state), Path(1), Json(patch)).await;

        assert_eq!(result.unwrap_err(), Error::InvalidAmount);
    }

    #[tokio::test]
    async fn missing_transaction_is_not_found() {
        let state = get_test_state();

        let result = update_transaction_endpoint(State(state), Path(9), form(json!({}))).await;

        assert_eq!(result.unwrap_err(), Error::UpdateMissingTransaction);
    }
}
