//! Defines the endpoint for recording a ledger entry by hand.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    AccountId, AppState, CategoryId, Error,
    account::get_account,
    db::lock_connection,
    recurring::{Direction, normalize_description, normalize_signed_amount, validate_amount},
    transaction::{Transaction, TransactionStatus, create_transaction},
};

/// The state needed to list, create or delete ledger entries.
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating a transaction.
#[derive(Debug, Deserialize)]
pub struct TransactionForm {
    /// The amount. Its sign is kept unless `direction` is given.
    pub amount: f64,
    /// `income` or `expense`.
    pub direction: Option<Direction>,
    /// RFC 3339 timestamp, defaults to now.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub occurred_at: Option<OffsetDateTime>,
    /// The category of the transaction.
    pub category_id: Option<CategoryId>,
    /// What the transaction was for.
    pub description: Option<String>,
    /// Defaults to `posted`.
    #[serde(default)]
    pub status: TransactionStatus,
}

/// A route handler for creating a transaction.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    Path(account_id): Path<AccountId>,
    Json(form): Json<TransactionForm>,
) -> Result<(StatusCode, Json<Transaction>), Error> {
    let amount = validate_amount(form.amount)?;
    let amount = match form.direction {
        Some(direction) => normalize_signed_amount(amount, direction),
        None => amount,
    };
    let occurred_at = form.occurred_at.unwrap_or_else(OffsetDateTime::now_utc);

    let connection = lock_connection(&state.db_connection)?;
    get_account(account_id, &connection)?;

    let transaction = create_transaction(
        Transaction::build(account_id, amount, occurred_at)
            .category_id(form.category_id)
            .description(normalize_description(form.description))
            .status(form.status),
        &connection,
    )?;
    tracing::debug!("Created transaction #{} for account #{account_id}", transaction.id);

    Ok((StatusCode::CREATED, Json(transaction)))
}
