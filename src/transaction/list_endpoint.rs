use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    AccountId, Error,
    account::get_account,
    db::lock_connection,
    transaction::{Transaction, TransactionState, list_transactions},
};

/// The most transactions returned by one listing.
pub const MAX_LISTED_TRANSACTIONS: u32 = 250;

/// A route handler for the most recent transactions of an account.
pub async fn list_transactions_endpoint(
    State(state): State<TransactionState>,
    Path(account_id): Path<AccountId>,
) -> Result<Json<Vec<Transaction>>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    get_account(account_id, &connection)?;

    list_transactions(account_id, MAX_LISTED_TRANSACTIONS, &connection).map(Json)
}
