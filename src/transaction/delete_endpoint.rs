use axum::{
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    Error,
    db::lock_connection,
    transaction::{TransactionId, TransactionState, delete_transaction},
};

/// A route handler for deleting a transaction.
///
/// Deleting an entry that a recurring rule posted frees its recurrence key,
/// but does not move the rule's next run date back.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_transaction(transaction_id, &connection)?;
    tracing::info!("Deleted transaction #{transaction_id}");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Path, State},
        http::StatusCode,
    };
    use rusqlite::Connection;
    use time::OffsetDateTime;

    use crate::{
        Error,
        account::create_test_account,
        db::initialize,
        transaction::{Transaction, TransactionState, create_transaction, get_transaction},
    };

    use super::delete_transaction_endpoint;

    fn get_test_state() -> TransactionState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        create_test_account(&conn);
        create_transaction(Transaction::build(1, -3.5, OffsetDateTime::now_utc()), &conn)
            .unwrap();

        TransactionState {
            db_connection: Arc::new(Mutex::new(conn)),
        }
    }

    #[tokio::test]
    async fn deletes_transaction() {
        let state = get_test_state();

        let status = delete_transaction_endpoint(State(state.clone()), Path(1))
            .await
            .unwrap();

        assert_eq!(status, StatusCode::NO_CONTENT);
        let connection = state.db_connection.lock().unwrap();
        assert_eq!(get_transaction(1, &connection), Err(Error::NotFound));
    }

    #[tokio::test]
    async fn missing_transaction_is_not_found() {
        let state = get_test_state();

        let result = delete_transaction_endpoint(State(state), Path(2)).await;

        assert_eq!(result.unwrap_err(), Error::DeleteMissingTransaction);
    }
}
