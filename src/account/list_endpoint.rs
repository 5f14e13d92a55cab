//! Endpoints for reading accounts.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    Error,
    account::{
        Account, AccountId,
        core::{get_account, list_accounts},
        create_endpoint::AccountState,
    },
    db::lock_connection,
};

/// List every account.
pub async fn list_accounts_endpoint(
    State(state): State<AccountState>,
) -> Result<Json<Vec<Account>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    list_accounts(&connection).map(Json)
}

/// Fetch a single account.
pub async fn get_account_endpoint(
    State(state): State<AccountState>,
    Path(account_id): Path<AccountId>,
) -> Result<Json<Account>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_account(account_id, &connection).map(Json)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, State};
    use rusqlite::Connection;

    use crate::{
        Error,
        account::{create_endpoint::AccountState, create_test_account},
        db::initialize,
    };

    use super::{get_account_endpoint, list_accounts_endpoint};

    fn get_test_state() -> AccountState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        create_test_account(&conn);

        AccountState {
            db_connection: Arc::new(Mutex::new(conn)),
        }
    }

    #[tokio::test]
    async fn lists_accounts() {
        let state = get_test_state();

        let accounts = list_accounts_endpoint(State(state)).await.unwrap();

        assert_eq!(accounts.0.len(), 1);
        assert_eq!(accounts.0[0].name.as_ref(), "Everyday");
    }

    #[tokio::test]
    async fn gets_account_by_id() {
        let state = get_test_state();

        let account = get_account_endpoint(State(state), Path(1)).await.unwrap();

        assert_eq!(account.0.id, 1);
    }

    #[tokio::test]
    async fn missing_account_is_not_found() {
        let state = get_test_state();

        let result = get_account_endpoint(State(state), Path(99)).await;

        assert_eq!(result.unwrap_err(), Error::NotFound);
    }
}
