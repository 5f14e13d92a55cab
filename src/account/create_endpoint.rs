//! Defines the endpoint for creating a new account.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    account::core::{AccountName, create_account},
    db::lock_connection,
    endpoints::{self, format_endpoint},
};

/// The state needed to list, get or create accounts.
#[derive(Debug, Clone)]
pub struct AccountState {
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating an account.
#[derive(Debug, Deserialize)]
pub struct AccountForm {
    /// The account name.
    pub name: String,
}

/// A route handler for creating a new account.
///
/// Responds with `201 Created` and the new account.
pub async fn create_account_endpoint(
    State(state): State<AccountState>,
    Json(form): Json<AccountForm>,
) -> Result<Response, Error> {
    let name = AccountName::new(&form.name)?;
    let connection = lock_connection(&state.db_connection)?;

    let account = create_account(name, &connection)?;
    tracing::info!("Created account #{} \"{}\"", account.id, account.name);

    Ok((
        StatusCode::CREATED,
        [(LOCATION, format_endpoint(endpoints::ACCOUNT, account.id))],
        Json(account),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Json,
        extract::State,
        http::{StatusCode, header::LOCATION},
        response::IntoResponse,
    };
    use rusqlite::Connection;

    use crate::{Error, account::Account, db::initialize};

    use super::{AccountForm, AccountState, create_account_endpoint};

    fn get_test_state() -> AccountState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        AccountState {
            db_connection: Arc::new(Mutex::new(conn)),
        }
    }

    #[tokio::test]
    async fn creates_account() {
        let state = get_test_state();

        let response = create_account_endpoint(
            State(state),
            Json(AccountForm {
                name: "Everyday".to_owned(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[LOCATION], "/api/accounts/1");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let account: Account = serde_json::from_slice(&body).unwrap();
        assert_eq!(account.id, 1);
        assert_eq!(account.name.as_ref(), "Everyday");
    }

    #[tokio::test]
    async fn duplicate_name_is_conflict() {
        let state = get_test_state();
        let form = || {
            Json(AccountForm {
                name: "Everyday".to_owned(),
            })
        };
        create_account_endpoint(State(state.clone()), form())
            .await
            .unwrap();

        let error = create_account_endpoint(State(state), form())
            .await
            .unwrap_err();

        assert_eq!(error, Error::DuplicateAccountName("Everyday".to_owned()));
        assert_eq!(error.into_response().status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let state = get_test_state();

        let result = create_account_endpoint(
            State(state),
            Json(AccountForm {
                name: " ".to_owned(),
            }),
        )
        .await;

        assert_eq!(result.unwrap_err(), Error::EmptyName);
    }
}
