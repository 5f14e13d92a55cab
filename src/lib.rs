//! Tally is a JSON API for tracking personal finances.
//!
//! Accounts own categories, ledger entries (transactions), monthly budgets
//! and recurring rules. The interesting part is the recurring rule scheduler: rules describe
//! a cadence and an anchor date, the [calendar] and `recurring` modules work
//! out when each rule is next due, and a run materializes every due rule into
//! a ledger entry while advancing the rule's cursor.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use time::Date;
use tokio::signal;

mod account;
mod app_state;
pub mod budget;
pub mod calendar;
mod category;
mod database_id;
mod db;
pub mod endpoints;
mod logging;
mod not_found;
mod patch;
pub mod recurring;
mod routing;
pub mod summary;
mod timezone;
pub mod transaction;

pub use account::{Account, AccountId};
pub use app_state::{AppState, DEFAULT_RUN_TIMEOUT};
pub use category::{Category, CategoryId, CategoryKind};
pub use database_id::DatabaseId;
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// An amount was missing, NaN or infinite.
    #[error("amount must be a finite number")]
    InvalidAmount,

    /// The cadence string is not one of `monthly`, `weekly`, `biweekly` or `custom`.
    #[error("\"{0}\" is not a supported cadence")]
    UnsupportedCadence(String),

    /// The direction string is not one of `income` or `expense`.
    #[error("\"{0}\" is not a supported direction")]
    UnsupportedDirection(String),

    /// A day of the month outside of 1-31.
    ///
    /// Days that are valid in general but missing from a short month (e.g.,
    /// the 31st in April) are clamped instead of rejected.
    #[error("{0} is not a valid day of the month, expected a number from 1 to 31")]
    InvalidDayOfMonth(i64),

    /// A weekday number outside of 0-6 (0 is Sunday).
    #[error("{0} is not a valid weekday, expected a number from 0 (Sunday) to 6 (Saturday)")]
    InvalidWeekday(i64),

    /// A date string that is not formatted as `YYYY-MM-DD`.
    #[error("could not parse the date \"{0}\", expected the format YYYY-MM-DD")]
    InvalidDateFormat(String),

    /// Date arithmetic left the range of representable dates.
    #[error("the schedule starting at {0} runs past the last supported date")]
    DateOutOfRange(Date),

    /// A budget's monthly limit was negative, NaN or infinite.
    #[error("the monthly limit must be a finite number that is zero or greater")]
    InvalidBudgetLimit,

    /// An empty string was used to name an account, category or budget.
    #[error("name cannot be empty")]
    EmptyName,

    /// The category ID did not match a valid category.
    #[error("the category ID does not refer to a valid category")]
    InvalidCategory(Option<i64>),

    /// A ledger entry for the same recurring rule occurrence already exists.
    ///
    /// Entries created from a recurring rule carry a key made of the rule ID
    /// and the scheduled date. The store rejects a second entry with the same
    /// key so that re-running a batch never posts an occurrence twice.
    #[error("the recurring rule occurrence has already been posted")]
    DuplicatePosting,

    /// The conditional update of a rule's next run date found a different
    /// date (or no rule) in the store.
    #[error("the next run date of recurring rule #{0} changed while it was being advanced")]
    CursorConflict(i64),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// The specified account name already exists in the database.
    #[error("the account \"{0}\" already exists in the database")]
    DuplicateAccountName(String),

    /// The specified category name already exists for the account.
    #[error("the category \"{0}\" already exists for this account")]
    DuplicateCategoryName(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// Tried to delete a transaction that does not exist
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// Tried to delete a category that does not exist
    #[error("tried to delete a category that is not in the database")]
    DeleteMissingCategory,

    /// Tried to update a transaction that does not exist
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// Tried to update a category that does not exist
    #[error("tried to update a category that is not in the database")]
    UpdateMissingCategory,

    /// Tried to update a budget that does not exist
    #[error("tried to update a budget that is not in the database")]
    UpdateMissingBudget,

    /// Tried to delete a budget that does not exist
    #[error("tried to delete a budget that is not in the database")]
    DeleteMissingBudget,

    /// Tried to update a recurring rule that does not exist
    #[error("tried to update a recurring rule that is not in the database")]
    UpdateMissingRule,

    /// Tried to delete a recurring rule that does not exist
    #[error("tried to delete a recurring rule that is not in the database")]
    DeleteMissingRule,

    /// A request or response body could not be read
    #[error("could not read the message body")]
    BodyReadError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidAmount
            | Error::UnsupportedCadence(_)
            | Error::UnsupportedDirection(_)
            | Error::InvalidDayOfMonth(_)
            | Error::InvalidWeekday(_)
            | Error::InvalidDateFormat(_)
            | Error::DateOutOfRange(_)
            | Error::InvalidBudgetLimit
            | Error::EmptyName
            | Error::InvalidCategory(_) => StatusCode::BAD_REQUEST,
            Error::DuplicatePosting
            | Error::CursorConflict(_)
            | Error::DuplicateAccountName(_)
            | Error::DuplicateCategoryName(_) => StatusCode::CONFLICT,
            Error::NotFound
            | Error::DeleteMissingTransaction
            | Error::DeleteMissingCategory
            | Error::UpdateMissingTransaction
            | Error::UpdateMissingCategory
            | Error::UpdateMissingBudget
            | Error::DeleteMissingBudget
            | Error::UpdateMissingRule
            | Error::DeleteMissingRule => StatusCode::NOT_FOUND,
            Error::SqlError(_)
            | Error::InvalidTimezoneError(_)
            | Error::DatabaseLockError
            | Error::BodyReadError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            // Internal details are only intended for the server logs.
            tracing::error!("An unexpected error occurred: {}", self);
            "An unexpected error occurred, check the server logs for more details.".to_owned()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
