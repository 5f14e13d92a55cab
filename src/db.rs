//! Database set up and helpers shared by the stores.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, Transaction as SqlTransaction};

use crate::{
    Error, account::create_account_table, budget::create_budget_table,
    category::create_category_table, recurring::create_recurring_rule_table,
    transaction::create_transaction_table,
};

/// Create the tables for all of the domain models.
///
/// Foreign keys are switched on for `connection` since SQLite leaves them
/// off by default. Tables that already exist are left as they are.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    create_account_table(&transaction)?;
    create_category_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_recurring_rule_table(&transaction)?;
    create_budget_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Acquire the shared database connection.
///
/// # Errors
/// Returns [Error::DatabaseLockError] if the mutex was poisoned.
pub(crate) fn lock_connection(
    connection: &Arc<Mutex<Connection>>,
) -> Result<MutexGuard<'_, Connection>, Error> {
    connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })
}

/// The extended result code of a failed SQLite statement, if any.
///
/// Used to tell apart constraint failures, e.g.
/// [rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE] and
/// [rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY].
pub(crate) fn extended_code(error: &rusqlite::Error) -> Option<i32> {
    match error {
        rusqlite::Error::SqliteFailure(rusqlite::ffi::Error { extended_code, .. }, _) => {
            Some(*extended_code)
        }
        _ => None,
    }
}
