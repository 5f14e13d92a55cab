//! The account model and its database queries.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, database_id::DatabaseId, db::extended_code};

/// Database identifier for an account.
pub type AccountId = DatabaseId;

/// A validated, non-empty account name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct AccountName(String);

impl AccountName {
    /// Create an account name, trimming surrounding whitespace.
    ///
    /// # Errors
    /// Returns [Error::EmptyName] if `name` is empty or only whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyName)
        } else {
            Ok(Self(name.to_owned()))
        }
    }
}

impl AsRef<str> for AccountName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for AccountName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An account that owns categories, ledger entries and recurring rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// The id for the account.
    pub id: AccountId,
    /// The name of the account, unique across all accounts.
    pub name: AccountName,
    /// When the account was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Create the account table in the database.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

/// Map a database row to an [Account].
pub fn map_account_row(row: &Row) -> Result<Account, rusqlite::Error> {
    let id = row.get(0)?;
    let name: String = row.get(1)?;
    let created_at = row.get(2)?;

    Ok(Account {
        id,
        name: AccountName(name),
        created_at,
    })
}

/// Create an account.
///
/// # Errors
/// Returns [Error::DuplicateAccountName] if the name is taken, or
/// [Error::SqlError] if there is some other SQL error.
pub fn create_account(name: AccountName, connection: &Connection) -> Result<Account, Error> {
    connection
        .prepare(
            "INSERT INTO account (name, created_at) VALUES (?1, ?2)
             RETURNING id, name, created_at",
        )?
        .query_row((name.as_ref(), OffsetDateTime::now_utc()), map_account_row)
        .map_err(|error| match extended_code(&error) {
            Some(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE) => {
                Error::DuplicateAccountName(name.to_string())
            }
            _ => error.into(),
        })
}

/// Retrieve an account by its `id`.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to an account.
pub fn get_account(id: AccountId, connection: &Connection) -> Result<Account, Error> {
    let account = connection
        .prepare("SELECT id, name, created_at FROM account WHERE id = :id")?
        .query_one(&[(":id", &id)], map_account_row)?;

    Ok(account)
}

/// Retrieve all accounts, oldest first.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn list_accounts(connection: &Connection) -> Result<Vec<Account>, Error> {
    connection
        .prepare("SELECT id, name, created_at FROM account ORDER BY id ASC")?
        .query_map([], map_account_row)?
        .map(|maybe_account| maybe_account.map_err(|error| error.into()))
        .collect()
}

#[cfg(test)]
pub(crate) fn create_test_account(connection: &Connection) -> Account {
    create_named_test_account("Everyday", connection)
}

#[cfg(test)]
pub(crate) fn create_named_test_account(name: &str, connection: &Connection) -> Account {
    create_account(AccountName::new(name).unwrap(), connection)
        .expect("Could not create test account")
}
