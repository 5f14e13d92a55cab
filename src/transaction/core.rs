//! Defines the core data models and database queries for ledger entries.

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};

use crate::{
    AccountId, CategoryId, Error, category::check_category_account, database_id::DatabaseId,
    db::extended_code,
};

/// Database identifier for a ledger entry.
pub type TransactionId = DatabaseId;

// ============================================================================
// MODELS
// ============================================================================

/// Whether a ledger entry has settled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Recorded but not settled yet.
    Pending,
    /// Settled. Entries posted by recurring rules always have this status.
    #[default]
    Posted,
}

impl TransactionStatus {
    fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Posted => "posted",
        }
    }
}

impl ToSql for TransactionStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TransactionStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "pending" => Ok(TransactionStatus::Pending),
            "posted" => Ok(TransactionStatus::Posted),
            other => Err(FromSqlError::Other(
                format!("unknown transaction status \"{other}\"").into(),
            )),
        }
    }
}

/// A ledger entry, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The account the transaction belongs to.
    pub account_id: AccountId,
    /// The category of the transaction.
    pub category_id: Option<CategoryId>,
    /// The amount of money earned (positive) or spent (negative).
    pub amount: f64,
    /// When the transaction happened, stored in UTC.
    #[serde(with = "time::serde::rfc3339")]
    pub occurred_at: OffsetDateTime,
    /// A text description of what the transaction was for.
    pub description: Option<String>,
    /// Whether the transaction has settled.
    pub status: TransactionStatus,
    /// Identifies the recurring rule occurrence that produced this entry.
    pub recurrence_key: Option<String>,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(account_id: AccountId, amount: f64, occurred_at: OffsetDateTime) -> TransactionBuilder {
        TransactionBuilder {
            account_id,
            amount,
            occurred_at,
            category_id: None,
            description: None,
            status: TransactionStatus::Posted,
            recurrence_key: None,
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// Optional fields default to no category, no description, the posted
/// status and no recurrence key.
///
/// # Examples
///
/// ```ignore
/// use time::OffsetDateTime;
///
/// use crate::transaction::Transaction;
///
/// let entry = Transaction::build(1, -1200.0, OffsetDateTime::now_utc())
///     .category_id(Some(4))
///     .description(Some("Rent".to_owned()))
///     .recurrence_key(Some("7:2024-02-29".to_owned()));
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The account the transaction belongs to.
    pub account_id: AccountId,

    /// The signed amount of the transaction.
    ///
    /// Positive values represent income and negative values represent
    /// expenses. Callers that take a direction from the user should sign the
    /// amount with [crate::recurring::normalize_signed_amount].
    pub amount: f64,

    /// When the money moved.
    ///
    /// Entries posted by recurring rules use the time of posting, not the
    /// date the rule was scheduled for.
    pub occurred_at: OffsetDateTime,

    /// The category of the transaction, e.g. "Groceries", "Rent".
    pub category_id: Option<CategoryId>,

    /// A human-readable description of the transaction.
    pub description: Option<String>,

    /// Whether the transaction has settled.
    pub status: TransactionStatus,

    /// Key of the recurring rule occurrence, formatted `"{rule_id}:{scheduled_date}"`.
    ///
    /// The database enforces uniqueness on this field, so posting the same
    /// occurrence twice fails with [Error::DuplicatePosting].
    pub recurrence_key: Option<String>,
}

impl TransactionBuilder {
    /// Set the category for the transaction.
    pub fn category_id(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    /// Set the description for the transaction.
    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Set the status for the transaction.
    pub fn status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the recurrence key for the transaction.
    pub fn recurrence_key(mut self, recurrence_key: Option<String>) -> Self {
        self.recurrence_key = recurrence_key;
        self
    }
}

/// A partial update to a ledger entry.
///
/// `None` leaves a field unchanged. For the nullable fields `Some(None)`
/// clears the value.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TransactionPatch {
    /// The new signed amount.
    pub amount: Option<f64>,
    /// When the money moved.
    pub occurred_at: Option<OffsetDateTime>,
    /// The new description.
    pub description: Option<Option<String>>,
    /// The new category.
    pub category_id: Option<Option<CategoryId>>,
    /// The new status.
    pub status: Option<TransactionStatus>,
}

impl TransactionPatch {
    fn apply_to(&self, transaction: &mut Transaction) {
        if let Some(amount) = self.amount {
            transaction.amount = amount;
        }
        if let Some(occurred_at) = self.occurred_at {
            transaction.occurred_at = occurred_at.to_offset(UtcOffset::UTC);
        }
        if let Some(description) = &self.description {
            transaction.description = description.clone();
        }
        if let Some(category_id) = self.category_id {
            transaction.category_id = category_id;
        }
        if let Some(status) = self.status {
            transaction.status = status;
        }
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new transaction in the database from a builder.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidCategory] if the category ID does not refer to a category of the same account,
/// - or [Error::DuplicatePosting] if a transaction with the same recurrence key already exists,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    check_category_account(builder.account_id, builder.category_id, connection)?;

    connection
        .prepare(
            "INSERT INTO \"transaction\"
                (account_id, category_id, amount, occurred_at, description, status, recurrence_key)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING id, account_id, category_id, amount, occurred_at, description, status, recurrence_key",
        )?
        .query_row(
            (
                builder.account_id,
                builder.category_id,
                builder.amount,
                builder.occurred_at.to_offset(UtcOffset::UTC),
                &builder.description,
                builder.status,
                &builder.recurrence_key,
            ),
            map_transaction_row,
        )
        .map_err(|error| match extended_code(&error) {
            Some(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => {
                Error::InvalidCategory(builder.category_id)
            }
            Some(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE) => Error::DuplicatePosting,
            _ => error.into(),
        })
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "SELECT id, account_id, category_id, amount, occurred_at, description, status, recurrence_key
             FROM \"transaction\" WHERE id = :id",
        )?
        .query_one(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// The most recent transactions of `account_id`, newest first.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn list_transactions(
    account_id: AccountId,
    limit: u32,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, account_id, category_id, amount, occurred_at, description, status, recurrence_key
             FROM \"transaction\" WHERE account_id = ?1
             ORDER BY occurred_at DESC, id DESC
             LIMIT ?2",
        )?
        .query_map((account_id, limit), map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Apply `patch` to a transaction and store the result.
///
/// The recurrence key and account never change.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingTransaction] if the transaction does not exist,
/// - or [Error::InvalidCategory] if the new category does not belong to the transaction's account,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_transaction(
    id: TransactionId,
    patch: &TransactionPatch,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let sql_transaction = connection.unchecked_transaction()?;

    let mut transaction = match get_transaction(id, &sql_transaction) {
        Ok(transaction) => transaction,
        Err(Error::NotFound) => return Err(Error::UpdateMissingTransaction),
        Err(error) => return Err(error),
    };
    patch.apply_to(&mut transaction);

    if patch.category_id.is_some() {
        check_category_account(
            transaction.account_id,
            transaction.category_id,
            &sql_transaction,
        )?;
    }

    let updated = sql_transaction
        .prepare(
            "UPDATE \"transaction\"
             SET category_id = ?1, amount = ?2, occurred_at = ?3, description = ?4, status = ?5
             WHERE id = ?6
             RETURNING id, account_id, category_id, amount, occurred_at, description, status, recurrence_key",
        )?
        .query_row(
            (
                transaction.category_id,
                transaction.amount,
                transaction.occurred_at,
                &transaction.description,
                transaction.status,
                id,
            ),
            map_transaction_row,
        )
        .map_err(|error| match extended_code(&error) {
            Some(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => {
                Error::InvalidCategory(transaction.category_id)
            }
            _ => error.into(),
        })?;

    sql_transaction.commit()?;

    Ok(updated)
}

/// Delete a transaction.
///
/// # Errors
/// This function will return a [Error::DeleteMissingTransaction] if the
/// transaction does not exist.
pub fn delete_transaction(id: TransactionId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM \"transaction\" WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTransaction);
    }

    Ok(())
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL,
                category_id INTEGER,
                amount REAL NOT NULL,
                occurred_at TEXT NOT NULL,
                description TEXT,
                status TEXT NOT NULL CHECK (status IN ('pending', 'posted')),
                recurrence_key TEXT UNIQUE,
                FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE SET NULL
                )",
        (),
    )?;

    // Used by the transaction list and the summary.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_account_occurred_at
         ON \"transaction\"(account_id, occurred_at);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let account_id = row.get(1)?;
    let category_id = row.get(2)?;
    let amount = row.get(3)?;
    let occurred_at = row.get(4)?;
    let description = row.get(5)?;
    let status = row.get(6)?;
    let recurrence_key = row.get(7)?;

    Ok(Transaction {
        id,
        account_id,
        category_id,
        amount,
        occurred_at,
        description,
        status,
        recurrence_key,
    })
}

// ============================================================================
// TESTS
// ============================================================================
