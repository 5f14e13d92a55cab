//! The ledger that recurring rules post entries to.

use rusqlite::Connection;

use crate::{
    Error,
    transaction::{Transaction, TransactionBuilder, create_transaction},
};

/// Appends entries to the ledger.
pub trait Ledger {
    /// Append a single entry.
    ///
    /// # Errors
    /// Returns [Error::DuplicatePosting] if the entry's recurrence key has
    /// already been used, or another error if the entry could not be stored.
    fn append_entry(&self, entry: TransactionBuilder) -> Result<Transaction, Error>;
}

/// A [Ledger] backed by the SQLite transaction table.
#[derive(Debug, Clone, Copy)]
pub struct SQLiteLedger<'a> {
    connection: &'a Connection,
}

impl<'a> SQLiteLedger<'a> {
    /// Create a ledger that writes through `connection`.
    pub fn new(connection: &'a Connection) -> Self {
        Self { connection }
    }
}

impl Ledger for SQLiteLedger<'_> {
    fn append_entry(&self, entry: TransactionBuilder) -> Result<Transaction, Error> {
        create_transaction(entry, self.connection)
    }
}
