//! Ledger entries.
//!
//! This module contains:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - Database functions for storing, querying, editing and deleting transactions
//! - The [Ledger] trait that recurring rules post through
//! - Route handlers for recording and editing transactions by hand

mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod ledger;
mod list_endpoint;

pub use core::{
    Transaction, TransactionBuilder, TransactionId, TransactionPatch, TransactionStatus,
    create_transaction, create_transaction_table, delete_transaction, get_transaction,
    list_transactions, map_transaction_row, update_transaction,
};
pub use create_endpoint::{TransactionForm, TransactionState, create_transaction_endpoint};
pub use delete_endpoint::delete_transaction_endpoint;
pub use edit_endpoint::{TransactionPatchForm, update_transaction_endpoint};
pub use ledger::{Ledger, SQLiteLedger};
pub use list_endpoint::{MAX_LISTED_TRANSACTIONS, list_transactions_endpoint};
