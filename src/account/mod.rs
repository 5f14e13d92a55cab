//! Accounts own the categories, ledger entries, budgets and recurring rules.

mod core;
mod create_endpoint;
mod list_endpoint;

pub use core::{Account, AccountId, create_account_table, get_account};
pub use create_endpoint::create_account_endpoint;
pub use list_endpoint::{get_account_endpoint, list_accounts_endpoint};

#[cfg(test)]
pub(crate) use core::{create_named_test_account, create_test_account};
