//! Categories group ledger entries, budgets and recurring rules within an account.

mod core;
mod endpoints;

pub use core::{Category, CategoryId, CategoryKind, create_category_table};
pub use endpoints::{
    create_category_endpoint, delete_category_endpoint, list_categories_endpoint,
    update_category_endpoint,
};

pub(crate) use core::check_category_account;

#[cfg(test)]
pub(crate) use core::{create_test_category, delete_category};
