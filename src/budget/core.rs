//! The budget model and its database queries.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    AccountId, CategoryId, Error, category::check_category_account, database_id::DatabaseId,
    db::extended_code,
};

/// Database identifier for a budget.
pub type BudgetId = DatabaseId;

/// A validated, non-empty budget name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub struct BudgetName(String);

impl BudgetName {
    /// Create a budget name, trimming surrounding whitespace.
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

impl AsRef<str> for BudgetName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for BudgetName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Check that a monthly limit is a finite, non-negative amount.
///
/// # Errors
/// Returns [Error::InvalidBudgetLimit] otherwise.
pub fn validate_monthly_limit(limit: f64) -> Result<f64, Error> {
    if limit.is_finite() && limit >= 0.0 {
        Ok(limit)
    } else {
        Err(Error::InvalidBudgetLimit)
    }
}

/// A monthly spending limit.
///
/// A budget with a category limits the expenses of that category, a budget
/// without one limits all of the account's expenses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// The ID of the budget.
    pub id: BudgetId,
    /// The account the budget belongs to.
    pub account_id: AccountId,
    /// The name of the budget.
    pub name: BudgetName,
    /// How much may be spent per calendar month.
    pub monthly_limit: f64,
    /// The category the budget is for, `None` for an overall budget.
    pub category_id: Option<CategoryId>,
    /// The name of the budget's category.
    pub category_name: Option<String>,
    /// When the budget was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the budget was last changed.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A validated budget that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBudget {
    /// The account that owns the budget.
    pub account_id: AccountId,
    /// The name of the budget.
    pub name: BudgetName,
    /// How much may be spent per calendar month.
    pub monthly_limit: f64,
    /// The category the budget is for.
    pub category_id: Option<CategoryId>,
}

/// A partial update to a budget.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BudgetPatch {
    /// The new name.
    pub name: Option<BudgetName>,
    /// The new monthly limit.
    pub monthly_limit: Option<f64>,
    /// The new category, `Some(None)` makes it an overall budget.
    pub category_id: Option<Option<CategoryId>>,
}

impl BudgetPatch {
    fn apply_to(&self, budget: &mut Budget) {
        if let Some(name) = &self.name {
            budget.name = name.clone();
        }
        if let Some(monthly_limit) = self.monthly_limit {
            budget.monthly_limit = monthly_limit;
        }
        if let Some(category_id) = self.category_id {
            budget.category_id = category_id;
        }
    }
}

/// Create the budget table in the database.
///
/// Deleting a category also deletes the budgets for that category.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS budget (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            monthly_limit REAL NOT NULL CHECK (monthly_limit >= 0),
            category_id INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

const SELECT_BUDGET: &str = "SELECT b.id, b.account_id, b.name, b.monthly_limit, b.category_id,
        c.name, b.created_at, b.updated_at
     FROM budget b
     LEFT JOIN category c ON b.category_id = c.id";

fn map_budget_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    let name: String = row.get(2)?;

    Ok(Budget {
        id: row.get(0)?,
        account_id: row.get(1)?,
        name: BudgetName(name),
        monthly_limit: row.get(3)?,
        category_id: row.get(4)?,
        category_name: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Store a new budget.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidCategory] if the category is not one of the budget's account,
/// - or [Error::NotFound] if the account does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_budget(budget: NewBudget, connection: &Connection) -> Result<Budget, Error> {
    check_category_account(budget.account_id, budget.category_id, connection)?;

    let now = OffsetDateTime::now_utc();
    let id: BudgetId = connection
        .prepare(
            "INSERT INTO budget (account_id, name, monthly_limit, category_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             RETURNING id",
        )?
        .query_row(
            (
                budget.account_id,
                budget.name.as_ref(),
                budget.monthly_limit,
                budget.category_id,
                now,
            ),
            |row| row.get(0),
        )
        .map_err(|error| match extended_code(&error) {
            Some(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => Error::NotFound,
            _ => Error::from(error),
        })?;

    get_budget(id, connection)
}

/// Retrieve a budget by its `id`.
///
/// # Errors
/// Returns [Error::NotFound] if the budget does not exist.
pub fn get_budget(id: BudgetId, connection: &Connection) -> Result<Budget, Error> {
    let budget = connection
        .prepare(&format!("{SELECT_BUDGET} WHERE b.id = :id"))?
        .query_one(&[(":id", &id)], map_budget_row)?;

    Ok(budget)
}

/// The budgets of `account_id`, newest first.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn list_budgets(account_id: AccountId, connection: &Connection) -> Result<Vec<Budget>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_BUDGET} WHERE b.account_id = :account_id
             ORDER BY b.id DESC"
        ))?
        .query_map(&[(":account_id", &account_id)], map_budget_row)?
        .map(|maybe_budget| maybe_budget.map_err(|error| error.into()))
        .collect()
}

/// Apply `patch` to a budget and store the result.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingBudget] if the budget does not exist,
/// - or [Error::InvalidCategory] if the new category is not one of the budget's account,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_budget(
    id: BudgetId,
    patch: &BudgetPatch,
    connection: &Connection,
) -> Result<Budget, Error> {
    let transaction = connection.unchecked_transaction()?;

    let mut budget = match get_budget(id, &transaction) {
        Ok(budget) => budget,
        Err(Error::NotFound) => return Err(Error::UpdateMissingBudget),
        Err(error) => return Err(error),
    };
    patch.apply_to(&mut budget);

    if patch.category_id.is_some() {
        check_category_account(budget.account_id, budget.category_id, &transaction)?;
    }

    transaction.execute(
        "UPDATE budget SET name = ?1, monthly_limit = ?2, category_id = ?3, updated_at = ?4
         WHERE id = ?5",
        (
            budget.name.as_ref(),
            budget.monthly_limit,
            budget.category_id,
            OffsetDateTime::now_utc(),
            id,
        ),
    )?;
    let updated = get_budget(id, &transaction)?;

    transaction.commit()?;

    Ok(updated)
}

/// Delete a budget.
///
/// # Errors
/// Returns [Error::DeleteMissingBudget] if the budget does not exist.
pub fn delete_budget(id: BudgetId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM budget WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingBudget);
    }

    Ok(())
}
