//! Core category domain types and database queries.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, OptionalExtension, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::{AccountId, Error, database_id::DatabaseId, db::extended_code};

/// Database identifier for a category.
pub type CategoryId = DatabaseId;

/// A validated, non-empty category name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name, trimming surrounding whitespace.
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

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a category groups income or expenses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    /// E.g. salary or interest.
    Income,
    /// E.g. groceries or rent.
    #[default]
    Expense,
}

impl CategoryKind {
    fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::Income => "income",
            CategoryKind::Expense => "expense",
        }
    }
}

impl FromStr for CategoryKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(CategoryKind::Income),
            "expense" => Ok(CategoryKind::Expense),
            other => Err(Error::UnsupportedDirection(other.to_owned())),
        }
    }
}

impl ToSql for CategoryKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for CategoryKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(error.to_string().into()))
    }
}

/// A category for grouping ledger entries, e.g. 'Groceries' or 'Salary'.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The account the category belongs to.
    pub account_id: AccountId,
    /// The name of the category, unique within the account.
    pub name: CategoryName,
    /// Whether the category is for income or expenses.
    pub kind: CategoryKind,
    /// A display colour, e.g. "#ff8800".
    pub color: Option<String>,
}

/// A partial update to a category.
///
/// `None` leaves a field unchanged, `Some(None)` clears the colour.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CategoryPatch {
    /// The new name.
    pub name: Option<CategoryName>,
    /// The new kind.
    pub kind: Option<CategoryKind>,
    /// The new colour.
    pub color: Option<Option<String>>,
}

/// Trim `color` and drop it if nothing is left.
pub(crate) fn normalize_color(color: Option<String>) -> Option<String> {
    color
        .map(|color| color.trim().to_owned())
        .filter(|color| !color.is_empty())
}

/// Create the category table in the database.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('income', 'expense')),
            color TEXT,
            FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE,
            UNIQUE(account_id, name)
        )",
        (),
    )?;

    Ok(())
}

fn map_category_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let id = row.get(0)?;
    let account_id = row.get(1)?;
    let name: String = row.get(2)?;
    let kind = row.get(3)?;
    let color = row.get(4)?;

    Ok(Category {
        id,
        account_id,
        name: CategoryName(name),
        kind,
        color,
    })
}

/// Create a category for `account_id`.
///
/// # Errors
/// Returns [Error::DuplicateCategoryName] if the account already has a
/// category with that name, or [Error::NotFound] if the account does not exist.
pub fn create_category(
    account_id: AccountId,
    name: CategoryName,
    kind: CategoryKind,
    color: Option<String>,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(
            "INSERT INTO category (account_id, name, kind, color) VALUES (?1, ?2, ?3, ?4)
             RETURNING id, account_id, name, kind, color",
        )?
        .query_row(
            (account_id, name.as_ref(), kind, normalize_color(color)),
            map_category_row,
        )
        .map_err(|error| match extended_code(&error) {
            Some(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE) => {
                Error::DuplicateCategoryName(name.to_string())
            }
            Some(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => Error::NotFound,
            _ => error.into(),
        })
}

/// Retrieve a category by its `id`.
///
/// # Errors
/// Returns [Error::NotFound] if the category does not exist.
pub fn get_category(category_id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    let category = connection
        .prepare("SELECT id, account_id, name, kind, color FROM category WHERE id = :id")?
        .query_one(&[(":id", &category_id)], map_category_row)?;

    Ok(category)
}

/// The categories of `account_id` in alphabetical order.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn list_categories(
    account_id: AccountId,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, account_id, name, kind, color FROM category
             WHERE account_id = :account_id ORDER BY name ASC",
        )?
        .query_map(&[(":account_id", &account_id)], map_category_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Apply `patch` to a category and store the result.
///
/// # Errors
/// Returns [Error::UpdateMissingCategory] if the category does not exist, or
/// [Error::DuplicateCategoryName] if the new name is taken within the account.
pub fn update_category(
    category_id: CategoryId,
    patch: &CategoryPatch,
    connection: &Connection,
) -> Result<Category, Error> {
    let mut category = match get_category(category_id, connection) {
        Ok(category) => category,
        Err(Error::NotFound) => return Err(Error::UpdateMissingCategory),
        Err(error) => return Err(error),
    };

    if let Some(name) = &patch.name {
        category.name = name.clone();
    }
    if let Some(kind) = patch.kind {
        category.kind = kind;
    }
    if let Some(color) = &patch.color {
        category.color = normalize_color(color.clone());
    }

    connection
        .prepare(
            "UPDATE category SET name = ?1, kind = ?2, color = ?3 WHERE id = ?4
             RETURNING id, account_id, name, kind, color",
        )?
        .query_row(
            (category.name.as_ref(), category.kind, &category.color, category_id),
            map_category_row,
        )
        .map_err(|error| match extended_code(&error) {
            Some(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE) => {
                Error::DuplicateCategoryName(category.name.to_string())
            }
            _ => error.into(),
        })
}

/// Delete a category.
///
/// Ledger entries and recurring rules that used the category keep existing
/// without a category. Budgets for the category are deleted with it.
///
/// # Errors
/// Returns [Error::DeleteMissingCategory] if the category does not exist.
pub fn delete_category(category_id: CategoryId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM category WHERE id = ?1", [category_id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingCategory);
    }

    Ok(())
}

/// Check that `category_id`, if there is one, is a category of `account_id`.
///
/// # Errors
/// Returns [Error::InvalidCategory] if the category does not exist or belongs
/// to another account.
pub fn check_category_account(
    account_id: AccountId,
    category_id: Option<CategoryId>,
    connection: &Connection,
) -> Result<(), Error> {
    let Some(category_id) = category_id else {
        return Ok(());
    };

    let owner: Option<AccountId> = connection
        .prepare("SELECT account_id FROM category WHERE id = ?1")?
        .query_row([category_id], |row| row.get(0))
        .optional()?;

    match owner {
        Some(owner) if owner == account_id => Ok(()),
        _ => Err(Error::InvalidCategory(Some(category_id))),
    }
}

#[cfg(test)]
pub(crate) fn create_test_category(
    account_id: AccountId,
    name: &str,
    connection: &Connection,
) -> Category {
    create_category(
        account_id,
        CategoryName::new(name).unwrap(),
        CategoryKind::Expense,
        None,
        connection,
    )
    .expect("Could not create test category")
}
