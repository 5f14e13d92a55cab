//! Spending against each budget in the current calendar month.
//!
//! Entries with a negative amount are expenses. A category budget counts the
//! expenses of its category, an overall budget counts every expense.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    AccountId, CategoryId, Error,
    account::get_account,
    budget::{Budget, BudgetId, BudgetName, BudgetState, list_budgets},
    calendar::{following_month, parse_iso_date},
    db::lock_connection,
    timezone::{get_local_offset, local_midnight_utc},
};

/// A ledger entry reduced to what the budget summary needs.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetEntry {
    /// The signed amount.
    pub amount: f64,
    /// The category of the entry.
    pub category_id: Option<CategoryId>,
}

/// How much of one budget has been used this month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetProgress {
    /// The ID of the budget.
    pub id: BudgetId,
    /// The name of the budget.
    pub name: BudgetName,
    /// The category the budget is for, `None` for an overall budget.
    pub category_id: Option<CategoryId>,
    /// The name of the budget's category.
    pub category_name: Option<String>,
    /// The monthly limit.
    pub monthly_limit: f64,
    /// Money spent this month, as a positive number.
    pub spent: f64,
    /// What is left of the limit, never below zero.
    pub remaining: f64,
    /// `spent` as a whole percentage of the limit, at most 100.
    pub percent: u8,
}

/// The budgets of an account for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetSummary {
    /// The first day of the month.
    pub month_start: Date,
    /// One item per budget, ordered by name.
    pub items: Vec<BudgetProgress>,
}

/// The first day of the month containing `date` and of the month after.
pub fn month_window(date: Date) -> Result<(Date, Date), Error> {
    let start = date.replace_day(1).map_err(|_| Error::DateOutOfRange(date))?;
    let (year, month) = following_month(date.year(), date.month());
    let end = Date::from_calendar_date(year, month, 1).map_err(|_| Error::DateOutOfRange(date))?;

    Ok((start, end))
}

/// Work out the progress of each budget from the month's entries.
pub fn summarize_budgets(budgets: Vec<Budget>, entries: &[BudgetEntry]) -> Vec<BudgetProgress> {
    let mut total_expenses = 0.0;
    let mut expenses_by_category: HashMap<CategoryId, f64> = HashMap::new();

    for entry in entries.iter().filter(|entry| entry.amount < 0.0) {
        let expense = entry.amount.abs();
        total_expenses += expense;

        if let Some(category_id) = entry.category_id {
            *expenses_by_category.entry(category_id).or_default() += expense;
        }
    }

    let mut items: Vec<BudgetProgress> = budgets
        .into_iter()
        .map(|budget| {
            let spent = match budget.category_id {
                Some(category_id) => expenses_by_category
                    .get(&category_id)
                    .copied()
                    .unwrap_or_default(),
                None => total_expenses,
            };

            BudgetProgress {
                id: budget.id,
                name: budget.name,
                category_id: budget.category_id,
                category_name: budget.category_name,
                monthly_limit: budget.monthly_limit,
                spent,
                remaining: (budget.monthly_limit - spent).max(0.0),
                percent: percent_used(spent, budget.monthly_limit),
            }
        })
        .collect();

    items.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

    items
}

fn percent_used(spent: f64, limit: f64) -> u8 {
    if limit > 0.0 {
        (spent / limit * 100.0).round().min(100.0) as u8
    } else {
        0
    }
}

/// The query parameters for the budget summary.
#[derive(Debug, Default, Deserialize)]
pub struct BudgetSummaryQuery {
    /// Any date in the month to summarize (`YYYY-MM-DD`), defaults to today.
    pub as_of: Option<String>,
}

/// The spending of an account against its budgets in the month of `as_of`.
pub async fn get_budget_summary_endpoint(
    State(state): State<BudgetState>,
    Path(account_id): Path<AccountId>,
    Query(query): Query<BudgetSummaryQuery>,
) -> Result<Json<BudgetSummary>, Error> {
    let local_offset = get_local_offset(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;
    let as_of = match query.as_of.as_deref() {
        Some(as_of) => parse_iso_date(as_of)?,
        None => OffsetDateTime::now_utc().to_offset(local_offset).date(),
    };
    let (month_start, next_month_start) = month_window(as_of)?;

    let connection = lock_connection(&state.db_connection)?;
    get_account(account_id, &connection)?;

    let budgets = list_budgets(account_id, &connection)?;
    let entries = get_month_entries(
        account_id,
        local_midnight_utc(month_start, local_offset),
        local_midnight_utc(next_month_start, local_offset),
        &connection,
    )?;

    Ok(Json(BudgetSummary {
        month_start,
        items: summarize_budgets(budgets, &entries),
    }))
}

fn get_month_entries(
    account_id: AccountId,
    start: OffsetDateTime,
    end: OffsetDateTime,
    connection: &Connection,
) -> Result<Vec<BudgetEntry>, Error> {
    connection
        .prepare(
            "SELECT amount, category_id FROM \"transaction\"
             WHERE account_id = ?1 AND occurred_at >= ?2 AND occurred_at < ?3",
        )?
        .query_map((account_id, start, end), |row| {
            Ok(BudgetEntry {
                amount: row.get(0)?,
                category_id: row.get(1)?,
            })
        })?
        .map(|maybe_entry| maybe_entry.map_err(|error| error.into()))
        .collect()
}
