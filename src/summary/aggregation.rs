//! Cash flow aggregation by calendar month.
//!
//! Amounts are split into income and expenses by their sign and summed per
//! month over the twelve months that end with the month of the `as_of` date.

use std::collections::HashMap;

use serde::Serialize;
use time::{Date, Month};

use crate::calendar::preceding_month;

/// The number of months in a summary, including the current month.
pub const SUMMARY_MONTHS: usize = 12;

/// The most categories listed in the breakdown.
pub const MAX_BREAKDOWN_CATEGORIES: usize = 12;

/// The breakdown label for expenses without a category.
pub const UNCATEGORIZED_LABEL: &str = "Uncategorized";

/// A ledger entry reduced to what the summary needs.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryEntry {
    /// The date of the entry in the local timezone.
    pub local_date: Date,
    /// The signed amount.
    pub amount: f64,
    /// The name of the entry's category, if it has one.
    pub category_name: Option<String>,
}

/// Income and expenses for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthSummary {
    /// The month formatted as `YYYY-MM`.
    pub month: String,
    /// Money earned.
    pub income: f64,
    /// Money spent, as a positive number.
    pub expense: f64,
    /// Income minus expenses.
    pub net: f64,
}

/// Income and expenses summed over every month in the summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    /// Money earned.
    pub income: f64,
    /// Money spent, as a positive number.
    pub expense: f64,
    /// Income minus expenses.
    pub net: f64,
}

/// The expenses of one category in the current month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryAmount {
    /// The category name, or [UNCATEGORIZED_LABEL].
    pub name: String,
    /// Money spent, as a positive number.
    pub amount: f64,
}

/// The cash flow of an account over the last twelve months.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashFlowSummary {
    /// The date the summary was made for.
    pub as_of: Date,
    /// One entry per month, oldest first.
    pub months: Vec<MonthSummary>,
    /// The sum over `months`.
    pub totals: Totals,
    /// The current month's expenses per category, largest first.
    pub category_breakdown: Vec<CategoryAmount>,
}

/// The first day of the oldest month in a summary for `as_of`.
pub fn summary_start(as_of: Date) -> Date {
    let (year, month) = summary_months(as_of)[0];

    // Only unrepresentable when `as_of` is in the first year of the supported range.
    Date::from_calendar_date(year, month, 1).unwrap_or(as_of)
}

/// The months of a summary for `as_of`, oldest first.
fn summary_months(as_of: Date) -> Vec<(i32, Month)> {
    let mut months = Vec::with_capacity(SUMMARY_MONTHS);
    let mut current = (as_of.year(), as_of.month());

    for _ in 0..SUMMARY_MONTHS {
        months.push(current);
        current = preceding_month(current.0, current.1);
    }

    months.reverse();
    months
}

fn format_month_key((year, month): (i32, Month)) -> String {
    format!("{year:04}-{:02}", month as u8)
}

/// Summarize `entries` for the twelve months ending with the month of `as_of`.
///
/// Entries outside of those months, or after `as_of`, are ignored.
pub fn summarize(entries: &[SummaryEntry], as_of: Date) -> CashFlowSummary {
    let months = summary_months(as_of);
    let current_month = (as_of.year(), as_of.month());

    let mut monthly: HashMap<(i32, Month), Totals> = HashMap::new();
    let mut by_category: HashMap<String, f64> = HashMap::new();

    for entry in entries {
        let month = (entry.local_date.year(), entry.local_date.month());

        if entry.local_date > as_of || !months.contains(&month) {
            continue;
        }

        let totals = monthly.entry(month).or_default();
        let amount = entry.amount.abs();

        if entry.amount >= 0.0 {
            totals.income += amount;
            totals.net += amount;
        } else {
            totals.expense += amount;
            totals.net -= amount;

            if month == current_month {
                let name = entry
                    .category_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .unwrap_or(UNCATEGORIZED_LABEL);
                *by_category.entry(name.to_owned()).or_insert(0.0) += amount;
            }
        }
    }

    let months: Vec<MonthSummary> = months
        .into_iter()
        .map(|month| {
            let totals = monthly.remove(&month).unwrap_or_default();

            MonthSummary {
                month: format_month_key(month),
                income: totals.income,
                expense: totals.expense,
                net: totals.net,
            }
        })
        .collect();

    let totals = months.iter().fold(Totals::default(), |mut totals, month| {
        totals.income += month.income;
        totals.expense += month.expense;
        totals.net += month.net;
        totals
    });

    let mut category_breakdown: Vec<CategoryAmount> = by_category
        .into_iter()
        .map(|(name, amount)| CategoryAmount { name, amount })
        .collect();
    category_breakdown.sort_by(|a, b| {
        b.amount
            .total_cmp(&a.amount)
            .then_with(|| a.name.cmp(&b.name))
    });
    category_breakdown.truncate(MAX_BREAKDOWN_CATEGORIES);

    CashFlowSummary {
        as_of,
        months,
        totals,
        category_breakdown,
    }
}
