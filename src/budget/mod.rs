//! Monthly spending limits, either for one category or for all expenses.

mod core;
mod create;
mod delete;
mod edit;
mod list;
mod summary;

pub use core::{
    Budget, BudgetId, BudgetName, BudgetPatch, NewBudget, create_budget, create_budget_table,
    delete_budget, get_budget, list_budgets, update_budget, validate_monthly_limit,
};
pub use create::{BudgetForm, BudgetState, create_budget_endpoint};
pub use delete::delete_budget_endpoint;
pub use edit::{BudgetPatchForm, update_budget_endpoint};
pub use list::list_budgets_endpoint;
pub use summary::{
    BudgetEntry, BudgetProgress, BudgetSummary, BudgetSummaryQuery, get_budget_summary_endpoint,
    month_window, summarize_budgets,
};
