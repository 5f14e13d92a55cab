//! The API endpoint URIs.
//!
//! For endpoints that take a parameter, e.g. `/api/accounts/{account_id}`,
//! use [format_endpoint] to fill in the ID.

/// The route to list and create accounts.
pub const ACCOUNTS: &str = "/api/accounts";
/// The route to fetch a single account.
pub const ACCOUNT: &str = "/api/accounts/{account_id}";
/// The route to list and create the categories of an account.
pub const ACCOUNT_CATEGORIES: &str = "/api/accounts/{account_id}/categories";
/// The route to edit and delete a category.
pub const CATEGORY: &str = "/api/categories/{category_id}";
/// The route to list and create the ledger entries of an account.
pub const ACCOUNT_TRANSACTIONS: &str = "/api/accounts/{account_id}/transactions";
/// The route to edit and delete a ledger entry.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route to list and create the recurring rules of an account.
pub const ACCOUNT_RECURRING_RULES: &str = "/api/accounts/{account_id}/recurring_rules";
/// The route to update and delete a recurring rule.
pub const RECURRING_RULE: &str = "/api/recurring_rules/{rule_id}";
/// The route to post every recurring rule of an account that is due.
pub const RUN_RECURRING_RULES: &str = "/api/accounts/{account_id}/recurring_rules/run";
/// The route for the cash flow summary of an account.
pub const ACCOUNT_SUMMARY: &str = "/api/accounts/{account_id}/summary";
/// The route to list and create the budgets of an account.
pub const ACCOUNT_BUDGETS: &str = "/api/accounts/{account_id}/budgets";
/// The route for the spending of an account against its budgets this month.
pub const ACCOUNT_BUDGET_SUMMARY: &str = "/api/accounts/{account_id}/budgets/summary";
/// The route to edit and delete a budget.
pub const BUDGET: &str = "/api/budgets/{budget_id}";

/// Replace the first `{parameter}` in `endpoint_path` with `id`.
///
/// Paths without a parameter are returned unchanged.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let end = endpoint_path[start..]
        .find('}')
        .map_or(endpoint_path.len(), |offset| start + offset + 1);

    format!("{}{id}{}", &endpoint_path[..start], &endpoint_path[end..])
}
