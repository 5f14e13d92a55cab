//! Monthly cash flow summary of an account.

mod aggregation;
mod endpoint;

pub use aggregation::{CashFlowSummary, CategoryAmount, MonthSummary, Totals};
pub use endpoint::{SummaryQuery, SummaryState, get_summary_endpoint};
