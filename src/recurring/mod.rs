//! Recurring rules post an income or expense to the ledger on a schedule.
//!
//! A rule has a cadence (monthly, weekly, biweekly or custom), an anchor date
//! and a cursor, its next run date. Running the rules of an account posts one
//! ledger entry for every active rule whose cursor is on or before the run
//! date, then moves each cursor to the next date in the rule's schedule.

mod create;
mod db;
mod delete;
mod edit;
mod list;
mod models;
mod run;
mod runner;
mod schedule;
mod store;

pub use create::{RecurringRuleState, create_rule_endpoint};
pub use db::{SQLiteRuleStore, create_recurring_rule_table};
pub use delete::delete_rule_endpoint;
pub use edit::update_rule_endpoint;
pub use list::list_rules_endpoint;
pub use models::{
    Cadence, DayOfMonth, Direction, NewRecurringRule, NewRecurringRuleForm, RecurringRule,
    RecurringRuleId, RulePatch, RulePatchForm, normalize_signed_amount, parse_weekday,
    validate_amount,
};
pub use run::{RunQuery, RunRulesState, run_rules_endpoint};
pub use runner::{OutcomeStatus, RuleOutcome, RunReport, RunRequest, recurrence_key, run_due};
pub use schedule::{compute_initial_next_run, compute_next_after};
pub use store::RuleStore;

pub(crate) use models::normalize_description;
