//! The storage interface the runner and the HTTP handlers use for rules.

use time::Date;

use crate::{
    AccountId, Error,
    recurring::{NewRecurringRule, RecurringRule, RecurringRuleId, RulePatch},
};

/// Reads and writes recurring rules.
pub trait RuleStore {
    /// The active rules of `account_id` with a next run date on or before
    /// `as_of`, ordered by next run date and then ID.
    fn list_due_rules(&self, account_id: AccountId, as_of: Date)
    -> Result<Vec<RecurringRule>, Error>;

    /// Move the cursor of `rule_id` from `expected_current` to `new_date`.
    ///
    /// # Errors
    /// Returns [Error::CursorConflict] if the rule no longer exists or its
    /// next run date is no longer `expected_current`.
    fn update_next_run_date(
        &self,
        rule_id: RecurringRuleId,
        expected_current: Date,
        new_date: Date,
    ) -> Result<(), Error>;

    /// Store a new rule.
    fn create_rule(&self, rule: NewRecurringRule) -> Result<RecurringRule, Error>;

    /// Apply `patch` to the rule and return the updated rule.
    fn update_rule(&self, rule_id: RecurringRuleId, patch: &RulePatch)
    -> Result<RecurringRule, Error>;

    /// Remove a rule.
    fn delete_rule(&self, rule_id: RecurringRuleId) -> Result<(), Error>;

    /// Fetch a single rule.
    fn get_rule(&self, rule_id: RecurringRuleId) -> Result<RecurringRule, Error>;

    /// All rules of an account, newest first.
    fn list_rules(&self, account_id: AccountId) -> Result<Vec<RecurringRule>, Error>;
}
