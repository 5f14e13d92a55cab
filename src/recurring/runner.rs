//! Posts every due recurring rule of an account to the ledger.
//!
//! Each rule is handled on its own: a rule that fails to post is reported and
//! left due, the remaining rules still run. Posting an occurrence and moving
//! the rule's cursor are two separate writes. Every posted entry carries the
//! key `"{rule_id}:{scheduled_date}"` and the ledger refuses a second entry
//! with the same key, so a run that stopped between the two writes is
//! finished by the next run instead of posting the occurrence again.

use std::time::Instant;

use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::{
    AccountId, Error,
    recurring::{RecurringRule, RecurringRuleId, RuleStore, schedule::compute_next_after},
    transaction::{Ledger, Transaction, TransactionId, TransactionStatus},
};

/// The inputs of a run.
///
/// The clock is passed in so that runs can be replayed for a given day.
#[derive(Debug, Clone, Copy)]
pub struct RunRequest {
    /// The account whose rules are run.
    pub account_id: AccountId,
    /// Rules with a next run date on or before this date are due.
    pub as_of: Date,
    /// The timestamp given to posted entries.
    pub now: OffsetDateTime,
    /// Rules that are reached after this instant are deferred.
    pub deadline: Option<Instant>,
}

/// What happened to a single due rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// An entry was posted and the cursor moved to `next_run_date`.
    Posted {
        /// The posted entry.
        transaction_id: TransactionId,
        /// The rule's new next run date.
        next_run_date: Date,
    },
    /// The occurrence had already been posted by an earlier run, only the
    /// cursor was moved.
    Reconciled {
        /// The rule's new next run date.
        next_run_date: Date,
    },
    /// No entry was posted and the cursor was left alone.
    Failed {
        /// Why the entry could not be posted.
        error: String,
    },
    /// An entry was posted but the cursor could not be moved.
    ///
    /// The next run reconciles the rule through the entry's recurrence key.
    AdvancementFailed {
        /// The posted entry.
        transaction_id: TransactionId,
        /// Why the cursor could not be moved.
        error: String,
    },
    /// The run ran out of time before reaching the rule, it is still due.
    Deferred,
}

/// The outcome for one rule in a [RunReport].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleOutcome {
    /// The rule that was due.
    pub rule_id: RecurringRuleId,
    /// The next run date the rule had when the run started.
    pub scheduled_date: Date,
    /// What happened.
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

/// The result of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// The date the run was made for.
    pub as_of: Date,
    /// The number of ledger entries posted by this run.
    pub posted_count: usize,
    /// One outcome per due rule, in the order the rules were run.
    pub outcomes: Vec<RuleOutcome>,
}

impl RunReport {
    /// The rules that could not be posted.
    pub fn failed_rule_ids(&self) -> Vec<RecurringRuleId> {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.status, OutcomeStatus::Failed { .. }))
            .map(|outcome| outcome.rule_id)
            .collect()
    }
}

/// The idempotency key for the occurrence of `rule_id` on `scheduled_date`.
pub fn recurrence_key(rule_id: RecurringRuleId, scheduled_date: Date) -> String {
    format!("{rule_id}:{scheduled_date}")
}

/// Post every due rule of `request.account_id` and move each rule's cursor.
///
/// # Errors
/// Returns an error only if the due rules could not be listed. Errors for
/// individual rules are reported in the [RunReport].
pub fn run_due(
    rule_store: &impl RuleStore,
    ledger: &impl Ledger,
    request: RunRequest,
) -> Result<RunReport, Error> {
    let due_rules = rule_store.list_due_rules(request.account_id, request.as_of)?;

    tracing::info!(
        "Running {} due recurring rule(s) for account #{} as of {}",
        due_rules.len(),
        request.account_id,
        request.as_of
    );

    let mut posted_count = 0;
    let mut outcomes = Vec::with_capacity(due_rules.len());

    for rule in due_rules {
        let status = match request.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                tracing::warn!("Deferred recurring rule #{}, the run timed out", rule.id);
                OutcomeStatus::Deferred
            }
            _ => run_rule(rule_store, ledger, &rule, request.now),
        };

        if matches!(
            status,
            OutcomeStatus::Posted { .. } | OutcomeStatus::AdvancementFailed { .. }
        ) {
            posted_count += 1;
        }

        outcomes.push(RuleOutcome {
            rule_id: rule.id,
            scheduled_date: rule.next_run_date,
            status,
        });
    }

    Ok(RunReport {
        as_of: request.as_of,
        posted_count,
        outcomes,
    })
}

fn run_rule(
    rule_store: &impl RuleStore,
    ledger: &impl Ledger,
    rule: &RecurringRule,
    now: OffsetDateTime,
) -> OutcomeStatus {
    let scheduled_date = rule.next_run_date;
    let entry = Transaction::build(rule.account_id, rule.amount, now)
        .category_id(rule.category_id)
        .description(rule.description.clone())
        .status(TransactionStatus::Posted)
        .recurrence_key(Some(recurrence_key(rule.id, scheduled_date)));

    let transaction_id = match ledger.append_entry(entry) {
        Ok(transaction) => Some(transaction.id),
        Err(Error::DuplicatePosting) => {
            tracing::info!(
                "Recurring rule #{} was already posted for {scheduled_date}, moving its next run date",
                rule.id
            );
            None
        }
        Err(error) => {
            tracing::warn!("Could not post recurring rule #{}: {error}", rule.id);
            return OutcomeStatus::Failed {
                error: error.to_string(),
            };
        }
    };

    let advanced = compute_next_after(rule.cadence, scheduled_date, rule.day_of_month)
        .and_then(|next_run_date| {
            if next_run_date != scheduled_date {
                rule_store.update_next_run_date(rule.id, scheduled_date, next_run_date)?;
            }

            Ok(next_run_date)
        });

    match (transaction_id, advanced) {
        (Some(transaction_id), Ok(next_run_date)) => {
            tracing::debug!(
                "Posted recurring rule #{} as transaction #{transaction_id}, next run on {next_run_date}",
                rule.id
            );
            OutcomeStatus::Posted {
                transaction_id,
                next_run_date,
            }
        }
        (None, Ok(next_run_date)) => OutcomeStatus::Reconciled { next_run_date },
        (Some(transaction_id), Err(error)) => {
            tracing::error!(
                "Posted recurring rule #{} as transaction #{transaction_id} but could not move its next run date from {scheduled_date}: {error}",
                rule.id
            );
            OutcomeStatus::AdvancementFailed {
                transaction_id,
                error: error.to_string(),
            }
        }
        (None, Err(error)) => {
            tracing::warn!(
                "Could not move the next run date of already posted recurring rule #{}: {error}",
                rule.id
            );
            OutcomeStatus::Failed {
                error: error.to_string(),
            }
        }
    }
}
