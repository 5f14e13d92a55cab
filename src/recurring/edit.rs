//! Recurring rule update endpoint.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    Error,
    db::lock_connection,
    recurring::{
        RecurringRule, RecurringRuleId, RecurringRuleState, RulePatchForm, RuleStore,
        SQLiteRuleStore, schedule::compute_initial_next_run,
    },
};

/// Apply a partial update to a recurring rule.
///
/// The next run date is kept unless the body sets `next_run_date`, or sets
/// `recompute_next_run` to work it out again from the updated schedule.
pub async fn update_rule_endpoint(
    State(state): State<RecurringRuleState>,
    Path(rule_id): Path<RecurringRuleId>,
    Json(form): Json<RulePatchForm>,
) -> Result<Json<RecurringRule>, Error> {
    let recompute_next_run = form.recompute_next_run;
    let mut patch = form.validate()?;

    let connection = lock_connection(&state.db_connection)?;
    let store = SQLiteRuleStore::new(&connection);

    if recompute_next_run && patch.next_run_date.is_none() {
        let mut updated = match store.get_rule(rule_id) {
            Ok(rule) => rule,
            Err(Error::NotFound) => return Err(Error::UpdateMissingRule),
            Err(error) => return Err(error),
        };
        patch.apply_to(&mut updated);

        patch.next_run_date = Some(compute_initial_next_run(
            updated.cadence,
            updated.start_date,
            updated.day_of_month,
            updated.weekday,
        )?);
    }

    let rule = store.update_rule(rule_id, &patch)?;
    tracing::info!(
        "Updated recurring rule #{rule_id}, next run on {}",
        rule.next_run_date
    );

    Ok(Json(rule))
}
