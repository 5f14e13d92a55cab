//! Core recurring rule domain types.
//!
//! Request bodies arrive as loosely typed forms ([NewRecurringRuleForm],
//! [RulePatchForm]) and are validated into [NewRecurringRule] and [RulePatch]
//! before they reach the store or the schedule calculations, so the
//! calculations only ever see a [Cadence], a [DayOfMonth] and a [Weekday].

use std::{fmt::Display, str::FromStr};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, Weekday};

use crate::{
    AccountId, CategoryId, Error,
    calendar::{weekday_from_number, weekday_number},
    database_id::DatabaseId,
    patch::deserialize_present,
    recurring::schedule::compute_initial_next_run,
};

/// Database identifier for a recurring rule.
pub type RecurringRuleId = DatabaseId;

/// How often a recurring rule falls due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    /// Once per calendar month on a day of the month.
    Monthly,
    /// Once per week on a weekday.
    Weekly,
    /// Every 14 days.
    Biweekly,
    /// Never advances by itself, the next run date is managed by hand.
    Custom,
}

impl Cadence {
    /// The lowercase name used in requests and in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Cadence::Monthly => "monthly",
            Cadence::Weekly => "weekly",
            Cadence::Biweekly => "biweekly",
            Cadence::Custom => "custom",
        }
    }
}

impl Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Cadence {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" => Ok(Cadence::Monthly),
            "weekly" => Ok(Cadence::Weekly),
            "biweekly" => Ok(Cadence::Biweekly),
            "custom" => Ok(Cadence::Custom),
            _ => Err(Error::UnsupportedCadence(s.to_owned())),
        }
    }
}

impl ToSql for Cadence {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for Cadence {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(error.to_string().into()))
    }
}

/// Whether money comes in or goes out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Money earned, stored as a positive amount.
    Income,
    /// Money spent, stored as a negative amount.
    #[default]
    Expense,
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(Direction::Income),
            "expense" => Ok(Direction::Expense),
            _ => Err(Error::UnsupportedDirection(s.to_owned())),
        }
    }
}

/// Give `amount` the sign that matches `direction`.
///
/// Income is positive and expenses are negative regardless of the sign the
/// caller used. Every write path for amounts goes through this function.
pub fn normalize_signed_amount(amount: f64, direction: Direction) -> f64 {
    match direction {
        Direction::Income => amount.abs(),
        Direction::Expense => -amount.abs(),
    }
}

/// Check that `amount` is a usable number.
///
/// # Errors
/// Returns [Error::InvalidAmount] if `amount` is NaN or infinite.
pub fn validate_amount(amount: f64) -> Result<f64, Error> {
    if amount.is_finite() {
        Ok(amount)
    } else {
        Err(Error::InvalidAmount)
    }
}

/// A day of the month from 1 to 31.
///
/// Days that do not exist in a given month are clamped when a date is
/// computed, not when the rule is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct DayOfMonth(u8);

impl DayOfMonth {
    /// Create a day of the month.
    ///
    /// # Errors
    /// Returns [Error::InvalidDayOfMonth] if `day` is not within 1-31.
    pub fn new(day: i64) -> Result<Self, Error> {
        match u8::try_from(day) {
            Ok(day @ 1..=31) => Ok(Self(day)),
            _ => Err(Error::InvalidDayOfMonth(day)),
        }
    }

    /// The day of the month that `date` falls on.
    pub fn of(date: Date) -> Self {
        Self(date.day())
    }

    /// The day as a number.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for DayOfMonth {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        DayOfMonth::new(value)
    }
}

impl From<DayOfMonth> for u8 {
    fn from(value: DayOfMonth) -> Self {
        value.0
    }
}

impl Display for DayOfMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToSql for DayOfMonth {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

impl FromSql for DayOfMonth {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        DayOfMonth::new(value.as_i64()?).map_err(|error| FromSqlError::Other(error.to_string().into()))
    }
}

/// Convert a weekday number (0 is Sunday) from a request or the database.
///
/// # Errors
/// Returns [Error::InvalidWeekday] if `number` is not within 0-6.
pub fn parse_weekday(number: i64) -> Result<Weekday, Error> {
    u8::try_from(number)
        .ok()
        .and_then(weekday_from_number)
        .ok_or(Error::InvalidWeekday(number))
}

/// (De)serialize an optional [Weekday] as a number where 0 is Sunday.
mod optional_weekday {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use time::Weekday;

    use crate::calendar::weekday_number;

    use super::parse_weekday;

    pub fn serialize<S: Serializer>(
        weekday: &Option<Weekday>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        weekday.map(weekday_number).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Weekday>, D::Error> {
        Option::<i64>::deserialize(deserializer)?
            .map(parse_weekday)
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}

/// A recurring income or expense that is posted to the ledger on a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringRule {
    /// The ID of the rule.
    pub id: RecurringRuleId,
    /// The account that owns the rule and receives its ledger entries.
    pub account_id: AccountId,
    /// The category given to each ledger entry.
    pub category_id: Option<CategoryId>,
    /// The signed amount of each ledger entry, negative for expenses.
    pub amount: f64,
    /// How often the rule falls due.
    pub cadence: Cadence,
    /// The day of the month for monthly rules.
    pub day_of_month: Option<DayOfMonth>,
    /// The weekday for weekly rules, 0 (Sunday) to 6 (Saturday) on the wire.
    #[serde(default, with = "optional_weekday")]
    pub weekday: Option<Weekday>,
    /// The date the schedule is anchored on.
    pub start_date: Date,
    /// The next date the rule is due on.
    pub next_run_date: Date,
    /// Inactive rules are never run.
    pub active: bool,
    /// The description given to each ledger entry.
    pub description: Option<String>,
    /// When the rule was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Keep only the schedule parameter that applies to `cadence`.
///
/// Monthly rules always carry a day of the month and weekly rules always carry
/// a weekday, falling back to the start date's. This pins the day a monthly
/// rule returns to after a short month, e.g. the 31st after February.
pub(crate) fn anchor_schedule_fields(
    cadence: Cadence,
    start_date: Date,
    day_of_month: Option<DayOfMonth>,
    weekday: Option<Weekday>,
) -> (Option<DayOfMonth>, Option<Weekday>) {
    match cadence {
        Cadence::Monthly => (
            Some(day_of_month.unwrap_or_else(|| DayOfMonth::of(start_date))),
            None,
        ),
        Cadence::Weekly => (None, Some(weekday.unwrap_or(start_date.weekday()))),
        Cadence::Biweekly | Cadence::Custom => (None, None),
    }
}

pub(crate) fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|description| description.trim().to_owned())
        .filter(|description| !description.is_empty())
}

/// A validated recurring rule that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecurringRule {
    /// The account that owns the rule.
    pub account_id: AccountId,
    /// The category given to each ledger entry.
    pub category_id: Option<CategoryId>,
    /// The signed amount of each ledger entry.
    pub amount: f64,
    /// How often the rule falls due.
    pub cadence: Cadence,
    /// The day of the month for monthly rules.
    pub day_of_month: Option<DayOfMonth>,
    /// The weekday for weekly rules.
    pub weekday: Option<Weekday>,
    /// The date the schedule is anchored on.
    pub start_date: Date,
    /// The first date the rule is due on.
    pub next_run_date: Date,
    /// Whether the rule is run.
    pub active: bool,
    /// The description given to each ledger entry.
    pub description: Option<String>,
}

/// The request body for creating a recurring rule.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct NewRecurringRuleForm {
    /// The amount, the sign is taken from `direction`.
    pub amount: Option<f64>,
    /// `income` or `expense`, defaults to `expense`.
    pub direction: Option<String>,
    /// Defaults to `monthly`.
    pub cadence: Option<String>,
    /// 1-31, only used by monthly rules.
    pub day_of_month: Option<i64>,
    /// 0 (Sunday) to 6 (Saturday), only used by weekly rules.
    pub weekday: Option<i64>,
    /// Defaults to today.
    pub start_date: Option<Date>,
    /// The category given to each ledger entry.
    pub category_id: Option<CategoryId>,
    /// The description given to each ledger entry.
    pub description: Option<String>,
    /// Defaults to `true`.
    pub active: Option<bool>,
}

impl NewRecurringRuleForm {
    /// Validate the form and compute the rule's first run date.
    ///
    /// `today` is used as the start date when the form does not have one.
    ///
    /// # Errors
    /// Returns a validation error for a missing or non-finite amount, an
    /// unknown cadence or direction, or an out of range day of the month or
    /// weekday.
    pub fn validate(self, account_id: AccountId, today: Date) -> Result<NewRecurringRule, Error> {
        let amount = validate_amount(self.amount.ok_or(Error::InvalidAmount)?)?;
        let direction = self
            .direction
            .as_deref()
            .map(Direction::from_str)
            .transpose()?
            .unwrap_or_default();
        let cadence = self
            .cadence
            .as_deref()
            .map(Cadence::from_str)
            .transpose()?
            .unwrap_or(Cadence::Monthly);
        let day_of_month = self.day_of_month.map(DayOfMonth::new).transpose()?;
        let weekday = self.weekday.map(parse_weekday).transpose()?;
        let start_date = self.start_date.unwrap_or(today);

        let (day_of_month, weekday) =
            anchor_schedule_fields(cadence, start_date, day_of_month, weekday);
        let next_run_date = compute_initial_next_run(cadence, start_date, day_of_month, weekday)?;

        Ok(NewRecurringRule {
            account_id,
            category_id: self.category_id,
            amount: normalize_signed_amount(amount, direction),
            cadence,
            day_of_month,
            weekday,
            start_date,
            next_run_date,
            active: self.active.unwrap_or(true),
            description: normalize_description(self.description),
        })
    }
}

/// A partial update to a recurring rule.
///
/// `None` leaves a field unchanged. For nullable fields, `Some(None)` clears
/// the field.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RulePatch {
    /// The new category.
    pub category_id: Option<Option<CategoryId>>,
    /// The new signed amount.
    pub amount: Option<f64>,
    /// The new cadence.
    pub cadence: Option<Cadence>,
    /// The new day of the month.
    pub day_of_month: Option<Option<DayOfMonth>>,
    /// The new weekday.
    pub weekday: Option<Option<Weekday>>,
    /// The new anchor date.
    pub start_date: Option<Date>,
    /// The new cursor.
    pub next_run_date: Option<Date>,
    /// The new active flag.
    pub active: Option<bool>,
    /// The new description.
    pub description: Option<Option<String>>,
}

impl RulePatch {
    /// Apply the changes to `rule`.
    ///
    /// The next run date only changes if the patch sets it, editing the
    /// schedule does not move the cursor.
    pub fn apply_to(&self, rule: &mut RecurringRule) {
        if let Some(category_id) = self.category_id {
            rule.category_id = category_id;
        }
        if let Some(amount) = self.amount {
            rule.amount = amount;
        }
        if let Some(cadence) = self.cadence {
            rule.cadence = cadence;
        }
        if let Some(day_of_month) = self.day_of_month {
            rule.day_of_month = day_of_month;
        }
        if let Some(weekday) = self.weekday {
            rule.weekday = weekday;
        }
        if let Some(start_date) = self.start_date {
            rule.start_date = start_date;
        }
        if let Some(next_run_date) = self.next_run_date {
            rule.next_run_date = next_run_date;
        }
        if let Some(active) = self.active {
            rule.active = active;
        }
        if let Some(description) = &self.description {
            rule.description = description.clone();
        }

        (rule.day_of_month, rule.weekday) =
            anchor_schedule_fields(rule.cadence, rule.start_date, rule.day_of_month, rule.weekday);
    }
}

/// The request body for updating a recurring rule.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RulePatchForm {
    /// The new amount, the sign is taken from `direction`.
    pub amount: Option<f64>,
    /// `income` or `expense`, defaults to `expense` when `amount` is given.
    pub direction: Option<String>,
    /// The new cadence.
    pub cadence: Option<String>,
    /// The new day of the month, `null` clears it.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub day_of_month: Option<Option<i64>>,
    /// The new weekday, `null` clears it.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub weekday: Option<Option<i64>>,
    /// The new anchor date.
    pub start_date: Option<Date>,
    /// Set the cursor directly.
    pub next_run_date: Option<Date>,
    /// The new category, `null` clears it.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub category_id: Option<Option<CategoryId>>,
    /// The new description, `null` clears it.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub description: Option<Option<String>>,
    /// The new active flag.
    pub active: Option<bool>,
    /// Recompute the cursor from the updated schedule instead of keeping it.
    #[serde(default)]
    pub recompute_next_run: bool,
}

impl RulePatchForm {
    /// Validate the form into a [RulePatch].
    ///
    /// # Errors
    /// Returns the same validation errors as [NewRecurringRuleForm::validate].
    pub fn validate(self) -> Result<RulePatch, Error> {
        let direction = self
            .direction
            .as_deref()
            .map(Direction::from_str)
            .transpose()?
            .unwrap_or_default();
        let amount = self
            .amount
            .map(validate_amount)
            .transpose()?
            .map(|amount| normalize_signed_amount(amount, direction));
        let cadence = self.cadence.as_deref().map(Cadence::from_str).transpose()?;
        let day_of_month = self
            .day_of_month
            .map(|day| day.map(DayOfMonth::new).transpose())
            .transpose()?;
        let weekday = self
            .weekday
            .map(|weekday| weekday.map(parse_weekday).transpose())
            .transpose()?;

        Ok(RulePatch {
            category_id: self.category_id,
            amount,
            cadence,
            day_of_month,
            weekday,
            start_date: self.start_date,
            next_run_date: self.next_run_date,
            active: self.active,
            description: self.description.map(normalize_description),
        })
    }
}

/// The number of `weekday` as stored in the database.
pub(crate) fn weekday_column(weekday: Option<Weekday>) -> Option<u8> {
    weekday.map(weekday_number)
}



#[cfg(test)]
mod new_rule_form_tests {
    use serde_json::json;
    use time::{Weekday, macros::date};

    use crate::Error;

    use super::{Cadence, DayOfMonth, NewRecurringRuleForm};

    fn form(value: serde_json::Value) -> NewRecurringRuleForm {
        serde_json::from_value(value).expect("Could not parse form")
    }

    #[test]
    fn applies_defaults() {
        let today = date!(2024 - 05 - 10);

        let rule = form(json!({ "amount": 20 })).validate(1, today).unwrap();

        assert_eq!(rule.account_id, 1);
        assert_eq!(rule.amount, -20.0);
        assert_eq!(rule.cadence, Cadence::Monthly);
        assert_eq!(rule.start_date, today);
        assert_eq!(rule.next_run_date, today);
        assert_eq!(rule.day_of_month, Some(DayOfMonth::new(10).unwrap()));
        assert!(rule.active);
        assert_eq!(rule.description, None);
    }

    #[test]
    fn income_direction_makes_amount_positive() {
        let rule = form(json!({ "amount": -2500, "direction": "income" }))
            .validate(1, date!(2024 - 05 - 10))
            .unwrap();

        assert_eq!(rule.amount, 2500.0);
    }

    #[test]
    fn monthly_rule_first_run_is_clamped_in_start_month() {
        let rule = form(json!({
            "amount": 1200,
            "cadence": "monthly",
            "day_of_month": 31,
            "start_date": "2024-04-15",
        }))
        .validate(1, date!(2024 - 05 - 10))
        .unwrap();

        assert_eq!(rule.next_run_date, date!(2024 - 04 - 30));
        assert_eq!(rule.day_of_month, Some(DayOfMonth::new(31).unwrap()));
    }

    #[test]
    fn weekly_rule_drops_day_of_month() {
        let rule = form(json!({
            "amount": 30,
            "cadence": "weekly",
            "day_of_month": 12,
            "weekday": 1,
            "start_date": "2024-03-05",
        }))
        .validate(1, date!(2024 - 03 - 01))
        .unwrap();

        assert_eq!(rule.day_of_month, None);
        assert_eq!(rule.weekday, Some(Weekday::Monday));
        assert_eq!(rule.next_run_date, date!(2024 - 03 - 11));
    }

    #[test]
    fn blank_description_is_dropped() {
        let rule = form(json!({ "amount": 5, "description": "   " }))
            .validate(1, date!(2024 - 03 - 01))
            .unwrap();

        assert_eq!(rule.description, None);
    }

    #[test]
    fn missing_amount_is_rejected() {
        let result = form(json!({ "cadence": "weekly" })).validate(1, date!(2024 - 03 - 01));

        assert_eq!(result, Err(Error::InvalidAmount));
    }

    #[test]
    fn invalid_fields_are_rejected() {
        let today = date!(2024 - 03 - 01);

        assert_eq!(
            form(json!({ "amount": 5, "cadence": "yearly" })).validate(1, today),
            Err(Error::UnsupportedCadence("yearly".to_owned()))
        );
        assert_eq!(
            form(json!({ "amount": 5, "day_of_month": 35 })).validate(1, today),
            Err(Error::InvalidDayOfMonth(35))
        );
        assert_eq!(
            form(json!({ "amount": 5, "cadence": "weekly", "weekday": 7 })).validate(1, today),
            Err(Error::InvalidWeekday(7))
        );
    }
}
