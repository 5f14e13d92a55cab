//! Database queries for recurring rules.

use rusqlite::{Connection, Row, types::Type};
use time::{Date, OffsetDateTime};

use crate::{
    AccountId, Error,
    category::check_category_account,
    db::extended_code,
    recurring::{
        NewRecurringRule, RecurringRule, RecurringRuleId, RulePatch, RuleStore,
        models::{parse_weekday, weekday_column},
    },
};

/// Create a recurring rule in the database.
///
/// # Errors
/// This function will return a [Error::InvalidCategory] if the category is
/// not one of the rule's account, or an [Error::SqlError] if there is some
/// other SQL error.
pub fn create_recurring_rule(
    rule: NewRecurringRule,
    connection: &Connection,
) -> Result<RecurringRule, Error> {
    check_category_account(rule.account_id, rule.category_id, connection)?;

    connection
        .prepare(
            "INSERT INTO recurring_rule (account_id, category_id, amount, cadence, day_of_month,
                weekday, start_date, next_run_date, active, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             RETURNING id, account_id, category_id, amount, cadence, day_of_month, weekday,
                start_date, next_run_date, active, description, created_at",
        )?
        .query_row(
            (
                rule.account_id,
                rule.category_id,
                rule.amount,
                rule.cadence,
                rule.day_of_month,
                weekday_column(rule.weekday),
                rule.start_date,
                rule.next_run_date,
                rule.active,
                &rule.description,
                OffsetDateTime::now_utc(),
            ),
            map_recurring_rule_row,
        )
        .map_err(|error| match extended_code(&error) {
            Some(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => {
                Error::InvalidCategory(rule.category_id)
            }
            _ => error.into(),
        })
}

/// Retrieve a recurring rule by `rule_id`.
///
/// # Errors
/// This function will return a [Error::NotFound] if the rule does not exist.
pub fn get_recurring_rule(
    rule_id: RecurringRuleId,
    connection: &Connection,
) -> Result<RecurringRule, Error> {
    let rule = connection
        .prepare(
            "SELECT id, account_id, category_id, amount, cadence, day_of_month, weekday,
                start_date, next_run_date, active, description, created_at
             FROM recurring_rule WHERE id = :id",
        )?
        .query_one(&[(":id", &rule_id)], map_recurring_rule_row)?;

    Ok(rule)
}

/// Retrieve all recurring rules of an account, newest first.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn list_recurring_rules(
    account_id: AccountId,
    connection: &Connection,
) -> Result<Vec<RecurringRule>, Error> {
    connection
        .prepare(
            "SELECT id, account_id, category_id, amount, cadence, day_of_month, weekday,
                start_date, next_run_date, active, description, created_at
             FROM recurring_rule WHERE account_id = :account_id
             ORDER BY id DESC",
        )?
        .query_map(&[(":account_id", &account_id)], map_recurring_rule_row)?
        .map(|maybe_rule| maybe_rule.map_err(|error| error.into()))
        .collect()
}

/// Retrieve the active rules of an account that are due on or before `as_of`.
///
/// Rules are ordered by their next run date, ties are broken by ID.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn list_due_recurring_rules(
    account_id: AccountId,
    as_of: Date,
    connection: &Connection,
) -> Result<Vec<RecurringRule>, Error> {
    connection
        .prepare(
            "SELECT id, account_id, category_id, amount, cadence, day_of_month, weekday,
                start_date, next_run_date, active, description, created_at
             FROM recurring_rule
             WHERE account_id = ?1 AND active = 1 AND next_run_date <= ?2
             ORDER BY next_run_date ASC, id ASC",
        )?
        .query_map((account_id, as_of), map_recurring_rule_row)?
        .map(|maybe_rule| maybe_rule.map_err(|error| error.into()))
        .collect()
}

/// Move the next run date of a rule, but only if it is still `expected_current`.
///
/// # Errors
/// This function will return a [Error::CursorConflict] if the rule does not
/// exist or its next run date has changed.
pub fn advance_next_run_date(
    rule_id: RecurringRuleId,
    expected_current: Date,
    new_date: Date,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE recurring_rule SET next_run_date = ?1 WHERE id = ?2 AND next_run_date = ?3",
        (new_date, rule_id, expected_current),
    )?;

    if rows_affected == 0 {
        return Err(Error::CursorConflict(rule_id));
    }

    Ok(())
}

/// Apply `patch` to a rule and store the result.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingRule] if the rule does not exist,
/// - or [Error::InvalidCategory] if the new category is not one of the rule's account,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_recurring_rule(
    rule_id: RecurringRuleId,
    patch: &RulePatch,
    connection: &Connection,
) -> Result<RecurringRule, Error> {
    let transaction = connection.unchecked_transaction()?;

    let mut rule = match get_recurring_rule(rule_id, &transaction) {
        Ok(rule) => rule,
        Err(Error::NotFound) => return Err(Error::UpdateMissingRule),
        Err(error) => return Err(error),
    };
    patch.apply_to(&mut rule);

    if patch.category_id.is_some() {
        check_category_account(rule.account_id, rule.category_id, &transaction)?;
    }

    let updated = transaction
        .prepare(
            "UPDATE recurring_rule
             SET category_id = ?1, amount = ?2, cadence = ?3, day_of_month = ?4, weekday = ?5,
                start_date = ?6, next_run_date = ?7, active = ?8, description = ?9
             WHERE id = ?10
             RETURNING id, account_id, category_id, amount, cadence, day_of_month, weekday,
                start_date, next_run_date, active, description, created_at",
        )?
        .query_row(
            (
                rule.category_id,
                rule.amount,
                rule.cadence,
                rule.day_of_month,
                weekday_column(rule.weekday),
                rule.start_date,
                rule.next_run_date,
                rule.active,
                &rule.description,
                rule_id,
            ),
            map_recurring_rule_row,
        )
        .map_err(|error| match extended_code(&error) {
            Some(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => {
                Error::InvalidCategory(rule.category_id)
            }
            _ => error.into(),
        })?;

    transaction.commit()?;

    Ok(updated)
}

/// Delete a recurring rule.
///
/// Ledger entries the rule already posted are kept.
///
/// # Errors
/// This function will return a [Error::DeleteMissingRule] if the rule does not exist.
pub fn delete_recurring_rule(
    rule_id: RecurringRuleId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected =
        connection.execute("DELETE FROM recurring_rule WHERE id = ?1", [rule_id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingRule);
    }

    Ok(())
}

/// Create the recurring rule table in the database.
pub fn create_recurring_rule_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS recurring_rule (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL,
                category_id INTEGER,
                amount REAL NOT NULL,
                cadence TEXT NOT NULL CHECK (cadence IN ('monthly', 'weekly', 'biweekly', 'custom')),
                day_of_month INTEGER CHECK (day_of_month BETWEEN 1 AND 31),
                weekday INTEGER CHECK (weekday BETWEEN 0 AND 6),
                start_date TEXT NOT NULL,
                next_run_date TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1,
                description TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE SET NULL
            );",
        (),
    )?;

    // Covers the due rule query.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_recurring_rule_due
         ON recurring_rule(account_id, active, next_run_date)",
        (),
    )?;

    Ok(())
}

fn map_recurring_rule_row(row: &Row) -> Result<RecurringRule, rusqlite::Error> {
    let weekday = row
        .get::<_, Option<i64>>(6)?
        .map(parse_weekday)
        .transpose()
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(6, Type::Integer, Box::new(error)))?;

    Ok(RecurringRule {
        id: row.get(0)?,
        account_id: row.get(1)?,
        category_id: row.get(2)?,
        amount: row.get(3)?,
        cadence: row.get(4)?,
        day_of_month: row.get(5)?,
        weekday,
        start_date: row.get(7)?,
        next_run_date: row.get(8)?,
        active: row.get(9)?,
        description: row.get(10)?,
        created_at: row.get(11)?,
    })
}

/// A [RuleStore] backed by the SQLite `recurring_rule` table.
#[derive(Debug, Clone, Copy)]
pub struct SQLiteRuleStore<'a> {
    connection: &'a Connection,
}

impl<'a> SQLiteRuleStore<'a> {
    /// Create a store that reads and writes through `connection`.
    pub fn new(connection: &'a Connection) -> Self {
        Self { connection }
    }
}

impl RuleStore for SQLiteRuleStore<'_> {
    fn list_due_rules(
        &self,
        account_id: AccountId,
        as_of: Date,
    ) -> Result<Vec<RecurringRule>, Error> {
        list_due_recurring_rules(account_id, as_of, self.connection)
    }

    fn update_next_run_date(
        &self,
        rule_id: RecurringRuleId,
        expected_current: Date,
        new_date: Date,
    ) -> Result<(), Error> {
        advance_next_run_date(rule_id, expected_current, new_date, self.connection)
    }

    fn create_rule(&self, rule: NewRecurringRule) -> Result<RecurringRule, Error> {
        create_recurring_rule(rule, self.connection)
    }

    fn update_rule(
        &self,
        rule_id: RecurringRuleId,
        patch: &RulePatch,
    ) -> Result<RecurringRule, Error> {
        update_recurring_rule(rule_id, patch, self.connection)
    }

    fn delete_rule(&self, rule_id: RecurringRuleId) -> Result<(), Error> {
        delete_recurring_rule(rule_id, self.connection)
    }

    fn get_rule(&self, rule_id: RecurringRuleId) -> Result<RecurringRule, Error> {
        get_recurring_rule(rule_id, self.connection)
    }

    fn list_rules(&self, account_id: AccountId) -> Result<Vec<RecurringRule>, Error> {
        list_recurring_rules(account_id, self.connection)
    }
}


#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use time::{Weekday, macros::date};

    use crate::{
        Error,
        account::{create_named_test_account, create_test_account},
        category::create_test_category,
        db::initialize,
        recurring::{Cadence, RulePatch},
    };

    use super::{
        advance_next_run_date, create_recurring_rule, delete_recurring_rule, get_recurring_rule,
        list_due_recurring_rules, list_recurring_rules,
        test_rules::{monthly_rule, weekly_rule},
        update_recurring_rule,
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        create_test_account(&conn);
        conn
    }

    #[test]
    fn create_then_get() {
        let conn = get_test_connection();

        let created = create_recurring_rule(
            weekly_rule(Weekday::Monday, date!(2024 - 03 - 04)),
            &conn,
        )
        .unwrap();
        let fetched = get_recurring_rule(created.id, &conn).unwrap();

        assert_eq!(created, fetched);
        assert_eq!(fetched.weekday, Some(Weekday::Monday));
        assert_eq!(fetched.cadence, Cadence::Weekly);
    }

    #[test]
    fn create_fails_on_invalid_category() {
        let conn = get_test_connection();
        let mut rule = monthly_rule(1, date!(2024 - 01 - 01), date!(2024 - 01 - 01));
        rule.category_id = Some(99);

        let result = create_recurring_rule(rule, &conn);

        assert_eq!(result, Err(Error::InvalidCategory(Some(99))));
    }

    #[test]
    fn create_fails_on_category_of_other_account() {
        let conn = get_test_connection();
        let savings = create_named_test_account("Savings", &conn);
        let foreign = create_test_category(savings.id, "Foreign", &conn);
        let mut rule = weekly_rule(Weekday::Monday, date!(2024 - 03 - 04));
        rule.category_id = Some(foreign.id);

        let result = create_recurring_rule(rule, &conn);

        assert_eq!(result, Err(Error::InvalidCategory(Some(foreign.id))));
        assert!(list_recurring_rules(1, &conn).unwrap().is_empty());
    }

    #[test]
    fn due_rules_are_filtered_and_ordered() {
        let conn = get_test_connection();
        let later = create_recurring_rule(
            monthly_rule(20, date!(2024 - 01 - 01), date!(2024 - 01 - 20)),
            &conn,
        )
        .unwrap();
        let earlier = create_recurring_rule(
            monthly_rule(5, date!(2024 - 01 - 01), date!(2024 - 01 - 05)),
            &conn,
        )
        .unwrap();
        let mut inactive = monthly_rule(1, date!(2024 - 01 - 01), date!(2024 - 01 - 01));
        inactive.active = false;
        create_recurring_rule(inactive, &conn).unwrap();
        create_recurring_rule(
            monthly_rule(25, date!(2024 - 01 - 01), date!(2024 - 01 - 25)),
            &conn,
        )
        .unwrap();

        let due = list_due_recurring_rules(1, date!(2024 - 01 - 20), &conn).unwrap();

        let ids: Vec<i64> = due.iter().map(|rule| rule.id).collect();
        assert_eq!(ids, [earlier.id, later.id]);
    }

    #[test]
    fn due_rules_with_same_date_are_ordered_by_id() {
        let conn = get_test_connection();
        let first = create_recurring_rule(
            weekly_rule(Weekday::Monday, date!(2024 - 03 - 04)),
            &conn,
        )
        .unwrap();
        let second = create_recurring_rule(
            weekly_rule(Weekday::Monday, date!(2024 - 03 - 04)),
            &conn,
        )
        .unwrap();

        let due = list_due_recurring_rules(1, date!(2024 - 03 - 04), &conn).unwrap();

        assert_eq!(due[0].id, first.id);
        assert_eq!(due[1].id, second.id);
    }

    #[test]
    fn advance_checks_expected_date() {
        let conn = get_test_connection();
        let rule = create_recurring_rule(
            weekly_rule(Weekday::Monday, date!(2024 - 03 - 04)),
            &conn,
        )
        .unwrap();

        advance_next_run_date(rule.id, date!(2024 - 03 - 04), date!(2024 - 03 - 11), &conn)
            .unwrap();
        let stale =
            advance_next_run_date(rule.id, date!(2024 - 03 - 04), date!(2024 - 03 - 11), &conn);

        assert_eq!(stale, Err(Error::CursorConflict(rule.id)));
        assert_eq!(
            get_recurring_rule(rule.id, &conn).unwrap().next_run_date,
            date!(2024 - 03 - 11)
        );
    }

    #[test]
    fn advance_missing_rule_is_conflict() {
        let conn = get_test_connection();

        let result =
            advance_next_run_date(8, date!(2024 - 03 - 04), date!(2024 - 03 - 11), &conn);

        assert_eq!(result, Err(Error::CursorConflict(8)));
    }

    #[test]
    fn update_applies_patch() {
        let conn = get_test_connection();
        let category = create_test_category(1, "Housing", &conn);
        let rule = create_recurring_rule(
            monthly_rule(15, date!(2024 - 01 - 15), date!(2024 - 01 - 15)),
            &conn,
        )
        .unwrap();
        let patch = RulePatch {
            category_id: Some(Some(category.id)),
            amount: Some(-1300.0),
            description: Some(None),
            ..Default::default()
        };

        let updated = update_recurring_rule(rule.id, &patch, &conn).unwrap();

        assert_eq!(updated.category_id, Some(category.id));
        assert_eq!(updated.amount, -1300.0);
        assert_eq!(updated.description, None);
        assert_eq!(updated.next_run_date, rule.next_run_date);
        assert_eq!(get_recurring_rule(rule.id, &conn), Ok(updated));
    }

    #[test]
    fn update_missing_rule() {
        let conn = get_test_connection();

        let result = update_recurring_rule(3, &RulePatch::default(), &conn);

        assert_eq!(result, Err(Error::UpdateMissingRule));
    }

    #[test]
    fn update_with_invalid_category_leaves_rule_unchanged() {
        let conn = get_test_connection();
        let rule = create_recurring_rule(
            monthly_rule(15, date!(2024 - 01 - 15), date!(2024 - 01 - 15)),
            &conn,
        )
        .unwrap();
        let patch = RulePatch {
            category_id: Some(Some(404)),
            amount: Some(-1.0),
            ..Default::default()
        };

        let result = update_recurring_rule(rule.id, &patch, &conn);

        assert_eq!(result, Err(Error::InvalidCategory(Some(404))));
        assert_eq!(get_recurring_rule(rule.id, &conn), Ok(rule));
    }

    #[test]
    fn update_with_category_of_other_account_leaves_rule_unchanged() {
        let conn = get_test_connection();
        let savings = create_named_test_account("Savings", &conn);
        let foreign = create_test_category(savings.id, "Foreign", &conn);
        let rule = create_recurring_rule(
            weekly_rule(Weekday::Monday, date!(2024 - 03 - 04)),
            &conn,
        )
        .unwrap();
        let patch = RulePatch {
            category_id: Some(Some(foreign.id)),
            ..Default::default()
        };

        let result = update_recurring_rule(rule.id, &patch, &conn);

        assert_eq!(result, Err(Error::InvalidCategory(Some(foreign.id))));
        assert_eq!(get_recurring_rule(rule.id, &conn), Ok(rule));
    }

    #[test]
    fn delete_rule() {
        let conn = get_test_connection();
        let rule = create_recurring_rule(
            weekly_rule(Weekday::Friday, date!(2024 - 03 - 08)),
            &conn,
        )
        .unwrap();

        delete_recurring_rule(rule.id, &conn).unwrap();

        assert_eq!(list_recurring_rules(1, &conn), Ok(vec![]));
        assert_eq!(delete_recurring_rule(rule.id, &conn), Err(Error::DeleteMissingRule));
    }

    #[test]
    fn list_is_newest_first() {
        let conn = get_test_connection();
        let first = create_recurring_rule(
            weekly_rule(Weekday::Friday, date!(2024 - 03 - 08)),
            &conn,
        )
        .unwrap();
        let second = create_recurring_rule(
            weekly_rule(Weekday::Friday, date!(2024 - 03 - 08)),
            &conn,
        )
        .unwrap();

        let rules = list_recurring_rules(1, &conn).unwrap();

        assert_eq!(rules, vec![second, first]);
    }
}
