//! Implements a struct that holds the state of the REST server.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use rusqlite::Connection;

use crate::{Error, db::initialize};

/// How long a run of recurring rules may take by default.
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(30);

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,

    /// How long a run of recurring rules may take before the remaining rules are deferred.
    pub run_timeout: Duration,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    /// `local_timezone` should be a valid, canonical timezone name, e.g. "Pacific/Auckland".
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        local_timezone: &str,
        run_timeout: Duration,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            local_timezone: local_timezone.to_owned(),
            run_timeout,
            db_connection: Arc::new(Mutex::new(db_connection)),
        })
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::{AppState, DEFAULT_RUN_TIMEOUT};

    #[test]
    fn new_initializes_database() {
        let state = AppState::new(
            Connection::open_in_memory().unwrap(),
            "Pacific/Auckland",
            DEFAULT_RUN_TIMEOUT,
        )
        .unwrap();

        let connection = state.db_connection.lock().unwrap();
        let table_count: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'recurring_rule'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(table_count, 1);
        assert_eq!(state.local_timezone, "Pacific/Auckland");
        assert_eq!(state.run_timeout, DEFAULT_RUN_TIMEOUT);
    }
}
