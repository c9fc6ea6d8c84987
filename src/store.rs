//! SQLite persistence for delay measurements.
//!
//! Every public operation opens its own connection, runs inside one
//! transaction and closes the connection again. Nothing is held open across a
//! collection run.
//!
//! Scheduled delays live in the narrow `scheduled_delays` relation keyed by
//! `(trip_id, arrival_time, arrival_date)`. Each distinct `arrival_date` there
//! is one logical delay column of the `scheduled_stop_times` table.

use std::collections::BTreeMap;
use std::path::Path;

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Connection, FromRow, SqliteConnection};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::parser::{DelayRecord, DelaySubject};
use crate::schedule::StaticSchedule;
use crate::timestamp::normalize_gtfs_time;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS scheduled_stop_times (
        trip_id       TEXT    NOT NULL,
        arrival_time  TEXT    NOT NULL,
        stop_id       TEXT    NOT NULL,
        stop_sequence INTEGER,
        route_id      TEXT    NOT NULL,
        PRIMARY KEY (trip_id, arrival_time)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS scheduled_delays (
        trip_id      TEXT    NOT NULL,
        arrival_time TEXT    NOT NULL,
        arrival_date TEXT    NOT NULL,
        delay        INTEGER,
        UNIQUE (trip_id, arrival_time, arrival_date)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS unscheduled_stops (
        route_id     TEXT    NOT NULL,
        arrival_date TEXT    NOT NULL,
        arrival_time TEXT    NOT NULL,
        delay        INTEGER
    )
    "#,
];

/// Result of persisting one [`DelayRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The delay was recorded against an existing scheduled stop time.
    Updated,
    /// No scheduled stop time matched `(trip_id, arrival_time)`; nothing written.
    NoMatchingStopTime,
    /// A row was appended to `unscheduled_stops`.
    Appended,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct UnscheduledStop {
    pub route_id: String,
    pub arrival_date: String,
    pub arrival_time: String,
    pub delay: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct DelayStore {
    options: SqliteConnectOptions,
}

impl DelayStore {
    /// The database file is created on first use if it does not exist.
    pub fn new(path: &Path) -> Self {
        Self {
            options: SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true),
        }
    }

    async fn open(&self) -> Result<SqliteConnection, StoreError> {
        Ok(SqliteConnection::connect_with(&self.options).await?)
    }

    /// Creates any missing table. Safe to call on every start.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let mut conn = self.open().await?;
        let mut tx = conn.begin().await.map_err(StoreError::Schema)?;
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(StoreError::Schema)?;
        }
        tx.commit().await.map_err(StoreError::Schema)?;
        conn.close().await?;
        Ok(())
    }

    /// Copies the static schedule into `scheduled_stop_times` if that table is
    /// still empty. Arrival times are folded onto the 24-hour clock so they
    /// match the normalized times reported by the provider.
    ///
    /// Returns the number of rows inserted.
    #[tracing::instrument(skip_all)]
    pub async fn seed_stop_times(&self, schedule: &StaticSchedule) -> Result<u64, StoreError> {
        let mut conn = self.open().await?;

        let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM scheduled_stop_times")
            .fetch_one(&mut conn)
            .await?;
        if existing > 0 {
            info!(existing, "scheduled_stop_times already populated, moving on");
            conn.close().await?;
            return Ok(0);
        }

        let mut inserted = 0u64;
        let mut unparsable = 0usize;
        let mut tx = conn.begin().await?;
        for st in schedule.stop_times() {
            let Some(arrival_time) = normalize_gtfs_time(&st.arrival_time) else {
                unparsable += 1;
                continue;
            };
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO scheduled_stop_times
                    (trip_id, arrival_time, stop_id, stop_sequence, route_id)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&st.trip_id)
            .bind(&arrival_time)
            .bind(&st.stop_id)
            .bind(st.stop_sequence)
            .bind(&st.route_id)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        conn.close().await?;

        if unparsable > 0 {
            warn!(unparsable, "Skipped stop times with malformed arrival_time");
        }
        info!(inserted, "Seeded scheduled_stop_times");
        Ok(inserted)
    }

    /// Persists one measurement in its own transaction.
    pub async fn write_delay(&self, record: &DelayRecord) -> Result<WriteOutcome, StoreError> {
        let mut conn = self.open().await?;
        let mut tx = conn.begin().await?;

        let outcome = match &record.subject {
            DelaySubject::Scheduled { trip_id } => {
                let (date_seen,): (i64,) = sqlx::query_as(
                    "SELECT EXISTS(SELECT 1 FROM scheduled_delays WHERE arrival_date = ?)",
                )
                .bind(&record.arrival_date)
                .fetch_one(&mut *tx)
                .await?;

                let result = sqlx::query(
                    r#"
                    INSERT INTO scheduled_delays (trip_id, arrival_time, arrival_date, delay)
                    SELECT ?, ?, ?, ?
                    WHERE EXISTS (
                        SELECT 1 FROM scheduled_stop_times
                        WHERE trip_id = ? AND arrival_time = ?
                    )
                    ON CONFLICT (trip_id, arrival_time, arrival_date)
                    DO UPDATE SET delay = excluded.delay
                    "#,
                )
                .bind(trip_id)
                .bind(&record.arrival_time)
                .bind(&record.arrival_date)
                .bind(record.delay_seconds)
                .bind(trip_id)
                .bind(&record.arrival_time)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    debug!(
                        trip_id = %trip_id,
                        arrival_time = %record.arrival_time,
                        "No scheduled stop time matches, delay dropped"
                    );
                    WriteOutcome::NoMatchingStopTime
                } else {
                    if date_seen == 0 {
                        warn!(arrival_date = %record.arrival_date, "New delay column created");
                    }
                    WriteOutcome::Updated
                }
            }
            DelaySubject::Unscheduled { route_id } => {
                sqlx::query(
                    r#"
                    INSERT INTO unscheduled_stops (route_id, arrival_date, arrival_time, delay)
                    VALUES (?, ?, ?, ?)
                    "#,
                )
                .bind(route_id)
                .bind(&record.arrival_date)
                .bind(&record.arrival_time)
                .bind(record.delay_seconds)
                .execute(&mut *tx)
                .await?;
                warn!(route_id = %route_id, "Unscheduled stop added");
                WriteOutcome::Appended
            }
        };

        tx.commit().await?;
        conn.close().await?;
        Ok(outcome)
    }

    /// Logical delay columns: every `arrival_date` observed so far, sorted.
    pub async fn delay_dates(&self) -> Result<Vec<String>, StoreError> {
        let mut conn = self.open().await?;
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT arrival_date FROM scheduled_delays ORDER BY arrival_date")
                .fetch_all(&mut conn)
                .await?;
        conn.close().await?;
        Ok(rows.into_iter().map(|(d,)| d).collect())
    }

    /// Sparse date → delay view of one scheduled stop time.
    pub async fn delays_for(
        &self,
        trip_id: &str,
        arrival_time: &str,
    ) -> Result<BTreeMap<String, i64>, StoreError> {
        let mut conn = self.open().await?;
        let rows: Vec<(String, Option<i64>)> = sqlx::query_as(
            r#"
            SELECT arrival_date, delay FROM scheduled_delays
            WHERE trip_id = ? AND arrival_time = ?
            "#,
        )
        .bind(trip_id)
        .bind(arrival_time)
        .fetch_all(&mut conn)
        .await?;
        conn.close().await?;

        Ok(rows
            .into_iter()
            .filter_map(|(date, delay)| delay.map(|d| (date, d)))
            .collect())
    }

    pub async fn unscheduled_stops(&self) -> Result<Vec<UnscheduledStop>, StoreError> {
        let mut conn = self.open().await?;
        let rows = sqlx::query_as::<_, UnscheduledStop>(
            r#"
            SELECT route_id, arrival_date, arrival_time, delay
            FROM unscheduled_stops
            ORDER BY rowid
            "#,
        )
        .fetch_all(&mut conn)
        .await?;
        conn.close().await?;
        Ok(rows)
    }

    pub async fn stop_time_count(&self) -> Result<i64, StoreError> {
        let mut conn = self.open().await?;
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM scheduled_stop_times")
            .fetch_one(&mut conn)
            .await?;
        conn.close().await?;
        Ok(count)
    }
}
