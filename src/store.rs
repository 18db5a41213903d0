use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use tracing::debug;

use crate::util::{ensure_directory, now_utc_string};

pub const DB_SCHEMA_VERSION: &str = "1.0.0";

pub fn open_store(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        ensure_directory(parent)?;
    }

    let connection = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;

    debug!(path = %db_path.display(), "store ready");
    Ok(connection)
}

/// Opens an existing store for lookups without touching its schema or
/// metadata. `None` when the database file does not exist yet.
pub fn open_store_read_only(db_path: &Path) -> Result<Option<Connection>> {
    if !db_path.is_file() {
        debug!(path = %db_path.display(), "store not created yet");
        return Ok(None);
    }

    let connection = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("failed to open {} read-only", db_path.display()))?;
    connection
        .busy_timeout(Duration::from_secs(5))
        .context("failed to set busy timeout")?;
    Ok(Some(connection))
}

pub fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .context("failed to enable foreign_keys")?;
    Ok(())
}

pub fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS lpa_assessments (
              assessment_id INTEGER PRIMARY KEY AUTOINCREMENT,
              entry_id TEXT NOT NULL,
              respondent_name TEXT NOT NULL,
              respondent_email TEXT NOT NULL,
              job_title TEXT NOT NULL,
              company_size TEXT NOT NULL,
              tech_team_size INTEGER NOT NULL DEFAULT 0,
              business_model TEXT NOT NULL,
              tech_complexity TEXT NOT NULL,
              workforce_deployment TEXT NOT NULL,
              created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS lpa_metrics (
              assessment_id INTEGER NOT NULL UNIQUE,
              decision_effectiveness INTEGER NOT NULL,
              team_autonomy INTEGER NOT NULL,
              leadership_success INTEGER NOT NULL,
              ready_leaders INTEGER NOT NULL,
              dependencies INTEGER NOT NULL,
              FOREIGN KEY(assessment_id) REFERENCES lpa_assessments(assessment_id)
            );

            CREATE TABLE IF NOT EXISTS lpa_results (
              assessment_id INTEGER NOT NULL UNIQUE,
              pipeline_health REAL NOT NULL,
              decision_index REAL NOT NULL,
              risk_level REAL NOT NULL,
              growth_capacity REAL NOT NULL,
              leadership_density REAL NOT NULL,
              created_at TEXT NOT NULL,
              FOREIGN KEY(assessment_id) REFERENCES lpa_assessments(assessment_id)
            );

            CREATE TABLE IF NOT EXISTS lpa_recommendations (
              recommendation_id INTEGER PRIMARY KEY AUTOINCREMENT,
              recommendation TEXT NOT NULL,
              impact_description TEXT NOT NULL DEFAULT '',
              implementation_steps TEXT NOT NULL DEFAULT '',
              priority TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS lpa_assessment_recommendations (
              assessment_id INTEGER NOT NULL,
              recommendation_id INTEGER NOT NULL,
              FOREIGN KEY(assessment_id) REFERENCES lpa_assessments(assessment_id),
              FOREIGN KEY(recommendation_id) REFERENCES lpa_recommendations(recommendation_id)
            );
            ",
        )
        .context("failed to create lpa tables")?;

    ensure_column_exists(connection, "lpa_assessments", "source_sha256 TEXT")?;

    connection
        .execute_batch(
            "
            CREATE INDEX IF NOT EXISTS idx_lpa_assessments_entry ON lpa_assessments(entry_id);

            DELETE FROM lpa_assessment_recommendations
            WHERE rowid NOT IN (
              SELECT MIN(rowid)
              FROM lpa_assessment_recommendations
              GROUP BY assessment_id, recommendation_id
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_lpa_assessment_recommendations_pair
              ON lpa_assessment_recommendations(assessment_id, recommendation_id);
            ",
        )
        .context("failed to create lpa indexes")?;

    let now = now_utc_string();
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [DB_SCHEMA_VERSION],
    )?;
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [now],
    )?;

    Ok(())
}

fn ensure_column_exists(
    connection: &Connection,
    table_name: &str,
    column_definition: &str,
) -> Result<()> {
    let Some(column_name) = column_definition.split_whitespace().next() else {
        bail!("invalid column definition: {column_definition}");
    };

    let pragma_sql = format!("PRAGMA table_info({table_name})");
    let mut statement = connection
        .prepare(&pragma_sql)
        .with_context(|| format!("failed to inspect schema for table {table_name}"))?;

    let mut rows = statement.query([])?;
    while let Some(row) = rows.next()? {
        let existing_name: String = row.get(1)?;
        if existing_name == column_name {
            return Ok(());
        }
    }

    let alter_sql = format!("ALTER TABLE {table_name} ADD COLUMN {column_definition}");
    connection
        .execute(&alter_sql, [])
        .with_context(|| format!("failed to add column {column_name} on {table_name}"))?;

    Ok(())
}

pub fn count_rows(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection
        .query_row(sql, [], |row| row.get(0))
        .with_context(|| format!("failed to count rows: {sql}"))?;
    Ok(count)
}

pub fn metadata_value(connection: &Connection, key: &str) -> Result<Option<String>> {
    let value = connection
        .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()
        .with_context(|| format!("failed to read metadata key {key}"))?;
    Ok(value)
}

/// In-memory store with the full schema, for tests.
#[cfg(test)]
pub fn open_test_store() -> Connection {
    let connection = Connection::open_in_memory().expect("in-memory DB should open");
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .expect("foreign keys should enable");
    ensure_schema(&connection).expect("schema should apply");
    connection
}
