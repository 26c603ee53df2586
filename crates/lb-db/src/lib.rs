//! Storage layer for LoopBreak.
//!
//! Persists the three append-only logs using `rusqlite`:
//! - `events`: one row per activity sample
//! - `burnout_log`: one row per burnout assessment
//! - `alert_log`: one row per fired alert
//!
//! # Concurrency
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! Each task opens its own `Database` on the same file. The journal runs in WAL mode,
//! so readers see the last committed state while the sampler appends, and every
//! append is a single transaction: a reader never observes a partially written row.
//!
//! Async callers go through [`DbWorker`], which owns one `Database` on a dedicated
//! thread so that lock waits never stall the runtime.
//!
//! # Schema
//!
//! Column order of each table is a compatibility contract with existing logs.
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 with second resolution
//! (e.g., `2025-01-06T09:30:00Z`), so lexicographic order matches chronological order.
//!
//! ## Malformed Rows
//!
//! Logs may contain rows written by older tools. Rows whose timestamp, number or enum
//! columns do not parse are skipped on read with a warning; they never fail the read.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use lb_core::{
    ActivityStatus, AlertRecord, BurnoutSample, EventRecord, StatusBand, ValidationError,
};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Params, Row, Statement, TransactionBehavior, params};
use thiserror::Error;

mod worker;

pub use worker::DbWorker;

/// How long a connection waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database. The store is unavailable for this call.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// An append would break the non-decreasing timestamp order of the event log.
    #[error("event at {attempted} is older than the last logged event at {last}")]
    OutOfOrder {
        last: DateTime<Utc>,
        attempted: DateTime<Utc>,
    },
    /// A record violated a value invariant and was not written.
    #[error("invalid record: {0}")]
    Invalid(#[from] ValidationError),
    /// A stored row could not be decoded.
    #[error("malformed row {rowid} in {table}: {reason}")]
    MalformedRow {
        table: &'static str,
        rowid: i64,
        reason: String,
    },
    /// The database worker thread could not be started.
    #[error("failed to start database worker: {0}")]
    Spawn(#[source] std::io::Error),
    /// The database worker thread is gone.
    #[error("database worker stopped")]
    WorkerStopped,
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for concurrency considerations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.busy_timeout(BUSY_TIMEOUT)?;
        // In-memory databases answer "memory"; either way the mode is not an error.
        let _mode: String =
            self.conn
                .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        self.conn.execute_batch(
            "
            -- Events table: one row per activity sample
            -- status: 'Active' | 'Idle'
            -- cpu_usage: load percentage in [0, 100]
            -- score: productivity score in [0, 1]
            CREATE TABLE IF NOT EXISTS events (
                timestamp TEXT NOT NULL,
                active_window TEXT NOT NULL,
                status TEXT NOT NULL,
                cpu_usage REAL NOT NULL,
                score REAL NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp);

            -- Burnout log: audit trail of every burnout assessment
            -- productivity_score: mean sample score in [0, 1]
            -- status: 'Low' | 'Medium' | 'High'
            CREATE TABLE IF NOT EXISTS burnout_log (
                timestamp TEXT NOT NULL,
                idle_ratio REAL NOT NULL,
                distraction_ratio REAL NOT NULL,
                switch_rate REAL NOT NULL,
                productivity_score REAL NOT NULL,
                burnout_index REAL NOT NULL,
                status TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_burnout_log_timestamp ON burnout_log(timestamp);

            -- Alert log: fired alerts, read back to enforce per-channel cooldowns
            CREATE TABLE IF NOT EXISTS alert_log (
                timestamp TEXT NOT NULL,
                message TEXT NOT NULL,
                channel TEXT NOT NULL,
                source TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_alert_log_channel ON alert_log(channel, timestamp);
            ",
        )?;
        Ok(())
    }

    /// Appends one sample to the event log.
    ///
    /// Records with the same timestamp as the last logged event are accepted; older
    /// ones are rejected with [`DbError::OutOfOrder`].
    pub fn append_event(&mut self, record: &EventRecord) -> Result<(), DbError> {
        record.validate()?;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let last: Option<String> = tx
            .query_row(
                "SELECT timestamp FROM events ORDER BY rowid DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(last) = last.as_deref().and_then(|ts| parse_timestamp(ts).ok()) {
            if record.timestamp.timestamp() < last.timestamp() {
                return Err(DbError::OutOfOrder {
                    last,
                    attempted: record.timestamp,
                });
            }
        }
        tx.execute(
            "
            INSERT INTO events (timestamp, active_window, status, cpu_usage, score)
            VALUES (?, ?, ?, ?, ?)
            ",
            params![
                format_timestamp(record.timestamp),
                record.window_title,
                record.status.as_str(),
                record.load_pct,
                record.score,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Lists events within a time range, oldest first.
    ///
    /// The range is inclusive of `start` and exclusive of `end`.
    pub fn read_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<EventRecord>, DbError> {
        if end <= start {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "
            SELECT rowid, timestamp, active_window, status, cpu_usage, score
            FROM events
            WHERE timestamp >= ? AND timestamp < ?
            ORDER BY timestamp ASC, rowid ASC
            ",
        )?;
        collect_valid(
            &mut stmt,
            [format_timestamp(start), format_timestamp(end)],
            "events",
            decode_event,
        )
    }

    /// Lists every event in the log, oldest first.
    pub fn all_events(&self) -> Result<Vec<EventRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT rowid, timestamp, active_window, status, cpu_usage, score
            FROM events
            ORDER BY timestamp ASC, rowid ASC
            ",
        )?;
        collect_valid(&mut stmt, [], "events", decode_event)
    }

    /// Number of rows in the event log, malformed ones included.
    pub fn event_count(&self) -> Result<u64, DbError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Timestamp of the most recently appended event.
    pub fn last_event_time(&self) -> Result<Option<DateTime<Utc>>, DbError> {
        let last: Option<String> = self
            .conn
            .query_row(
                "SELECT timestamp FROM events ORDER BY rowid DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(last.as_deref().and_then(|ts| parse_timestamp(ts).ok()))
    }

    /// Truncates the event log. Returns the number of rows removed.
    pub fn reset_events(&mut self) -> Result<usize, DbError> {
        Ok(self.conn.execute("DELETE FROM events", [])?)
    }

    /// Appends one burnout assessment to the audit trail.
    pub fn append_burnout_sample(&mut self, sample: &BurnoutSample) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO burnout_log
            (timestamp, idle_ratio, distraction_ratio, switch_rate, productivity_score, burnout_index, status)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                format_timestamp(sample.timestamp),
                sample.idle_ratio,
                sample.distraction_ratio,
                sample.switch_rate,
                sample.mean_score,
                sample.burnout_index,
                sample.status_band.as_str(),
            ],
        )?;
        Ok(())
    }

    /// Lists burnout assessments at or after `since`, oldest first.
    pub fn burnout_samples_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<BurnoutSample>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT rowid, timestamp, idle_ratio, distraction_ratio, switch_rate,
                   productivity_score, burnout_index, status
            FROM burnout_log
            WHERE timestamp >= ?
            ORDER BY timestamp ASC, rowid ASC
            ",
        )?;
        collect_valid(
            &mut stmt,
            [format_timestamp(since)],
            "burnout_log",
            decode_burnout,
        )
    }

    /// The most recent well-formed burnout assessment.
    pub fn last_burnout_sample(&self) -> Result<Option<BurnoutSample>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT rowid, timestamp, idle_ratio, distraction_ratio, switch_rate,
                   productivity_score, burnout_index, status
            FROM burnout_log
            ORDER BY timestamp DESC, rowid DESC
            LIMIT 20
            ",
        )?;
        Ok(collect_valid(&mut stmt, [], "burnout_log", decode_burnout)?
            .into_iter()
            .next())
    }

    /// Appends a fired alert.
    pub fn append_alert(&mut self, alert: &AlertRecord) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO alert_log (timestamp, message, channel, source) VALUES (?, ?, ?, ?)",
            params![
                format_timestamp(alert.timestamp),
                alert.message,
                alert.channel,
                alert.source,
            ],
        )?;
        Ok(())
    }

    /// Timestamp of the most recent alert fired on `channel`.
    pub fn last_alert_time(&self, channel: &str) -> Result<Option<DateTime<Utc>>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT timestamp FROM alert_log
            WHERE channel = ?
            ORDER BY timestamp DESC, rowid DESC
            ",
        )?;
        let rows = stmt.query_map([channel], |row| row.get::<_, String>(0))?;
        for row in rows {
            let raw = row?;
            match parse_timestamp(&raw) {
                Ok(ts) => return Ok(Some(ts)),
                Err(err) => {
                    tracing::warn!(channel, timestamp = %raw, error = %err, "skipping malformed alert timestamp");
                }
            }
        }
        Ok(None)
    }

    /// Lists the most recent alerts, newest first.
    pub fn recent_alerts(&self, limit: usize) -> Result<Vec<AlertRecord>, DbError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(
            "
            SELECT rowid, timestamp, message, channel, source
            FROM alert_log
            ORDER BY timestamp DESC, rowid DESC
            LIMIT ?
            ",
        )?;
        collect_valid(&mut stmt, [limit], "alert_log", decode_alert)
    }

    /// Truncates all three logs in one transaction.
    pub fn reset_all(&mut self) -> Result<ResetCounts, DbError> {
        let tx = self.conn.transaction()?;
        let counts = ResetCounts {
            events: tx.execute("DELETE FROM events", [])?,
            burnout_samples: tx.execute("DELETE FROM burnout_log", [])?,
            alerts: tx.execute("DELETE FROM alert_log", [])?,
        };
        tx.commit()?;
        Ok(counts)
    }
}

/// Rows removed by [`Database::reset_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetCounts {
    pub events: usize,
    pub burnout_samples: usize,
    pub alerts: usize,
}

/// Runs `stmt`, decoding each row and skipping the ones that do not decode.
///
/// The first selected column must be the `rowid`; it is only used for the warning.
fn collect_valid<T, P: Params>(
    stmt: &mut Statement<'_>,
    params: P,
    table: &'static str,
    decode: fn(&[Value]) -> Result<T, String>,
) -> Result<Vec<T>, DbError> {
    let width = stmt.column_count();
    let rows = stmt.query_map(params, |row| raw_values(row, width))?;
    let mut decoded = Vec::new();
    for row in rows {
        let values = row?;
        let rowid = match values.first() {
            Some(Value::Integer(id)) => *id,
            _ => -1,
        };
        match decode(values.get(1..).unwrap_or_default()) {
            Ok(item) => decoded.push(item),
            Err(reason) => {
                let err = DbError::MalformedRow {
                    table,
                    rowid,
                    reason,
                };
                tracing::warn!(error = %err, "skipping malformed row");
            }
        }
    }
    Ok(decoded)
}

fn raw_values(row: &Row<'_>, width: usize) -> rusqlite::Result<Vec<Value>> {
    (0..width).map(|idx| row.get::<_, Value>(idx)).collect()
}

fn decode_event(values: &[Value]) -> Result<EventRecord, String> {
    let [timestamp, title, status, load, score] = values else {
        return Err(format!("expected 5 columns, got {}", values.len()));
    };
    let record = EventRecord {
        timestamp: text(timestamp, "timestamp")
            .and_then(|ts| parse_timestamp(ts).map_err(|err| format!("timestamp {ts:?}: {err}")))?,
        window_title: text(title, "active_window")?.to_string(),
        status: text(status, "status")?
            .parse::<ActivityStatus>()
            .map_err(|err| err.to_string())?,
        load_pct: number(load, "cpu_usage")?,
        score: number(score, "score")?,
    };
    record.validate().map_err(|err| err.to_string())?;
    Ok(record)
}

fn decode_burnout(values: &[Value]) -> Result<BurnoutSample, String> {
    let [timestamp, idle, distraction, switch, score, index, status] = values else {
        return Err(format!("expected 7 columns, got {}", values.len()));
    };
    let burnout_index = number(index, "burnout_index")?;
    if !(0.0..=100.0).contains(&burnout_index) {
        return Err(format!("burnout_index out of range: {burnout_index}"));
    }
    Ok(BurnoutSample {
        timestamp: text(timestamp, "timestamp")
            .and_then(|ts| parse_timestamp(ts).map_err(|err| format!("timestamp {ts:?}: {err}")))?,
        idle_ratio: number(idle, "idle_ratio")?,
        distraction_ratio: number(distraction, "distraction_ratio")?,
        switch_rate: number(switch, "switch_rate")?,
        mean_score: number(score, "productivity_score")?,
        burnout_index,
        status_band: text(status, "status")?
            .parse::<StatusBand>()
            .map_err(|err| err.to_string())?,
    })
}

fn decode_alert(values: &[Value]) -> Result<AlertRecord, String> {
    let [timestamp, message, channel, source] = values else {
        return Err(format!("expected 4 columns, got {}", values.len()));
    };
    Ok(AlertRecord {
        timestamp: text(timestamp, "timestamp")
            .and_then(|ts| parse_timestamp(ts).map_err(|err| format!("timestamp {ts:?}: {err}")))?,
        message: text(message, "message")?.to_string(),
        channel: text(channel, "channel")?.to_string(),
        source: text(source, "source")?.to_string(),
    })
}

fn text<'a>(value: &'a Value, column: &str) -> Result<&'a str, String> {
    match value {
        Value::Text(s) => Ok(s),
        other => Err(format!("{column} is not text: {other:?}")),
    }
}

#[allow(clippy::cast_precision_loss)]
fn number(value: &Value, column: &str) -> Result<f64, String> {
    let parsed = match value {
        Value::Real(f) => Some(*f),
        Value::Integer(i) => Some(*i as f64),
        Value::Text(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|f| f.is_finite())
        .ok_or_else(|| format!("{column} is not a number: {value:?}"))
}

fn parse_timestamp(timestamp: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(timestamp).map(|parsed| parsed.with_timezone(&Utc))
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}
