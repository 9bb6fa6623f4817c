//! `tracing` events for statements sent to the database.
//!
//! Statements are logged under the `dbdesk.sql` target before they run and
//! again with their timing once the client returns. Gate decisions use the
//! `dbdesk.gate` target.

use std::time::Duration;

use tracing::Level;

use crate::statement::StatementKind;

pub const SQL_TARGET: &str = "dbdesk.sql";
pub const GATE_TARGET: &str = "dbdesk.gate";

/// Emits the SQL that is about to run.
///
/// Writes (UPDATE, DELETE and destructive free-text statements) are always
/// logged at `WARN`, whatever the configured level.
#[derive(Debug, Clone)]
pub struct SqlTracer {
    /// Level for ordinary statements.
    pub level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
    pub enabled: bool,
}

impl Default for SqlTracer {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
            enabled: true,
        }
    }
}

macro_rules! emit_at_level {
    ($level:expr, $($field:tt)*) => {
        match $level {
            Level::ERROR => tracing::error!($($field)*),
            Level::WARN  => tracing::warn!($($field)*),
            Level::INFO  => tracing::info!($($field)*),
            Level::DEBUG => tracing::debug!($($field)*),
            _ => tracing::trace!($($field)*),
        }
    };
}

impl SqlTracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }

    /// Log a statement before it is sent.
    pub fn before(&self, kind: Option<StatementKind>, sql: &str, param_count: usize, destructive: bool) {
        if !self.enabled {
            return;
        }
        let sql = self.truncate_sql(sql);
        let kind = kind.map(StatementKind::as_str).unwrap_or("RAW");
        let level = if destructive { Level::WARN } else { self.level };
        emit_at_level!(
            level,
            target: SQL_TARGET,
            kind,
            param_count,
            destructive,
            sql = %sql,
            "executing statement",
        );
    }

    /// Log the outcome once the client has returned.
    pub fn after(&self, kind: Option<StatementKind>, elapsed: Duration, rows: Option<u64>, ok: bool) {
        if !self.enabled {
            return;
        }
        let kind = kind.map(StatementKind::as_str).unwrap_or("RAW");
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        if ok {
            emit_at_level!(self.level, target: SQL_TARGET, kind, elapsed_ms, rows, "statement finished");
        } else {
            tracing::warn!(target: SQL_TARGET, kind, elapsed_ms, "statement failed");
        }
    }
}

/// Cut `sql` to at most `max_bytes`, backing off to a char boundary.
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        let sql = "SELECT 'héllo'";
        // 'é' spans bytes 9..11
        assert_eq!(truncate_sql_bytes(sql, 10), "SELECT 'h");
        assert_eq!(truncate_sql_bytes(sql, 100), sql);
    }

    #[test]
    fn ordinary_statements_log_at_debug() {
        let tracer = SqlTracer::new();
        assert_eq!(tracer.level, Level::DEBUG);
        assert!(tracer.enabled);
        assert!(!SqlTracer::disabled().enabled);
    }

    #[test]
    fn long_sql_gets_ellipsis() {
        let tracer = SqlTracer::new().max_sql_length(6);
        assert_eq!(tracer.truncate_sql("SELECT * FROM t"), "SELECT...");
        assert_eq!(SqlTracer::new().no_truncate().truncate_sql("SELECT 1"), "SELECT 1");
    }
}
