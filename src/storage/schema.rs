//! Database schema and migrations.

use anyhow::Result;
use rusqlite::Connection;

/// Run all pending migrations.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS healing_attempts (
            id TEXT PRIMARY KEY,
            strategy TEXT NOT NULL,
            dry_run INTEGER NOT NULL,
            applied INTEGER NOT NULL,
            issue_type TEXT NOT NULL,
            root_cause TEXT NOT NULL,
            outcome_json TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_healing_attempts_created ON healing_attempts(created_at);
        CREATE INDEX IF NOT EXISTS idx_healing_attempts_strategy ON healing_attempts(strategy);

        INSERT OR IGNORE INTO schema_version (version) VALUES (1);",
    )?;

    Ok(())
}
