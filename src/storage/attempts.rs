//! Append-only record of every `heal` invocation that reached execution.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::IssueType;
use crate::storage::Pool;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealingAttempt {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub strategy: String,
    pub dry_run: bool,
    pub applied: bool,
    pub issue_type: IssueType,
    pub root_cause: String,
    /// The serialized execution outcome.
    pub outcome: serde_json::Value,
}

/// Durable sink for healing attempts.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn create_healing_attempt(&self, attempt: &HealingAttempt) -> Result<()>;

    /// Most recent attempts first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<HealingAttempt>>;
}

#[derive(Clone)]
pub struct SqliteAttemptStore {
    pool: Pool,
}

impl SqliteAttemptStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttemptStore for SqliteAttemptStore {
    async fn create_healing_attempt(&self, attempt: &HealingAttempt) -> Result<()> {
        let pool = self.pool.clone();
        let attempt = attempt.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = pool.get()?;
            let outcome_json = serde_json::to_string(&attempt.outcome)?;
            conn.execute(
                "INSERT INTO healing_attempts
                    (id, strategy, dry_run, applied, issue_type, root_cause, outcome_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    attempt.id.to_string(),
                    attempt.strategy,
                    attempt.dry_run,
                    attempt.applied,
                    attempt.issue_type.to_string(),
                    attempt.root_cause,
                    outcome_json,
                    attempt.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
                ],
            )
            .context("Failed to insert healing attempt")?;
            Ok(())
        })
        .await?
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<HealingAttempt>> {
        let pool = self.pool.clone();
        // A negative LIMIT means "no limit" to SQLite.
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        tokio::task::spawn_blocking(move || -> Result<Vec<HealingAttempt>> {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(
                "SELECT id, strategy, dry_run, applied, issue_type, root_cause, outcome_json, created_at
                 FROM healing_attempts ORDER BY created_at DESC, rowid DESC LIMIT ?1",
            )?;

            let rows = stmt.query_map(params![limit], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                ))
            })?;

            let mut attempts = Vec::new();
            for r in rows {
                let (id, strategy, dry_run, applied, issue_type, root_cause, outcome_json, created_at) = r?;
                attempts.push(HealingAttempt {
                    id: Uuid::parse_str(&id).with_context(|| format!("bad attempt id '{id}'"))?,
                    created_at: DateTime::parse_from_rfc3339(&created_at)
                        .with_context(|| format!("bad timestamp on attempt {id}"))?
                        .with_timezone(&Utc),
                    strategy,
                    dry_run,
                    applied,
                    issue_type: issue_type.parse().map_err(anyhow::Error::msg)?,
                    root_cause,
                    outcome: serde_json::from_str(&outcome_json)?,
                });
            }
            Ok(attempts)
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::open_pool;

    fn attempt(strategy: &str, applied: bool, created_at: DateTime<Utc>) -> HealingAttempt {
        HealingAttempt {
            id: Uuid::new_v4(),
            created_at,
            strategy: strategy.to_string(),
            dry_run: !applied,
            applied,
            issue_type: IssueType::Degradation,
            root_cause: "elevated error rate under resource pressure".to_string(),
            outcome: serde_json::json!({"applied": applied}),
        }
    }

    #[tokio::test]
    async fn test_create_and_list_newest_first() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let db_path = dir.path().join("attempts.db");
        let pool = open_pool(db_path.to_str().unwrap())?;
        let store = SqliteAttemptStore::new(pool);

        let t0 = Utc::now();
        let older = attempt("scale_service", true, t0 - chrono::Duration::seconds(30));
        let newer = attempt("restart_unhealthy", false, t0);

        store.create_healing_attempt(&older).await?;
        store.create_healing_attempt(&newer).await?;

        let listed = store.list_recent(10).await?;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newer.id);
        assert_eq!(listed[0].strategy, "restart_unhealthy");
        assert!(listed[0].dry_run);
        assert!(!listed[0].applied);
        assert_eq!(listed[1].id, older.id);
        assert_eq!(listed[1].issue_type, IssueType::Degradation);
        assert_eq!(listed[1].outcome, serde_json::json!({"applied": true}));

        assert_eq!(store.list_recent(1).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_huge_limit_is_clamped_not_wrapped() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let db_path = dir.path().join("attempts.db");
        let store = SqliteAttemptStore::new(open_pool(db_path.to_str().unwrap())?);

        for _ in 0..3 {
            store.create_healing_attempt(&attempt("purge_stuck", true, Utc::now())).await?;
        }

        assert_eq!(store.list_recent(usize::MAX).await?.len(), 3);
        assert!(store.list_recent(0).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let db_path = dir.path().join("nested/dir/attempts.db");
        let store = SqliteAttemptStore::new(open_pool(db_path.to_str().unwrap())?);

        let a = attempt("scale_service", true, Utc::now());
        store.create_healing_attempt(&a).await?;
        assert!(store.create_healing_attempt(&a).await.is_err());
        Ok(())
    }
}
