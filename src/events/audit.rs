//! Structured audit logging.
//!
//! Every analyze/heal call is appended as a single JSON line to an audit
//! log file. Writes are serialized through a `tokio::sync::Mutex` and the
//! file is opened in append mode.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

/// Destination for audit events.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record_event(
        &self,
        event: &str,
        payload: &serde_json::Value,
        actor: Option<&str>,
    ) -> Result<()>;
}

/// A single audit log record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// ISO 8601 timestamp of the event.
    pub timestamp: String,
    /// Dotted event name, e.g. `self_healing.heal`.
    pub event: String,
    /// Identity that triggered the event, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    pub payload: serde_json::Value,
}

impl AuditEntry {
    pub fn new(event: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            event: event.into(),
            actor: None,
            payload,
        }
    }

    /// Builder-style setter for `actor`.
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }
}

/// Append-only audit log backed by a JSON-lines file.
pub struct AuditLog {
    path: PathBuf,
    writer: Mutex<tokio::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file at `path` in append mode.
    pub async fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create audit log directory: {}", parent.display()))?;
        }

        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("failed to open audit log: {}", path.display()))?;

        debug!(path = %path.display(), "audit log opened");

        Ok(Self {
            path,
            writer: Mutex::new(file),
        })
    }

    /// Append a single audit entry as a JSON line.
    pub async fn log(&self, entry: AuditEntry) -> Result<()> {
        let mut line = serde_json::to_string(&entry).context("failed to serialize audit entry")?;
        line.push('\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(line.as_bytes())
            .await
            .with_context(|| format!("failed to write to audit log: {}", self.path.display()))?;
        writer
            .flush()
            .await
            .with_context(|| format!("failed to flush audit log: {}", self.path.display()))?;

        Ok(())
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl AuditSink for AuditLog {
    async fn record_event(
        &self,
        event: &str,
        payload: &serde_json::Value,
        actor: Option<&str>,
    ) -> Result<()> {
        let mut entry = AuditEntry::new(event, payload.clone());
        if let Some(actor) = actor {
            entry = entry.with_actor(actor);
        }
        self.log(entry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_and_read_audit_entries() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("audit.jsonl");
        let log = AuditLog::new(path.clone()).await.unwrap();

        log.record_event(
            "self_healing.analyze",
            &serde_json::json!({"anomalies": []}),
            Some("ops-bot"),
        )
        .await
        .unwrap();
        log.record_event("self_healing.heal", &serde_json::json!({"strategy": "scale_service"}), None)
            .await
            .unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = content.trim().split('\n').collect();
        assert_eq!(lines.len(), 2, "expected 2 JSON lines");

        let first: AuditEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.event, "self_healing.analyze");
        assert_eq!(first.actor.as_deref(), Some("ops-bot"));

        let second: AuditEntry = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.event, "self_healing.heal");
        assert!(second.actor.is_none());
        assert_eq!(second.payload["strategy"], "scale_service");
        assert!(!lines[1].contains("\"actor\""));
    }

    #[tokio::test]
    async fn test_audit_log_creates_parent_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("deep/nested/dir/audit.jsonl");

        let log = AuditLog::new(path.clone()).await.unwrap();
        log.log(AuditEntry::new("self_healing.analyze", serde_json::json!({})))
            .await
            .unwrap();

        assert!(path.exists());
        assert_eq!(log.path(), &path);
    }

    #[tokio::test]
    async fn test_append_mode_preserves_existing() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("audit.jsonl");

        {
            let log = AuditLog::new(path.clone()).await.unwrap();
            log.log(AuditEntry::new("first", serde_json::json!(1))).await.unwrap();
        }
        {
            let log = AuditLog::new(path.clone()).await.unwrap();
            log.log(AuditEntry::new("second", serde_json::json!(2))).await.unwrap();
        }

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = content.trim().split('\n').collect();
        assert_eq!(lines.len(), 2, "both entries should be preserved");
    }
}
