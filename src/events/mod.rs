//! Outbound notifications: audit trail and pub/sub broadcast.
//!
//! Both are best-effort from the caller's point of view. The service logs
//! failures from these sinks and carries on.

pub mod audit;
pub mod bus;

pub use self::audit::{AuditEntry, AuditLog, AuditSink};
pub use self::bus::{BroadcastBus, EventBus, EventEnvelope};
