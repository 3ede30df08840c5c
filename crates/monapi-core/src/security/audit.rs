//! Audit records for mutations.
//!
//! Every successful create, update and delete hands one [`AuditRecord`] to the
//! configured [`AuditSink`] before the transaction commits. A sink error aborts
//! the mutation.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use monapi_proto::{Id, Row};
use parking_lot::Mutex;
use serde::Serialize;

/// Kind of audited change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Add,
    Update,
    Delete,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditAction::Add => write!(f, "add"),
            AuditAction::Update => write!(f, "update"),
            AuditAction::Delete => write!(f, "delete"),
        }
    }
}

/// One audited mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    /// Change kind.
    pub action: AuditAction,
    /// Entity name, e.g. `proxy`.
    pub resource: String,
    /// Acting user.
    pub user_id: Id,
    /// Time the record was created.
    pub recorded_at: DateTime<Utc>,
    /// Affected ids.
    pub ids: Vec<Id>,
    /// Stored rows before the change (empty for `Add`).
    pub before: Vec<Row>,
    /// Rows after the change (empty for `Delete`).
    pub after: Vec<Row>,
}

impl AuditRecord {
    /// Create a record stamped with the current time.
    pub fn new(action: AuditAction, resource: impl Into<String>, user_id: Id) -> Self {
        Self {
            action,
            resource: resource.into(),
            user_id,
            recorded_at: Utc::now(),
            ids: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    /// Set affected ids.
    pub fn with_ids(mut self, ids: Vec<Id>) -> Self {
        self.ids = ids;
        self
    }

    /// Set the rows before the change.
    pub fn with_before(mut self, rows: Vec<Row>) -> Self {
        self.before = rows;
        self
    }

    /// Set the rows after the change.
    pub fn with_after(mut self, rows: Vec<Row>) -> Self {
        self.after = rows;
        self
    }

    /// One-line summary.
    pub fn to_log_line(&self) -> String {
        let ids: Vec<String> = self.ids.iter().map(Id::to_string).collect();
        format!(
            "{} user={} {} {} ids=[{}]",
            self.recorded_at.to_rfc3339(),
            self.user_id,
            self.action,
            self.resource,
            ids.join(",")
        )
    }
}

/// Destination for audit records.
pub trait AuditSink: Send + Sync {
    /// Record a mutation. An error rolls the mutation back.
    fn record(&self, record: &AuditRecord) -> Result<()>;
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
    fail: Mutex<bool>,
}

impl MemoryAuditSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `record` calls fail.
    pub fn fail_next(&self, fail: bool) {
        *self.fail.lock() = fail;
    }

    /// Recorded entries.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Check if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, record: &AuditRecord) -> Result<()> {
        if *self.fail.lock() {
            return Err(Error::internal("audit sink unavailable"));
        }
        self.records.lock().push(record.clone());
        Ok(())
    }
}

/// Emits records as `tracing` events on the `monapi::audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: &AuditRecord) -> Result<()> {
        tracing::info!(
            target: "monapi::audit",
            action = %record.action,
            resource = %record.resource,
            user_id = record.user_id,
            ids = ?record.ids,
            "{}",
            record.to_log_line()
        );
        Ok(())
    }
}

/// Discards records.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _record: &AuditRecord) -> Result<()> {
        Ok(())
    }
}
