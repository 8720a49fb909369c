//! Append-only record of boundary resolutions and split construction attempts.
//!
//! One `AuditLog` belongs to one dataset-preparation call. The resolver, the
//! embargo builder and the splitters only ever append to it; nothing reads it
//! back to make a decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, SliceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOperation {
    ResolveBoundary,
    BuildSplit,
    RejectSplit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub operation: AuditOperation,
    /// `None` when the attempt succeeded.
    pub failure: Option<ErrorKind>,
    pub input_summary: String,
    pub output_summary: String,
    pub recorded_at: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn success(
        operation: AuditOperation,
        input_summary: impl Into<String>,
        output_summary: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            failure: None,
            input_summary: input_summary.into(),
            output_summary: output_summary.into(),
            recorded_at: Utc::now(),
        }
    }

    pub fn failure(operation: AuditOperation, input_summary: impl Into<String>, error: &SliceError) -> Self {
        Self {
            operation,
            failure: Some(error.kind()),
            input_summary: input_summary.into(),
            output_summary: error.to_string(),
            recorded_at: Utc::now(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditLog {
    entries: Vec<AuditLogEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: AuditLogEntry) {
        self.entries.push(entry);
    }

    /// Record a split attempt that failed before any boundary was resolved and
    /// hand the error back for propagation.
    pub fn record_rejection(&mut self, input_summary: impl Into<String>, error: SliceError) -> SliceError {
        self.record(AuditLogEntry::failure(AuditOperation::RejectSplit, input_summary, &error));
        error
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[AuditLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn with_operation(&self, operation: AuditOperation) -> impl Iterator<Item = &AuditLogEntry> {
        self.entries.iter().filter(move |e| e.operation == operation)
    }

    pub fn rejected(&self) -> impl Iterator<Item = &AuditLogEntry> {
        self.with_operation(AuditOperation::RejectSplit)
    }

    pub fn into_entries(self) -> Vec<AuditLogEntry> {
        self.entries
    }
}
