//! Bounded ring buffer of normalization/validation failures.
//!
//! The buffer keeps the last [`DIAGNOSTICS_CAPACITY`] failures for operator
//! inspection, evicting oldest-first. It lives in memory only and is never
//! persisted. Access control (the operator bearer-token check before `clear`)
//! is the calling layer's responsibility.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::validate::ValidationError;

/// Fixed capacity of the diagnostics buffer.
pub const DIAGNOSTICS_CAPACITY: usize = 100;

/// A stored note of a single normalization/validation failure.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticRecord {
    /// Assigned by the buffer at push time.
    pub ts: DateTime<Utc>,
    pub provider: String,
    pub item_name: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<Vec<ValidationError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl DiagnosticRecord {
    pub fn new(provider: impl Into<String>, item_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            ts: Utc::now(),
            provider: provider.into(),
            item_name: item_name.into(),
            error: error.into(),
            validation_errors: None,
            raw: None,
        }
    }
}

/// FIFO buffer of the most recent diagnostic records.
///
/// The internal queue is not exposed; mutation goes through
/// [`push`](DiagnosticsBuffer::push) and [`clear`](DiagnosticsBuffer::clear)
/// only, and [`get_all`](DiagnosticsBuffer::get_all) returns a copy.
#[derive(Debug)]
pub struct DiagnosticsBuffer {
    entries: VecDeque<DiagnosticRecord>,
    capacity: usize,
}

impl DiagnosticsBuffer {
    pub fn new() -> Self {
        Self::with_capacity(DIAGNOSTICS_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a record, stamping its timestamp and evicting the oldest entry
    /// when at capacity.
    pub fn push(&mut self, mut entry: DiagnosticRecord) {
        entry.ts = Utc::now();
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Snapshot of all entries, oldest first.
    pub fn get_all(&self) -> Vec<DiagnosticRecord> {
        self.entries.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DiagnosticsBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_eviction_at_capacity() {
        let mut buf = DiagnosticsBuffer::with_capacity(3);
        for i in 0..5 {
            buf.push(DiagnosticRecord::new("gemini", format!("item-{i}"), "boom"));
        }
        let all = buf.get_all();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].item_name, "item-2");
        assert_eq!(all[2].item_name, "item-4");
    }

    #[test]
    fn test_get_all_returns_copy() {
        let mut buf = DiagnosticsBuffer::new();
        buf.push(DiagnosticRecord::new("openai", "Boiler", "boom"));
        let mut snapshot = buf.get_all();
        snapshot.clear();
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut buf = DiagnosticsBuffer::new();
        buf.push(DiagnosticRecord::new("openai", "Boiler", "boom"));
        buf.clear();
        assert!(buf.is_empty());
    }
}
