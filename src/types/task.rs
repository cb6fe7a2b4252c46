//! Pipeline output unit

use serde::{Deserialize, Serialize};

use super::Value;

/// Immutable update addressed to one task of the digital twin.
///
/// The task identifier is the slash-separated path resolved by the external
/// task manager, e.g. `lamp-1/SET/light/state/value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskIdValuePair {
    task_identifier: String,
    value: Value,
    timestamp: i64,
}

impl TaskIdValuePair {
    /// Create a new pair.
    pub fn new(task_identifier: impl Into<String>, value: Value, timestamp: i64) -> Self {
        Self { task_identifier: task_identifier.into(), value, timestamp }
    }

    /// Fully qualified task identifier.
    pub fn task_identifier(&self) -> &str {
        &self.task_identifier
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Milliseconds since the Unix epoch.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Consume the pair, returning its parts.
    pub fn into_parts(self) -> (String, Value, i64) {
        (self.task_identifier, self.value, self.timestamp)
    }
}
