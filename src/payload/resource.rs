//! Smallest semantic unit of a payload

use crate::types::{DEFAULT_ATTRIBUTE, TASK_ID_SEPARATOR, TaskIdValuePair, Value, now_millis};

/// One `(attribute, metadata, value, timestamp)` data point.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadResourceFragment {
    attribute_id: String,
    metadata_id: Option<String>,
    data: Value,
    timestamp: i64,
}

impl PayloadResourceFragment {
    /// Create a resource fragment.
    ///
    /// A missing attribute falls back to [`DEFAULT_ATTRIBUTE`]. A negative
    /// timestamp (see [`USE_WALL_CLOCK`](crate::types::USE_WALL_CLOCK)) is
    /// replaced by the ingestion time.
    pub fn new(
        attribute_id: Option<String>,
        metadata_id: Option<String>,
        data: Value,
        timestamp: i64,
    ) -> Self {
        let timestamp = if timestamp < 0 { now_millis() } else { timestamp };

        Self {
            attribute_id: attribute_id.unwrap_or_else(|| DEFAULT_ATTRIBUTE.to_string()),
            metadata_id,
            data,
            timestamp,
        }
    }

    pub fn attribute_id(&self) -> &str {
        &self.attribute_id
    }

    pub fn metadata_id(&self) -> Option<&str> {
        self.metadata_id.as_deref()
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Milliseconds since the Unix epoch.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Task identifier of this fragment below `parent`.
    pub fn task_identifier(&self, parent: &str) -> String {
        let mut id = String::with_capacity(
            parent.len()
                + self.attribute_id.len()
                + self.metadata_id.as_ref().map_or(0, |m| m.len() + 1)
                + 1,
        );
        id.push_str(parent);
        id.push(TASK_ID_SEPARATOR);
        id.push_str(&self.attribute_id);
        if let Some(metadata) = &self.metadata_id {
            id.push(TASK_ID_SEPARATOR);
            id.push_str(metadata);
        }
        id
    }

    /// Convert into the pair addressed below `parent`.
    pub fn task_id_value_pair(&self, parent: &str) -> TaskIdValuePair {
        TaskIdValuePair::new(self.task_identifier(parent), self.data.clone(), self.timestamp)
    }
}
