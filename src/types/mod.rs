//! Core types shared by every stage of the pipeline.
//!
//! ## Architecture
//!
//! - [`CommandType`] is the closed set of commands a structural unit can carry
//! - [`Value`] is the opaque payload value moved from packets to tasks
//! - [`TaskIdValuePair`] is the output unit consumed by the task manager
//!
//! Task identifiers are slash-separated paths built from
//! provider, command, service, resource, attribute and metadata segments
//! (absent segments are omitted).

mod command;
mod task;
mod value;

pub use command::CommandType;
pub use task::TaskIdValuePair;
pub use value::Value;

use std::time::{SystemTime, UNIX_EPOCH};

/// Separator between task identifier segments.
pub const TASK_ID_SEPARATOR: char = '/';

/// Attribute used when a unit carries data without naming an attribute.
pub const DEFAULT_ATTRIBUTE: &str = "value";

/// Timestamp marker meaning "stamp with the ingestion wall clock".
pub const USE_WALL_CLOCK: i64 = -1;

/// Current wall clock in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}

/// Joins the present segments with [`TASK_ID_SEPARATOR`].
pub(crate) fn join_segments<'a, I>(segments: I) -> String
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut joined = String::new();
    for segment in segments.into_iter().flatten() {
        if !joined.is_empty() {
            joined.push(TASK_ID_SEPARATOR);
        }
        joined.push_str(segment);
    }
    joined
}
