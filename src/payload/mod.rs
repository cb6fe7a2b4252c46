//! Payload fragment hierarchy produced by packet readers.
//!
//! A packet is decomposed into:
//!
//! - [`PayloadFragment`]: everything concerning one device (service provider)
//! - [`PayloadServiceFragment`]: data addressed to one `(command, service, resource)` tuple
//! - [`PayloadResourceFragment`]: one `(attribute, metadata, value, timestamp)` point
//!
//! Fragments convert into [`TaskIdValuePair`](crate::TaskIdValuePair)s and
//! support the "treated" protocol: once the task manager resolved a pair, the
//! matching resource fragment is removed so it is never emitted twice.

mod fragment;
mod resource;
mod service;

pub use fragment::PayloadFragment;
pub use resource::PayloadResourceFragment;
pub use service::{PairCollection, PayloadServiceFragment};
