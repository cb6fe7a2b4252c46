//! Protocol-agnostic southbound packet pipeline for IoT gateways.
//!
//! Southbound turns opaque device payloads ("packets") into ordered
//! `(task identifier, value, timestamp)` updates for a gateway's task manager.
//!
//! # Features
//!
//! - **Any packet type**: self-describing packets, registered descriptors, or
//!   custom decoding strategies
//! - **Reader selection**: first-fit factory over an explicit candidate registry
//! - **Bounded handoff**: each reader parses on its own worker thread, at most
//!   one fragment ahead of the consumer
//! - **Treated protocol**: resolved pairs are removed so they are never
//!   dispatched twice
//!
//! # Quick Start
//!
//! ```rust
//! use southbound::adapters::{DescribedPacket, PacketDescriptor, TextRole};
//! use southbound::reader::{PacketReaderFactory, ReaderCandidate};
//! use southbound::{PairCollection, Packet, Result, Value};
//!
//! #[derive(Clone)]
//! struct Thermometer {
//!     id: String,
//!     celsius: f64,
//! }
//!
//! impl Packet for Thermometer {
//!     fn bytes(&self) -> &[u8] {
//!         self.id.as_bytes()
//!     }
//! }
//!
//! impl DescribedPacket for Thermometer {
//!     fn descriptor() -> Result<PacketDescriptor<Self>> {
//!         PacketDescriptor::builder()
//!             .text(TextRole::ServiceProviderId, |p: &Thermometer| Ok(Some(p.id.clone())))
//!             .text(TextRole::ServiceId, |_| Ok(Some("climate".to_string())))
//!             .text(TextRole::ResourceId, |_| Ok(Some("temperature".to_string())))
//!             .data(|p| Ok(Some(Value::from(p.celsius))))
//!             .build()
//!     }
//! }
//!
//! let factory = PacketReaderFactory::new(ReaderCandidate::described(), Vec::new());
//! let packet = Thermometer { id: "thermo-1".into(), celsius: 21.5 };
//!
//! let mut reader = factory.try_new_instance(&packet)?;
//! for fragment in reader.fragments() {
//!     for pair in fragment.task_id_value_pairs(PairCollection::All) {
//!         assert_eq!(pair.task_identifier(), "thermo-1/climate/temperature/value");
//!         assert_eq!(pair.value(), &Value::Float(21.5));
//!     }
//! }
//! # Ok::<(), southbound::PacketError>(())
//! ```

// Core types and error handling
pub mod adapters;
pub mod config;
mod error;
pub mod packet;
pub mod payload;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Reading and dispatch
pub mod pipeline;
pub mod reader;
pub mod stream;

// Core exports
pub use config::PipelineConfig;
pub use error::*;
pub use packet::{BytesPacket, Packet, StructuredPacket, SubPacket, SubPacketSource};
pub use payload::{PairCollection, PayloadFragment, PayloadResourceFragment, PayloadServiceFragment};
pub use types::*;

// Reader exports
pub use pipeline::{DispatchReport, Pipeline, TaskDispatcher};
pub use reader::{PacketReader, PacketReaderFactory, ReaderState, StreamEnd};
