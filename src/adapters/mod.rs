//! Registration-time packet descriptors.
//!
//! Arbitrary packet types expose their structure through a
//! [`PacketDescriptor`]: one typed accessor per structural [`Role`]
//! (profile, device, service, resource, attribute, metadata, command, data,
//! timestamp, hello/goodbye flags and an iteration accessor).
//!
//! # Design Philosophy
//!
//! The descriptor follows a "fail-fast, run-lenient" principle:
//! - A packet type with no registered role is rejected when the reader
//!   strategy is built, with [`PacketError::InvalidPacketType`](crate::PacketError)
//! - At runtime accessors never fail the packet: an accessor error degrades
//!   that role to its default so a partially readable packet still yields
//!   partial data
//!
//! # Example Usage
//!
//! ```rust
//! use southbound::adapters::{DescribedPacket, PacketDescriptor, TextRole};
//! use southbound::{Packet, Result, Value};
//!
//! struct Reading {
//!     device: String,
//!     raw: Vec<u8>,
//! }
//!
//! impl Packet for Reading {
//!     fn bytes(&self) -> &[u8] {
//!         &self.raw
//!     }
//! }
//!
//! impl DescribedPacket for Reading {
//!     fn descriptor() -> Result<PacketDescriptor<Self>> {
//!         PacketDescriptor::builder()
//!             .text(TextRole::ServiceProviderId, |p: &Reading| Ok(Some(p.device.clone())))
//!             .text(TextRole::ServiceId, |_| Ok(Some("meter".to_string())))
//!             .data(|p| Ok(p.raw.first().map(|b| Value::Int(i64::from(*b)))))
//!             .build()
//!     }
//! }
//!
//! let descriptor = Reading::descriptor()?;
//! let packet = Reading { device: "dev-1".into(), raw: vec![7] };
//! let unit = descriptor.snapshot(&packet);
//! assert_eq!(unit.service_provider_id(), Some("dev-1"));
//! assert_eq!(unit.data(), Some(&Value::Int(7)));
//! # Ok::<(), southbound::PacketError>(())
//! ```

mod descriptor;
mod role;
mod units;

pub use descriptor::{DescribedPacket, PacketDescriptor, PacketDescriptorBuilder};
pub use role::{FlagRole, Role, TextRole};
pub use units::DescribedUnits;
