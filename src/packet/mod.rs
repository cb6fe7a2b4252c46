//! Packet abstractions consumed by readers.
//!
//! A [`Packet`] is an opaque byte-bearing unit handed over by a protocol
//! adapter. Readers never interpret those bytes themselves; they ask a
//! strategy to turn the packet into a sequence of [`SubPacket`] snapshots,
//! either because the packet describes its own structure
//! ([`StructuredPacket`]) or because a
//! [`PacketDescriptor`](crate::adapters::PacketDescriptor) was registered for
//! its type.

mod bytes;
mod sub_packet;

pub use bytes::BytesPacket;
pub use sub_packet::{SubPacket, SubPacketBuilder, VecSource};

use crate::Result;

/// Opaque unit of southbound device communication.
pub trait Packet: Send + 'static {
    /// Raw payload bytes.
    fn bytes(&self) -> &[u8];
}

/// Pull-based source of structural units for one loaded packet.
///
/// Sources are owned by the reader's worker thread for the duration of one
/// parse cycle.
pub trait SubPacketSource: Send {
    /// Next structural unit.
    ///
    /// Returns:
    /// - `Ok(Some(unit))` - Another unit is available
    /// - `Ok(None)` - The packet holds no further units
    /// - `Err(e)` - The packet content cannot be interpreted
    fn next_unit(&mut self) -> Result<Option<SubPacket>>;
}

impl SubPacketSource for Box<dyn SubPacketSource> {
    fn next_unit(&mut self) -> Result<Option<SubPacket>> {
        (**self).next_unit()
    }
}

/// Packet that describes its own structure.
pub trait StructuredPacket: Packet {
    /// Open a source over the structural units of this packet.
    ///
    /// Fails with [`PacketError::InvalidPacket`](crate::PacketError::InvalidPacket)
    /// if the payload cannot be interpreted.
    fn sub_packets(&self) -> Result<Box<dyn SubPacketSource>>;
}
