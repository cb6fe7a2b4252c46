//! Byte-backed packet for protocol adapters

use std::sync::Arc;

use super::Packet;
use crate::types::now_millis;

/// Raw payload received from a southbound endpoint.
///
/// The buffer is shared (zero-copy via Arc) so a packet can be handed to
/// several reader candidates without copying.
#[derive(Debug, Clone)]
pub struct BytesPacket {
    /// Payload bytes
    pub data: Arc<[u8]>,

    /// Reception time in milliseconds since the Unix epoch
    pub received_at: i64,
}

impl BytesPacket {
    /// Create a packet stamped with the current wall clock.
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self { data: data.into(), received_at: now_millis() }
    }

    /// Create a packet with an explicit reception time.
    pub fn with_timestamp(data: impl Into<Arc<[u8]>>, received_at: i64) -> Self {
        Self { data: data.into(), received_at }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Packet for BytesPacket {
    fn bytes(&self) -> &[u8] {
        &self.data
    }
}
