//! Unit-by-unit iteration over a described packet

use std::sync::Arc;
use tracing::trace;

use super::PacketDescriptor;
use crate::Result;
use crate::packet::{Packet, SubPacket, SubPacketSource};

/// Source of snapshots produced by a [`PacketDescriptor`].
///
/// The first unit is the packet as loaded. After each unit the iteration
/// accessor moves the private packet copy forward; iteration ends once it
/// returns false (or is not registered).
pub struct DescribedUnits<P> {
    descriptor: Arc<PacketDescriptor<P>>,
    packet: P,
    pending: Option<SubPacket>,
    produced: usize,
    exhausted: bool,
}

impl<P: Packet> DescribedUnits<P> {
    pub fn new(descriptor: Arc<PacketDescriptor<P>>, packet: P) -> Self {
        Self { descriptor, packet, pending: None, produced: 0, exhausted: false }
    }

    /// Units produced so far.
    pub fn produced(&self) -> usize {
        self.produced
    }

    /// Look at the next unit without consuming it.
    pub fn peek(&mut self) -> Option<&SubPacket> {
        if self.pending.is_none() {
            self.pending = self.step();
        }
        self.pending.as_ref()
    }

    fn step(&mut self) -> Option<SubPacket> {
        if self.exhausted {
            return None;
        }

        if self.produced > 0 && !self.descriptor.advance(&mut self.packet) {
            trace!("Described packet exhausted after {} units", self.produced);
            self.exhausted = true;
            return None;
        }

        self.produced += 1;
        Some(self.descriptor.snapshot(&self.packet))
    }
}

impl<P: Packet> Iterator for DescribedUnits<P> {
    type Item = SubPacket;

    fn next(&mut self) -> Option<SubPacket> {
        self.pending.take().or_else(|| self.step())
    }
}

impl<P: Packet> SubPacketSource for DescribedUnits<P> {
    fn next_unit(&mut self) -> Result<Option<SubPacket>> {
        Ok(self.next())
    }
}
