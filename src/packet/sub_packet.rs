//! Structural unit snapshots

use std::collections::VecDeque;

use super::SubPacketSource;
use crate::Result;
use crate::types::{CommandType, USE_WALL_CLOCK, Value};

/// One structural unit of a packet.
///
/// A snapshot is immutable once built; every step of a source produces a new
/// value, so two units never alias each other.
#[derive(Debug, Clone, PartialEq)]
pub struct SubPacket {
    pub(crate) profile_id: Option<String>,
    pub(crate) service_provider_id: Option<String>,
    pub(crate) service_id: Option<String>,
    pub(crate) resource_id: Option<String>,
    pub(crate) attribute_id: Option<String>,
    pub(crate) metadata_id: Option<String>,
    pub(crate) command: Option<CommandType>,
    pub(crate) data: Option<Value>,
    pub(crate) timestamp: i64,
    pub(crate) hello: bool,
    pub(crate) goodbye: bool,
}

impl Default for SubPacket {
    fn default() -> Self {
        Self {
            profile_id: None,
            service_provider_id: None,
            service_id: None,
            resource_id: None,
            attribute_id: None,
            metadata_id: None,
            command: None,
            data: None,
            timestamp: USE_WALL_CLOCK,
            hello: false,
            goodbye: false,
        }
    }
}

impl SubPacket {
    /// Start building a unit.
    pub fn builder() -> SubPacketBuilder {
        SubPacketBuilder::default()
    }

    /// Unit without a service provider, used by protocols as an end marker.
    pub fn terminator() -> Self {
        Self::default()
    }

    pub fn profile_id(&self) -> Option<&str> {
        self.profile_id.as_deref()
    }

    pub fn service_provider_id(&self) -> Option<&str> {
        self.service_provider_id.as_deref()
    }

    pub fn service_id(&self) -> Option<&str> {
        self.service_id.as_deref()
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    pub fn attribute_id(&self) -> Option<&str> {
        self.attribute_id.as_deref()
    }

    pub fn metadata_id(&self) -> Option<&str> {
        self.metadata_id.as_deref()
    }

    pub fn command(&self) -> Option<CommandType> {
        self.command
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Milliseconds since the Unix epoch, or [`USE_WALL_CLOCK`].
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn is_hello_message(&self) -> bool {
        self.hello
    }

    pub fn is_goodbye_message(&self) -> bool {
        self.goodbye
    }

    /// True if the unit addresses a service fragment.
    pub fn has_service_address(&self) -> bool {
        self.command.is_some() || self.service_id.is_some() || self.resource_id.is_some()
    }

    /// True if the unit carries a resource data point.
    pub fn has_resource(&self) -> bool {
        self.attribute_id.is_some() || self.data.is_some()
    }
}

/// Fluent builder for [`SubPacket`].
#[derive(Debug, Default)]
pub struct SubPacketBuilder {
    unit: SubPacket,
}

impl SubPacketBuilder {
    pub fn profile(mut self, profile_id: impl Into<String>) -> Self {
        self.unit.profile_id = Some(profile_id.into());
        self
    }

    pub fn service_provider(mut self, service_provider_id: impl Into<String>) -> Self {
        self.unit.service_provider_id = Some(service_provider_id.into());
        self
    }

    pub fn service(mut self, service_id: impl Into<String>) -> Self {
        self.unit.service_id = Some(service_id.into());
        self
    }

    pub fn resource(mut self, resource_id: impl Into<String>) -> Self {
        self.unit.resource_id = Some(resource_id.into());
        self
    }

    pub fn attribute(mut self, attribute_id: impl Into<String>) -> Self {
        self.unit.attribute_id = Some(attribute_id.into());
        self
    }

    pub fn metadata(mut self, metadata_id: impl Into<String>) -> Self {
        self.unit.metadata_id = Some(metadata_id.into());
        self
    }

    pub fn command(mut self, command: CommandType) -> Self {
        self.unit.command = Some(command);
        self
    }

    pub fn data(mut self, data: impl Into<Value>) -> Self {
        self.unit.data = Some(data.into());
        self
    }

    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.unit.timestamp = timestamp;
        self
    }

    pub fn hello(mut self, hello: bool) -> Self {
        self.unit.hello = hello;
        self
    }

    pub fn goodbye(mut self, goodbye: bool) -> Self {
        self.unit.goodbye = goodbye;
        self
    }

    pub fn build(self) -> SubPacket {
        self.unit
    }
}

/// Source over units decoded up front.
#[derive(Debug, Default)]
pub struct VecSource {
    units: VecDeque<SubPacket>,
}

impl VecSource {
    pub fn new(units: impl IntoIterator<Item = SubPacket>) -> Self {
        Self { units: units.into_iter().collect() }
    }

    /// Units not yet pulled.
    pub fn remaining(&self) -> usize {
        self.units.len()
    }
}

impl SubPacketSource for VecSource {
    fn next_unit(&mut self) -> Result<Option<SubPacket>> {
        Ok(self.units.pop_front())
    }
}
