//! Registration-time mapping from packet types to structural roles

use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{DescribedUnits, FlagRole, Role, TextRole};
use crate::packet::{Packet, SubPacket};
use crate::types::{CommandType, USE_WALL_CLOCK, Value};
use crate::{PacketError, Result};

type Accessor<P, T> = Box<dyn Fn(&P) -> anyhow::Result<T> + Send + Sync>;
type Advance<P> = Box<dyn Fn(&mut P) -> anyhow::Result<bool> + Send + Sync>;

/// Packet type that registers its own descriptor.
///
/// Implemented once per packet type; the descriptor is built and validated
/// when a reader strategy is constructed, never per packet.
pub trait DescribedPacket: Packet + Sized {
    /// Build the role mapping for this packet type.
    fn descriptor() -> Result<PacketDescriptor<Self>>;
}

/// Typed accessors for every structural role a packet type fills.
///
/// Accessors are fallible. At runtime a failing or unregistered accessor
/// degrades to the role default (`None`, `false`, or `-1` for the
/// timestamp); failures are logged at debug level and never returned.
pub struct PacketDescriptor<P> {
    text: [Option<Accessor<P, Option<String>>>; TextRole::COUNT],
    command: Option<Accessor<P, Option<CommandType>>>,
    data: Option<Accessor<P, Option<Value>>>,
    timestamp: Option<Accessor<P, Option<i64>>>,
    flags: [Option<Accessor<P, bool>>; FlagRole::COUNT],
    iteration: Option<Advance<P>>,
}

impl<P: Packet> PacketDescriptor<P> {
    /// Start registering accessors.
    pub fn builder() -> PacketDescriptorBuilder<P> {
        PacketDescriptorBuilder {
            descriptor: PacketDescriptor {
                text: Default::default(),
                command: None,
                data: None,
                timestamp: None,
                flags: Default::default(),
                iteration: None,
            },
        }
    }

    /// Roles with a registered accessor, in [`Role::ALL`] order.
    pub fn registered_roles(&self) -> Vec<Role> {
        Role::ALL.into_iter().filter(|role| self.has_role(*role)).collect()
    }

    pub fn has_role(&self, role: Role) -> bool {
        match role {
            Role::ProfileId => self.text[TextRole::ProfileId.index()].is_some(),
            Role::ServiceProviderId => self.text[TextRole::ServiceProviderId.index()].is_some(),
            Role::ServiceId => self.text[TextRole::ServiceId.index()].is_some(),
            Role::ResourceId => self.text[TextRole::ResourceId.index()].is_some(),
            Role::AttributeId => self.text[TextRole::AttributeId.index()].is_some(),
            Role::MetadataId => self.text[TextRole::MetadataId.index()].is_some(),
            Role::Command => self.command.is_some(),
            Role::Data => self.data.is_some(),
            Role::Timestamp => self.timestamp.is_some(),
            Role::Hello => self.flags[FlagRole::Hello.index()].is_some(),
            Role::Goodbye => self.flags[FlagRole::Goodbye.index()].is_some(),
            Role::Iteration => self.iteration.is_some(),
        }
    }

    pub fn text_role(&self, role: TextRole, packet: &P) -> Option<String> {
        read(self.text[role.index()].as_ref(), role.into(), packet).flatten()
    }

    pub fn profile_id(&self, packet: &P) -> Option<String> {
        self.text_role(TextRole::ProfileId, packet)
    }

    pub fn service_provider_id(&self, packet: &P) -> Option<String> {
        self.text_role(TextRole::ServiceProviderId, packet)
    }

    pub fn service_id(&self, packet: &P) -> Option<String> {
        self.text_role(TextRole::ServiceId, packet)
    }

    pub fn resource_id(&self, packet: &P) -> Option<String> {
        self.text_role(TextRole::ResourceId, packet)
    }

    pub fn attribute_id(&self, packet: &P) -> Option<String> {
        self.text_role(TextRole::AttributeId, packet)
    }

    pub fn metadata_id(&self, packet: &P) -> Option<String> {
        self.text_role(TextRole::MetadataId, packet)
    }

    pub fn command(&self, packet: &P) -> Option<CommandType> {
        read(self.command.as_ref(), Role::Command, packet).flatten()
    }

    pub fn data(&self, packet: &P) -> Option<Value> {
        read(self.data.as_ref(), Role::Data, packet).flatten()
    }

    /// Unit timestamp, [`USE_WALL_CLOCK`] when unknown.
    pub fn timestamp(&self, packet: &P) -> i64 {
        read(self.timestamp.as_ref(), Role::Timestamp, packet).flatten().unwrap_or(USE_WALL_CLOCK)
    }

    pub fn is_hello_message(&self, packet: &P) -> bool {
        read(self.flags[FlagRole::Hello.index()].as_ref(), Role::Hello, packet).unwrap_or(false)
    }

    pub fn is_goodbye_message(&self, packet: &P) -> bool {
        read(self.flags[FlagRole::Goodbye.index()].as_ref(), Role::Goodbye, packet)
            .unwrap_or(false)
    }

    /// Move the packet to its next structural unit.
    ///
    /// Returns false when no unit remains, when no iteration accessor is
    /// registered, or when the accessor fails.
    pub fn advance(&self, packet: &mut P) -> bool {
        let Some(advance) = self.iteration.as_ref() else {
            return false;
        };
        match advance(packet) {
            Ok(more) => more,
            Err(e) => {
                debug!("Role '{}' accessor failed, ending iteration: {:#}", Role::Iteration, e);
                false
            }
        }
    }

    /// Immutable snapshot of the unit the packet currently exposes.
    pub fn snapshot(&self, packet: &P) -> SubPacket {
        SubPacket {
            profile_id: self.profile_id(packet),
            service_provider_id: self.service_provider_id(packet),
            service_id: self.service_id(packet),
            resource_id: self.resource_id(packet),
            attribute_id: self.attribute_id(packet),
            metadata_id: self.metadata_id(packet),
            command: self.command(packet),
            data: self.data(packet),
            timestamp: self.timestamp(packet),
            hello: self.is_hello_message(packet),
            goodbye: self.is_goodbye_message(packet),
        }
    }

    /// Source over the units of `packet`, driven by a private copy of it.
    pub fn units(self: &Arc<Self>, packet: &P) -> DescribedUnits<P>
    where
        P: Clone,
    {
        DescribedUnits::new(Arc::clone(self), packet.clone())
    }
}

fn read<P, T>(accessor: Option<&Accessor<P, T>>, role: Role, packet: &P) -> Option<T> {
    let accessor = accessor?;
    match accessor(packet) {
        Ok(value) => Some(value),
        Err(e) => {
            let default = role.describe_default();
            debug!("Role '{}' accessor failed, using default {}: {:#}", role, default, e);
            None
        }
    }
}

impl<P: Packet> fmt::Debug for PacketDescriptor<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketDescriptor")
            .field("packet_type", &std::any::type_name::<P>())
            .field("roles", &self.registered_roles())
            .finish()
    }
}

/// Builder registering one accessor per role.
///
/// Registering a role twice keeps the last accessor.
pub struct PacketDescriptorBuilder<P> {
    descriptor: PacketDescriptor<P>,
}

impl<P: Packet> PacketDescriptorBuilder<P> {
    pub fn text<F>(mut self, role: TextRole, accessor: F) -> Self
    where
        F: Fn(&P) -> anyhow::Result<Option<String>> + Send + Sync + 'static,
    {
        replaced(role.into(), self.descriptor.text[role.index()].replace(Box::new(accessor)));
        self
    }

    pub fn command<F>(mut self, accessor: F) -> Self
    where
        F: Fn(&P) -> anyhow::Result<Option<CommandType>> + Send + Sync + 'static,
    {
        replaced(Role::Command, self.descriptor.command.replace(Box::new(accessor)));
        self
    }

    pub fn data<F>(mut self, accessor: F) -> Self
    where
        F: Fn(&P) -> anyhow::Result<Option<Value>> + Send + Sync + 'static,
    {
        replaced(Role::Data, self.descriptor.data.replace(Box::new(accessor)));
        self
    }

    pub fn timestamp<F>(mut self, accessor: F) -> Self
    where
        F: Fn(&P) -> anyhow::Result<Option<i64>> + Send + Sync + 'static,
    {
        replaced(Role::Timestamp, self.descriptor.timestamp.replace(Box::new(accessor)));
        self
    }

    pub fn flag<F>(mut self, role: FlagRole, accessor: F) -> Self
    where
        F: Fn(&P) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        replaced(role.into(), self.descriptor.flags[role.index()].replace(Box::new(accessor)));
        self
    }

    /// Register the continuation accessor.
    ///
    /// Called after each unit; returning `true` means the packet now exposes
    /// another unit.
    pub fn iteration<F>(mut self, accessor: F) -> Self
    where
        F: Fn(&mut P) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        replaced(Role::Iteration, self.descriptor.iteration.replace(Box::new(accessor)));
        self
    }

    /// Validate and finish the descriptor.
    ///
    /// Fails with [`PacketError::InvalidPacketType`] if no role was registered.
    pub fn build(self) -> Result<PacketDescriptor<P>> {
        let roles = self.descriptor.registered_roles();
        if roles.is_empty() {
            return Err(PacketError::invalid_packet_type::<P>("no structural role registered"));
        }

        if !self.descriptor.has_role(Role::ServiceProviderId) {
            warn!(
                "Descriptor for {} has no service provider accessor; \
                 every unit will end the stream",
                std::any::type_name::<P>()
            );
        }

        debug!("Descriptor for {} built with roles {:?}", std::any::type_name::<P>(), roles);
        Ok(self.descriptor)
    }
}

fn replaced<T>(role: Role, previous: Option<T>) {
    if previous.is_some() {
        debug!("Role '{}' registered twice, keeping the last accessor", role);
    }
}
