//! Structural roles a packet accessor can fill

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of structural roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    ProfileId,
    ServiceProviderId,
    ServiceId,
    ResourceId,
    AttributeId,
    MetadataId,
    Command,
    Data,
    Timestamp,
    Hello,
    Goodbye,
    /// Continuation flag: advances the packet to its next structural unit
    Iteration,
}

impl Role {
    pub const ALL: [Role; 12] = [
        Role::ProfileId,
        Role::ServiceProviderId,
        Role::ServiceId,
        Role::ResourceId,
        Role::AttributeId,
        Role::MetadataId,
        Role::Command,
        Role::Data,
        Role::Timestamp,
        Role::Hello,
        Role::Goodbye,
        Role::Iteration,
    ];

    /// Value reported when the role is unregistered or its accessor fails.
    pub fn describe_default(&self) -> &'static str {
        match self {
            Role::Hello | Role::Goodbye => "false",
            Role::Timestamp => "-1 (wall clock)",
            Role::Iteration => "single unit",
            _ => "none",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::ProfileId => "profile_id",
            Role::ServiceProviderId => "service_provider_id",
            Role::ServiceId => "service_id",
            Role::ResourceId => "resource_id",
            Role::AttributeId => "attribute_id",
            Role::MetadataId => "metadata_id",
            Role::Command => "command",
            Role::Data => "data",
            Role::Timestamp => "timestamp",
            Role::Hello => "hello",
            Role::Goodbye => "goodbye",
            Role::Iteration => "iteration",
        };
        f.write_str(name)
    }
}

/// Roles filled by a text accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextRole {
    ProfileId,
    ServiceProviderId,
    ServiceId,
    ResourceId,
    AttributeId,
    MetadataId,
}

impl TextRole {
    pub(crate) const COUNT: usize = 6;

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl From<TextRole> for Role {
    fn from(role: TextRole) -> Self {
        match role {
            TextRole::ProfileId => Role::ProfileId,
            TextRole::ServiceProviderId => Role::ServiceProviderId,
            TextRole::ServiceId => Role::ServiceId,
            TextRole::ResourceId => Role::ResourceId,
            TextRole::AttributeId => Role::AttributeId,
            TextRole::MetadataId => Role::MetadataId,
        }
    }
}

/// Roles filled by a boolean accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagRole {
    Hello,
    Goodbye,
}

impl FlagRole {
    pub(crate) const COUNT: usize = 2;

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl From<FlagRole> for Role {
    fn from(role: FlagRole) -> Self {
        match role {
            FlagRole::Hello => Role::Hello,
            FlagRole::Goodbye => Role::Goodbye,
        }
    }
}
