//! Command types addressed by a service fragment

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::PacketError;

/// Closed set of commands a structural unit can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandType {
    /// Read a resource value
    Get,
    /// Write a resource value
    Set,
    /// Trigger an action resource
    Act,
    /// Subscribe to resource updates
    Subscribe,
    /// Cancel a subscription
    Unsubscribe,
    /// Describe the services exposed by a device
    ServicesEnumeration,
}

impl CommandType {
    /// All commands, in declaration order.
    pub const ALL: [CommandType; 6] = [
        CommandType::Get,
        CommandType::Set,
        CommandType::Act,
        CommandType::Subscribe,
        CommandType::Unsubscribe,
        CommandType::ServicesEnumeration,
    ];

    /// Wire name of the command, as used in task identifiers.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CommandType::Get => "GET",
            CommandType::Set => "SET",
            CommandType::Act => "ACT",
            CommandType::Subscribe => "SUBSCRIBE",
            CommandType::Unsubscribe => "UNSUBSCRIBE",
            CommandType::ServicesEnumeration => "SERVICES_ENUMERATION",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandType {
    type Err = PacketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommandType::ALL
            .into_iter()
            .find(|command| command.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PacketError::invalid_packet(format!("Unknown command '{}'", s)))
    }
}
