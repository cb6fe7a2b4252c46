//! Error types for southbound packet processing.
//!
//! All errors implement `std::error::Error` and carry enough context to decide
//! whether a packet can be retried with another reader or must be discarded.
//!
//! ## Error Categories
//!
//! - **Packet Errors**: a loaded packet cannot be interpreted by the active strategy
//! - **Packet Type Errors**: a packet type is structurally incompatible with a strategy
//! - **Malformed Terminators**: a structural unit without a service provider
//! - **Reader Selection**: no registered reader accepted the packet
//! - **Worker Errors**: the dedicated parse worker could not run
//! - **Dispatch Errors**: the downstream task consumer rejected a pair
//! - **Configuration Errors**: pipeline configuration could not be loaded
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use southbound::PacketError;
//!
//! let error = PacketError::invalid_packet("truncated frame");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use thiserror::Error;

/// Result type alias for packet pipeline operations.
pub type Result<T, E = PacketError> = std::result::Result<T, E>;

/// Main error type for packet pipeline operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PacketError {
    #[error("Invalid packet: {reason}")]
    InvalidPacket {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Packet type {type_name} is not readable: {reason}")]
    InvalidPacketType { type_name: String, reason: String },

    #[error("Structural unit {unit} has no service provider identifier")]
    MissingServiceProvider { unit: usize },

    #[error("No reader accepted packet type {type_name} after {attempts} attempts")]
    NoReader { type_name: String, attempts: usize },

    #[error("Packet reader worker failure: {reason}")]
    Worker { reason: String },

    #[error("Dispatch of task '{task_identifier}' failed")]
    Dispatch {
        task_identifier: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Configuration error in {context}: {details}")]
    Config { context: String, details: String },
}

impl PacketError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            PacketError::InvalidPacket { .. } => true,
            PacketError::Dispatch { .. } => true,
            PacketError::Worker { .. } => true,
            PacketError::InvalidPacketType { .. } => false,
            PacketError::MissingServiceProvider { .. } => false,
            PacketError::NoReader { .. } => false,
            PacketError::Config { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            PacketError::InvalidPacket { .. } => vec![
                "Retry the packet with another registered reader",
                "Check the packet payload against the device protocol",
                "Discard the packet if it is corrupted",
            ],
            PacketError::InvalidPacketType { .. } => vec![
                "Register at least one role accessor for the packet type",
                "Implement StructuredPacket for self-describing packets",
                "Register a custom reader for this packet type",
            ],
            PacketError::MissingServiceProvider { .. } => vec![
                "Check that every structural unit names its device",
                "Treat the unit as an explicit end marker in the protocol adapter",
            ],
            PacketError::NoReader { .. } => vec![
                "Register a reader candidate for this packet type",
                "Check the default reader strategy of the factory",
            ],
            PacketError::Worker { .. } => vec![
                "Check thread limits of the host process",
                "Recreate the packet reader",
            ],
            PacketError::Dispatch { .. } => vec![
                "Check the task manager is still accepting updates",
                "Retry the packet once the task manager recovers",
            ],
            PacketError::Config { .. } => vec![
                "Check the configuration file exists and is readable",
                "Validate the YAML syntax and field names",
            ],
        }
    }

    /// Helper constructor for packets a strategy cannot interpret.
    pub fn invalid_packet(reason: impl Into<String>) -> Self {
        PacketError::InvalidPacket { reason: reason.into(), source: None }
    }

    /// Helper constructor for invalid packets with an underlying cause.
    pub fn invalid_packet_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        PacketError::InvalidPacket { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for packet types a strategy cannot be built for.
    pub fn invalid_packet_type<P: ?Sized>(reason: impl Into<String>) -> Self {
        PacketError::InvalidPacketType {
            type_name: std::any::type_name::<P>().to_string(),
            reason: reason.into(),
        }
    }

    /// Helper constructor for worker failures.
    pub fn worker(reason: impl Into<String>) -> Self {
        PacketError::Worker { reason: reason.into() }
    }

    /// Helper constructor for dispatch failures.
    pub fn dispatch(
        task_identifier: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        PacketError::Dispatch { task_identifier: task_identifier.into(), source: source.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(context: impl Into<String>, details: impl Into<String>) -> Self {
        PacketError::Config { context: context.into(), details: details.into() }
    }
}

impl From<std::io::Error> for PacketError {
    fn from(err: std::io::Error) -> Self {
        PacketError::Config { context: "I/O".to_string(), details: err.to_string() }
    }
}

impl From<serde_yaml_ng::Error> for PacketError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        PacketError::Config { context: "YAML".to_string(), details: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn error_messages_carry_their_context(
                reason in ".*",
                unit in 0usize..10_000usize,
                attempts in 0usize..64usize,
                type_name in "[a-z][a-z0-9_:]*"
            ) {
                let invalid = PacketError::invalid_packet(reason.clone());
                prop_assert!(invalid.to_string().contains(&reason));

                let missing = PacketError::MissingServiceProvider { unit };
                prop_assert!(missing.to_string().contains(&unit.to_string()));

                let no_reader = PacketError::NoReader { type_name: type_name.clone(), attempts };
                let message = no_reader.to_string();
                prop_assert!(message.contains(&type_name));
                prop_assert!(message.contains(&attempts.to_string()));
            }

            #[test]
            fn source_chain_is_preserved(base_message in ".*") {
                let error = PacketError::invalid_packet_with_source(
                    "decode",
                    Box::new(std::io::Error::other(base_message.clone())),
                );

                let source = std::error::Error::source(&error);
                prop_assert!(source.is_some());
                prop_assert_eq!(source.map(|s| s.to_string()), Some(base_message));
            }
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<PacketError>();

        let error = PacketError::worker("test");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn retry_classification() {
        assert!(PacketError::invalid_packet("bad").is_retryable());
        assert!(!PacketError::invalid_packet_type::<u8>("no roles").is_retryable());
        assert!(!PacketError::MissingServiceProvider { unit: 2 }.is_retryable());
        assert!(!PacketError::config("file", "missing").is_retryable());

        for error in [
            PacketError::invalid_packet("bad"),
            PacketError::MissingServiceProvider { unit: 0 },
            PacketError::NoReader { type_name: "x".into(), attempts: 1 },
        ] {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty());
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn packet_type_error_names_the_type() {
        let error = PacketError::invalid_packet_type::<String>("no roles registered");
        match error {
            PacketError::InvalidPacketType { type_name, reason } => {
                assert!(type_name.contains("String"));
                assert_eq!(reason, "no roles registered");
            }
            other => panic!("Expected InvalidPacketType, got {other:?}"),
        }
    }

    #[test]
    fn from_conversions_work() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "pipeline.yaml");
        let error: PacketError = io_err.into();
        assert!(matches!(
            error,
            PacketError::Config { ref details, .. } if details.contains("pipeline.yaml")
        ));
    }
}
