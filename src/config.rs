//! Pipeline configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::payload::PairCollection;
use crate::{PacketError, Result};

/// Default name prefix of reader worker threads.
pub const DEFAULT_WORKER_NAME: &str = "packet-reader";

/// Settings shared by the readers and pipelines built from one factory.
///
/// ```rust
/// use southbound::PipelineConfig;
/// use southbound::payload::PairCollection;
///
/// let config = PipelineConfig::from_yaml_str("pair_collection: first_only\n")?;
/// assert_eq!(config.worker_name, "packet-reader");
/// assert_eq!(config.pair_collection, PairCollection::FirstOnly);
/// assert!(!config.discard_untreated);
/// # Ok::<(), southbound::PacketError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Name prefix of reader worker threads
    pub worker_name: String,

    /// How many pairs a service fragment yields
    pub pair_collection: PairCollection,

    /// Drop pairs left untreated by the dispatcher without a warning
    pub discard_untreated: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_name: DEFAULT_WORKER_NAME.to_string(),
            pair_collection: PairCollection::default(),
            discard_untreated: false,
        }
    }
}

impl PipelineConfig {
    /// Parse a YAML document; missing fields keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_yaml_ng::from_str(yaml).map_err(|e| {
            PacketError::config(
                "Pipeline YAML deserialization",
                format!("YAML parsing failed: {}", e),
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            PacketError::config(format!("reading {}", path.display()), e.to_string())
        })?;

        let config = Self::from_yaml_str(&yaml)?;
        debug!("Loaded pipeline configuration from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Check values serde cannot reject.
    pub fn validate(&self) -> Result<()> {
        if self.worker_name.trim().is_empty() {
            return Err(PacketError::config("Pipeline validation", "worker_name is empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(PipelineConfig::from_yaml_str("").unwrap(), PipelineConfig::default());
        assert_eq!(PipelineConfig::from_yaml_str("\n  \n").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn every_field_is_read() {
        let yaml = "worker_name: gateway\npair_collection: all\ndiscard_untreated: true\n";
        let config = PipelineConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.worker_name, "gateway");
        assert_eq!(config.pair_collection, PairCollection::All);
        assert!(config.discard_untreated);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = PipelineConfig::from_yaml_str("worker_threads: 4\n").unwrap_err();
        assert!(matches!(err, PacketError::Config { .. }));
    }

    #[test]
    fn blank_worker_name_is_rejected() {
        let err = PipelineConfig::from_yaml_str("worker_name: '  '\n").unwrap_err();
        match err {
            PacketError::Config { details, .. } => assert!(details.contains("worker_name")),
            other => panic!("Expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "worker_name: meters").unwrap();
        writeln!(file, "pair_collection: first_only").unwrap();

        let config = PipelineConfig::from_path(file.path()).unwrap();
        assert_eq!(config.worker_name, "meters");
        assert_eq!(config.pair_collection, PairCollection::FirstOnly);
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");

        match PipelineConfig::from_path(&path).unwrap_err() {
            PacketError::Config { context, .. } => assert!(context.contains("absent.yaml")),
            other => panic!("Expected Config error, got {other:?}"),
        }
    }
}
