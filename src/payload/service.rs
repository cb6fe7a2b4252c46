//! Resource fragments grouped under one `(command, service, resource)` address

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::debug;

use super::PayloadResourceFragment;
use crate::types::{CommandType, TASK_ID_SEPARATOR, TaskIdValuePair, join_segments};

/// How many pairs a service fragment emits per conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairCollection {
    /// One pair per contained resource fragment
    #[default]
    All,
    /// Stop after the first converted resource fragment (historical behaviour)
    FirstOnly,
}

/// Data addressed to one `(command, service, resource)` tuple of a device.
#[derive(Debug, Clone)]
pub struct PayloadServiceFragment {
    command: Option<CommandType>,
    service_id: Option<String>,
    resource_id: Option<String>,
    name: String,
    resources: Vec<PayloadResourceFragment>,
    task_identifier: OnceLock<String>,
}

impl PayloadServiceFragment {
    /// Create an empty service fragment.
    pub fn new(
        command: Option<CommandType>,
        service_id: Option<String>,
        resource_id: Option<String>,
    ) -> Self {
        let name = Self::derive_name(command, service_id.as_deref(), resource_id.as_deref());
        Self {
            command,
            service_id,
            resource_id,
            name,
            resources: Vec::new(),
            task_identifier: OnceLock::new(),
        }
    }

    /// Name a fragment with this address would carry.
    pub fn derive_name(
        command: Option<CommandType>,
        service_id: Option<&str>,
        resource_id: Option<&str>,
    ) -> String {
        join_segments([command.map(|c| c.as_str()), service_id, resource_id])
    }

    /// Slash-joined command, service and resource; identity of the fragment.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self) -> Option<CommandType> {
        self.command
    }

    pub fn service_id(&self) -> Option<&str> {
        self.service_id.as_deref()
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    pub fn resources(&self) -> &[PayloadResourceFragment] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn push(&mut self, resource: PayloadResourceFragment) {
        self.resources.push(resource);
    }

    /// Absorb the resources of an identically addressed fragment.
    ///
    /// Returns `other` untouched when the names differ.
    pub fn merge(&mut self, other: PayloadServiceFragment) -> Result<(), PayloadServiceFragment> {
        if other.name != self.name {
            return Err(other);
        }
        self.resources.extend(other.resources);
        Ok(())
    }

    /// Task identifier of this fragment for the given device.
    ///
    /// Computed on first use; later calls return the cached value even when
    /// a different provider is passed.
    pub fn task_identifier(&self, service_provider_id: &str) -> &str {
        let name = (!self.name.is_empty()).then_some(self.name.as_str());
        let id = self
            .task_identifier
            .get_or_init(|| join_segments([Some(service_provider_id), name]));

        let bound_to_provider = id
            .strip_prefix(service_provider_id)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(TASK_ID_SEPARATOR));
        if !bound_to_provider {
            debug!(
                "Service fragment '{}' already bound to '{}', ignoring provider '{}'",
                self.name, id, service_provider_id
            );
        }
        id
    }

    /// Convert contained resources into task pairs.
    pub fn task_id_value_pairs(
        &self,
        service_provider_id: &str,
        collection: PairCollection,
    ) -> Vec<TaskIdValuePair> {
        let task_identifier = self.task_identifier(service_provider_id);

        match collection {
            PairCollection::All => self
                .resources
                .iter()
                .map(|resource| resource.task_id_value_pair(task_identifier))
                .collect(),
            PairCollection::FirstOnly => self
                .resources
                .first()
                .map(|resource| resource.task_id_value_pair(task_identifier))
                .into_iter()
                .collect(),
        }
    }

    /// Remove the first resource fragment whose task identifier matches.
    pub fn treated(&mut self, service_provider_id: &str, task_identifier: &str) -> bool {
        let parent = self.task_identifier(service_provider_id);
        let position = self
            .resources
            .iter()
            .position(|resource| resource.task_identifier(parent) == task_identifier);

        match position {
            Some(index) => {
                self.resources.remove(index);
                true
            }
            None => false,
        }
    }
}

impl PartialEq for PayloadServiceFragment {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for PayloadServiceFragment {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    fn resource(attribute: &str, data: i64) -> PayloadResourceFragment {
        PayloadResourceFragment::new(Some(attribute.to_string()), None, Value::Int(data), 100)
    }

    fn service_with(resources: &[(&str, i64)]) -> PayloadServiceFragment {
        let mut service = PayloadServiceFragment::new(
            Some(CommandType::Set),
            Some("S1".into()),
            Some("R1".into()),
        );
        for (attribute, data) in resources {
            service.push(resource(attribute, *data));
        }
        service
    }

    #[test]
    fn name_omits_absent_segments() {
        let full = PayloadServiceFragment::new(
            Some(CommandType::Get),
            Some("light".into()),
            Some("state".into()),
        );
        assert_eq!(full.name(), "GET/light/state");

        let partial = PayloadServiceFragment::new(None, Some("light".into()), None);
        assert_eq!(partial.name(), "light");

        let empty = PayloadServiceFragment::new(None, None, None);
        assert_eq!(empty.name(), "");
        assert_eq!(empty.task_identifier("dev"), "dev");
    }

    #[test]
    fn equality_follows_name() {
        let a = service_with(&[("value", 1)]);
        let b = service_with(&[("value", 2), ("min", 0)]);
        assert_eq!(a, b);

        let c = PayloadServiceFragment::new(
            Some(CommandType::Get),
            Some("S1".into()),
            Some("R1".into()),
        );
        assert_ne!(a, c);
    }

    #[test]
    fn merge_only_accepts_same_address() {
        let mut target = service_with(&[("value", 1)]);
        target.merge(service_with(&[("value", 2)])).unwrap();
        assert_eq!(target.len(), 2);

        let other = PayloadServiceFragment::new(None, Some("S2".into()), None);
        let rejected = target.merge(other).unwrap_err();
        assert_eq!(rejected.name(), "S2");
        assert_eq!(target.len(), 2);
    }

    #[test]
    fn all_collection_maps_every_resource() {
        let service = service_with(&[("value", 1), ("min", 0), ("max", 9)]);
        let pairs = service.task_id_value_pairs("P1", PairCollection::All);

        let ids: Vec<&str> = pairs.iter().map(|p| p.task_identifier()).collect();
        assert_eq!(ids, ["P1/SET/S1/R1/value", "P1/SET/S1/R1/min", "P1/SET/S1/R1/max"]);
    }

    #[test]
    fn first_only_collection_stops_after_first_pair() {
        let service = service_with(&[("value", 1), ("min", 0), ("max", 9)]);
        let pairs = service.task_id_value_pairs("P1", PairCollection::FirstOnly);

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].task_identifier(), "P1/SET/S1/R1/value");
        assert_eq!(pairs[0].value(), &Value::Int(1));
    }

    #[test]
    fn task_identifier_is_bound_once() {
        let service = service_with(&[("value", 1)]);
        assert_eq!(service.task_identifier("P1"), "P1/SET/S1/R1");
        assert_eq!(service.task_identifier("P2"), "P1/SET/S1/R1");

        let pairs = service.task_id_value_pairs("P2", PairCollection::All);
        assert_eq!(pairs[0].task_identifier(), "P1/SET/S1/R1/value");
    }

    #[test]
    fn treated_removes_one_duplicate_per_call() {
        let mut service = service_with(&[("value", 1), ("value", 2), ("value", 3)]);
        let id = "P1/SET/S1/R1/value";

        for remaining in (0..3).rev() {
            assert!(service.treated("P1", id));
            assert_eq!(service.len(), remaining);
        }
        assert!(!service.treated("P1", id));
        assert!(service.is_empty());
    }
}
