//! Everything one packet says about one device

use tracing::trace;

use super::{PairCollection, PayloadServiceFragment};
use crate::types::TaskIdValuePair;

/// All data in one packet concerning one service provider.
///
/// Service fragments keep insertion order. Adding a fragment whose name is
/// already present merges it into the first one defined.
#[derive(Debug, Clone)]
pub struct PayloadFragment {
    profile_id: Option<String>,
    service_provider_id: String,
    hello: bool,
    goodbye: bool,
    services: Vec<PayloadServiceFragment>,
}

impl PayloadFragment {
    /// Create an empty fragment for a device.
    pub fn new(service_provider_id: impl Into<String>, profile_id: Option<String>) -> Self {
        Self {
            profile_id,
            service_provider_id: service_provider_id.into(),
            hello: false,
            goodbye: false,
            services: Vec::new(),
        }
    }

    pub fn profile_id(&self) -> Option<&str> {
        self.profile_id.as_deref()
    }

    pub fn service_provider_id(&self) -> &str {
        &self.service_provider_id
    }

    /// True if the device announced itself in this packet.
    pub fn is_hello_message(&self) -> bool {
        self.hello
    }

    /// True if the device signed off in this packet.
    pub fn is_goodbye_message(&self) -> bool {
        self.goodbye
    }

    pub fn set_hello(&mut self, hello: bool) {
        self.hello = hello;
    }

    pub fn set_goodbye(&mut self, goodbye: bool) {
        self.goodbye = goodbye;
    }

    pub fn services(&self) -> &[PayloadServiceFragment] {
        &self.services
    }

    /// First service fragment with the given name.
    pub fn service(&self, name: &str) -> Option<&PayloadServiceFragment> {
        self.services.iter().find(|service| service.name() == name)
    }

    /// Mutable access to the first service fragment with the given name.
    pub fn service_mut(&mut self, name: &str) -> Option<&mut PayloadServiceFragment> {
        self.services.iter_mut().find(|service| service.name() == name)
    }

    /// Add a service fragment, merging it into an existing one with the same name.
    pub fn add_service(&mut self, service: PayloadServiceFragment) {
        let service = match self.service_mut(service.name()) {
            Some(existing) => match existing.merge(service) {
                Ok(()) => return,
                Err(service) => service,
            },
            None => service,
        };
        self.services.push(service);
    }

    /// Number of resource fragments still pending across all services.
    pub fn resource_count(&self) -> usize {
        self.services.iter().map(PayloadServiceFragment::len).sum()
    }

    /// True when no resource fragment is left to treat.
    pub fn is_empty(&self) -> bool {
        self.services.iter().all(PayloadServiceFragment::is_empty)
    }

    /// Convert every service fragment into task pairs, in service order.
    pub fn task_id_value_pairs(&self, collection: PairCollection) -> Vec<TaskIdValuePair> {
        self.services
            .iter()
            .flat_map(|service| service.task_id_value_pairs(&self.service_provider_id, collection))
            .collect()
    }

    /// Mark the task as consumed.
    ///
    /// Removes the first matching resource fragment and prunes its service
    /// fragment once emptied. Returns false if no resource fragment of this
    /// packet produced that task.
    pub fn treated(&mut self, task_identifier: &str) -> bool {
        let provider = self.service_provider_id.as_str();
        let Some(index) =
            self.services.iter_mut().position(|service| service.treated(provider, task_identifier))
        else {
            trace!("Task '{}' not produced by fragment '{}'", task_identifier, provider);
            return false;
        };

        if self.services[index].is_empty() {
            let pruned = self.services.remove(index);
            trace!("Pruned emptied service fragment '{}'", pruned.name());
        }
        true
    }
}
