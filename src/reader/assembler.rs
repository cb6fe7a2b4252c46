//! Staging of structural units into payload fragments

use tracing::trace;

use crate::packet::SubPacket;
use crate::payload::{PayloadFragment, PayloadResourceFragment, PayloadServiceFragment};
use crate::{PacketError, Result};

/// Turns a sequence of units into payload fragments.
///
/// Consecutive units for the same `(profile, service provider)` accumulate
/// into one fragment; a unit for another device completes the staged one.
#[derive(Debug, Default)]
pub(crate) struct FragmentAssembler {
    staged: Option<SubPacket>,
    current: Option<PayloadFragment>,
}

impl FragmentAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage one unit and configure fragments from it.
    ///
    /// Returns the previously staged fragment when this unit belongs to
    /// another device. A unit without a service provider is reported as
    /// [`PacketError::MissingServiceProvider`].
    pub fn parse(&mut self, index: usize, unit: SubPacket) -> Result<Option<PayloadFragment>> {
        self.reset();
        self.staged = Some(unit);
        self.configure(index)
    }

    fn configure(&mut self, index: usize) -> Result<Option<PayloadFragment>> {
        let Some(unit) = self.staged.take() else {
            return Ok(None);
        };
        let has_resource = unit.has_resource();
        let has_address = unit.has_service_address();
        let Some(provider) = unit.service_provider_id else {
            return Err(PacketError::MissingServiceProvider { unit: index });
        };

        let mut completed = None;
        let mut fragment = match self.current.take() {
            Some(fragment)
                if fragment.service_provider_id() == provider
                    && fragment.profile_id() == unit.profile_id.as_deref() =>
            {
                fragment
            }
            previous => {
                completed = previous;
                trace!("Unit {} opens fragment for '{}'", index, provider);
                PayloadFragment::new(provider, unit.profile_id)
            }
        };

        if unit.hello {
            fragment.set_hello(true);
        }
        if unit.goodbye {
            fragment.set_goodbye(true);
        }

        if has_address || has_resource {
            let mut service =
                PayloadServiceFragment::new(unit.command, unit.service_id, unit.resource_id);
            if has_resource {
                service.push(PayloadResourceFragment::new(
                    unit.attribute_id,
                    unit.metadata_id,
                    unit.data.unwrap_or_default(),
                    unit.timestamp,
                ));
            }
            fragment.add_service(service);
        }

        self.current = Some(fragment);
        Ok(completed)
    }

    /// Complete the staged fragment, if any.
    pub fn finish(&mut self) -> Option<PayloadFragment> {
        self.reset();
        self.current.take()
    }

    /// Clear staged unit fields; the fragment under construction is kept.
    pub fn reset(&mut self) {
        self.staged = None;
    }
}
