//! First-fit reader selection over an explicit registry

use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use super::{PacketReader, ReadingStrategy, StructuredStrategy};
use crate::adapters::DescribedPacket;
use crate::config::PipelineConfig;
use crate::packet::StructuredPacket;
use crate::{PacketError, Result};

type StrategyConstructor<P> = Box<dyn Fn() -> Result<Arc<dyn ReadingStrategy<P>>> + Send + Sync>;

/// Named constructor of a reading strategy registered with a factory.
pub struct ReaderCandidate<P> {
    name: String,
    construct: StrategyConstructor<P>,
}

impl<P: 'static> ReaderCandidate<P> {
    /// Candidate built by `construct` each time the factory tries it.
    pub fn new<F, S>(name: impl Into<String>, construct: F) -> Self
    where
        F: Fn() -> Result<S> + Send + Sync + 'static,
        S: ReadingStrategy<P> + 'static,
    {
        Self {
            name: name.into(),
            construct: Box::new(move || {
                construct().map(|strategy| Arc::new(strategy) as Arc<dyn ReadingStrategy<P>>)
            }),
        }
    }

    /// Candidate sharing one strategy across every reader it builds.
    pub fn shared(name: impl Into<String>, strategy: Arc<dyn ReadingStrategy<P>>) -> Self {
        Self { name: name.into(), construct: Box::new(move || Ok(Arc::clone(&strategy))) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn construct(&self) -> Result<Arc<dyn ReadingStrategy<P>>> {
        (self.construct)()
    }
}

impl<P: StructuredPacket> ReaderCandidate<P> {
    pub fn structured() -> Self {
        Self::new("structured", || Ok(StructuredStrategy::<P>::self_describing()))
    }
}

impl<P: DescribedPacket + Clone> ReaderCandidate<P> {
    /// Candidate reading through the packet type's descriptor.
    ///
    /// The descriptor is validated each time the candidate is tried; a type
    /// with no registered role makes the candidate fail.
    pub fn described() -> Self {
        Self::new("described", StructuredStrategy::<P>::described)
    }
}

impl<P> fmt::Debug for ReaderCandidate<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderCandidate").field("name", &self.name).finish()
    }
}

/// Builds independent readers for packets of type `P`.
///
/// Candidates are tried in registration order: each is constructed and given
/// the packet to load. Any failure moves on to the next candidate; the default
/// candidate is tried last, so a factory with an empty registry always uses it.
pub struct PacketReaderFactory<P> {
    default: ReaderCandidate<P>,
    candidates: Vec<ReaderCandidate<P>>,
    config: PipelineConfig,
}

impl<P: 'static> PacketReaderFactory<P> {
    pub fn new(default: ReaderCandidate<P>, candidates: Vec<ReaderCandidate<P>>) -> Self {
        Self::with_config(default, candidates, PipelineConfig::default())
    }

    pub fn with_config(
        default: ReaderCandidate<P>,
        candidates: Vec<ReaderCandidate<P>>,
        config: PipelineConfig,
    ) -> Self {
        info!(
            "Reader factory for {} with {} candidates, default '{}'",
            std::any::type_name::<P>(),
            candidates.len(),
            default.name()
        );
        Self { default, candidates, config }
    }

    /// Append a candidate after the registered ones.
    pub fn register(&mut self, candidate: ReaderCandidate<P>) {
        debug!("Registered reader candidate '{}'", candidate.name());
        self.candidates.push(candidate);
    }

    pub fn candidates(&self) -> &[ReaderCandidate<P>] {
        &self.candidates
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Reader with `packet` loaded, or `None` if no candidate accepts it.
    pub fn new_instance(&self, packet: &P) -> Option<PacketReader<P>> {
        match self.try_new_instance(packet) {
            Ok(reader) => Some(reader),
            Err(e) => {
                debug!("{}", e);
                None
            }
        }
    }

    /// Like [`new_instance`](Self::new_instance), reporting why selection failed.
    pub fn try_new_instance(&self, packet: &P) -> Result<PacketReader<P>> {
        let mut attempts = 0;

        for candidate in self.candidates.iter().chain(std::iter::once(&self.default)) {
            attempts += 1;
            match self.attempt(candidate, packet) {
                Ok(reader) => {
                    debug!("Reader candidate '{}' accepted the packet", candidate.name());
                    return Ok(reader);
                }
                Err(e) => {
                    debug!("Reader candidate '{}' skipped: {}", candidate.name(), e);
                }
            }
        }

        Err(PacketError::NoReader { type_name: std::any::type_name::<P>().to_string(), attempts })
    }

    fn attempt(&self, candidate: &ReaderCandidate<P>, packet: &P) -> Result<PacketReader<P>> {
        let strategy = candidate.construct()?;
        let mut reader = PacketReader::new(strategy, &self.config);
        reader.load(packet)?;
        Ok(reader)
    }
}

impl<P: StructuredPacket> PacketReaderFactory<P> {
    /// Factory for self-describing packets with no extra candidates.
    pub fn structured() -> Self {
        Self::new(ReaderCandidate::structured(), Vec::new())
    }
}

impl<P> fmt::Debug for PacketReaderFactory<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketReaderFactory")
            .field("default", &self.default)
            .field("candidates", &self.candidates)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{PacketDescriptor, TextRole};
    use crate::packet::{Packet, SubPacket};
    use crate::reader::{ReaderState, SimpleStrategy};
    use crate::test_utils::{MeterPacket, ScriptedPacket, data_unit};

    #[test]
    fn empty_registry_uses_the_default() {
        let factory = PacketReaderFactory::<ScriptedPacket>::structured();
        let packet = ScriptedPacket::new().unit(data_unit("P1", "S", "R", 1));
        let mut reader = factory.new_instance(&packet).unwrap();

        assert_eq!(reader.strategy_name(), "structured<ScriptedPacket>");
        assert_eq!(reader.state(), ReaderState::Loaded);
        assert_eq!(reader.fragments().count(), 1);
    }

    #[test]
    fn first_accepting_candidate_wins() {
        let factory = PacketReaderFactory::new(
            ReaderCandidate::structured(),
            vec![
                ReaderCandidate::new("rejecting", || {
                    Ok(SimpleStrategy::new("rejecting", |_: &ScriptedPacket| {
                        Err(PacketError::invalid_packet("not my protocol"))
                    }))
                }),
                ReaderCandidate::new("fixed", || {
                    Ok(SimpleStrategy::new("fixed", |_: &ScriptedPacket| {
                        Ok(vec![SubPacket::builder().service_provider("fixed").build()])
                    }))
                }),
            ],
        );

        let mut reader = factory.new_instance(&ScriptedPacket::new()).unwrap();
        assert_eq!(reader.strategy_name(), "fixed");
        assert_eq!(reader.fragments().next().unwrap().service_provider_id(), "fixed");
    }

    #[test]
    fn failing_construction_is_skipped() {
        let mut factory = PacketReaderFactory::new(ReaderCandidate::structured(), Vec::new());
        factory.register(ReaderCandidate::new("broken", || {
            Err::<SimpleStrategy<ScriptedPacket>, _>(
                PacketError::invalid_packet_type::<ScriptedPacket>("missing registration"),
            )
        }));
        assert_eq!(factory.candidates().len(), 1);

        let reader = factory.new_instance(&ScriptedPacket::new()).unwrap();
        assert_eq!(reader.strategy_name(), "structured<ScriptedPacket>");
    }

    #[derive(Debug, Clone)]
    struct Faulty;

    impl Packet for Faulty {
        fn bytes(&self) -> &[u8] {
            b"faulty"
        }
    }

    impl DescribedPacket for Faulty {
        fn descriptor() -> Result<PacketDescriptor<Self>> {
            PacketDescriptor::builder()
                .text(TextRole::ServiceProviderId, |_: &Faulty| -> anyhow::Result<Option<String>> {
                    panic!("accessor bug")
                })
                .build()
        }
    }

    #[test]
    fn panicking_descriptor_is_skipped() {
        let factory = PacketReaderFactory::new(ReaderCandidate::<Faulty>::described(), Vec::new());
        assert!(factory.new_instance(&Faulty).is_none());

        let fallback = ReaderCandidate::new("fallback", || {
            Ok(SimpleStrategy::new("fallback", |packet: &Faulty| {
                let raw = packet.bytes().to_vec();
                Ok(vec![SubPacket::builder().service_provider("raw").data(raw).build()])
            }))
        });
        let factory = PacketReaderFactory::new(fallback, vec![ReaderCandidate::described()]);
        let mut reader = factory.new_instance(&Faulty).unwrap();
        assert_eq!(reader.strategy_name(), "fallback");
        assert_eq!(reader.fragments().next().unwrap().service_provider_id(), "raw");
    }

    #[test]
    fn every_failure_yields_none() {
        let factory = PacketReaderFactory::<ScriptedPacket>::structured();
        assert!(factory.new_instance(&ScriptedPacket::unreadable()).is_none());

        match factory.try_new_instance(&ScriptedPacket::unreadable()) {
            Err(PacketError::NoReader { type_name, attempts }) => {
                assert!(type_name.contains("ScriptedPacket"));
                assert_eq!(attempts, 1);
            }
            other => panic!("Expected NoReader, got {other:?}"),
        }
    }

    #[test]
    fn instances_are_independent() {
        let factory =
            PacketReaderFactory::new(ReaderCandidate::<MeterPacket>::described(), Vec::new());
        let mut first =
            factory.new_instance(&MeterPacket::new("m1").reading("p", "a", 1, 5)).unwrap();
        let mut second =
            factory.new_instance(&MeterPacket::new("m2").reading("p", "a", 2, 5)).unwrap();

        assert_eq!(second.fragments().next().unwrap().service_provider_id(), "m2");
        assert_eq!(first.fragments().next().unwrap().service_provider_id(), "m1");
        assert_ne!(format!("{first:?}"), format!("{second:?}"));
    }

    #[test]
    fn shared_candidate_reuses_its_strategy() {
        let strategy: Arc<dyn ReadingStrategy<ScriptedPacket>> =
            Arc::new(StructuredStrategy::self_describing());
        let candidate = ReaderCandidate::shared("shared", Arc::clone(&strategy));
        let factory = PacketReaderFactory::new(candidate, Vec::new());

        let first = factory.new_instance(&ScriptedPacket::new()).unwrap();
        let second = factory.new_instance(&ScriptedPacket::new()).unwrap();
        assert_eq!(Arc::strong_count(&strategy), 4);

        drop((first, second));
        assert_eq!(Arc::strong_count(&strategy), 2);
    }
}
