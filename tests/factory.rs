//! Reader selection and fragment assembly properties

use proptest::prelude::*;
use southbound::adapters::{DescribedPacket, PacketDescriptor};
use southbound::packet::VecSource;
use southbound::reader::{
    PacketReaderFactory, ReaderCandidate, ReaderState, SimpleStrategy, StructuredStrategy,
};
use southbound::{
    Packet, PacketError, PairCollection, Result, StructuredPacket, SubPacket, SubPacketSource,
};

#[derive(Debug, Clone)]
struct Units(Vec<SubPacket>);

impl Packet for Units {
    fn bytes(&self) -> &[u8] {
        &[]
    }
}

impl StructuredPacket for Units {
    fn sub_packets(&self) -> Result<Box<dyn SubPacketSource>> {
        if self.0.is_empty() {
            return Err(PacketError::invalid_packet("no units"));
        }
        Ok(Box::new(VecSource::new(self.0.clone())))
    }
}

/// Packet type that registers no role at all.
#[derive(Debug, Clone)]
struct Opaque;

impl Packet for Opaque {
    fn bytes(&self) -> &[u8] {
        b"opaque"
    }
}

impl DescribedPacket for Opaque {
    fn descriptor() -> Result<PacketDescriptor<Self>> {
        PacketDescriptor::builder().build()
    }
}

fn unit(device: &str, resource: &str, value: i64) -> SubPacket {
    SubPacket::builder()
        .service_provider(device)
        .service("svc")
        .resource(resource)
        .data(value)
        .build()
}

#[test]
fn default_candidate_serves_an_empty_registry() {
    let factory = PacketReaderFactory::<Units>::structured();
    assert!(factory.candidates().is_empty());

    let reader = factory.new_instance(&Units(vec![unit("d", "r", 1)])).unwrap();
    assert_eq!(reader.state(), ReaderState::Loaded);
    assert_eq!(reader.strategy_name(), "structured<Units>");
}

#[test]
fn registered_candidates_take_precedence_over_the_default() {
    let mut factory = PacketReaderFactory::<Units>::structured();
    factory.register(ReaderCandidate::new("doubling", || {
        Ok(SimpleStrategy::new("doubling", |packet: &Units| {
            Ok(packet.0.iter().flat_map(|u| [u.clone(), u.clone()]).collect())
        }))
    }));

    let mut reader = factory.new_instance(&Units(vec![unit("d", "r", 1)])).unwrap();
    assert_eq!(reader.strategy_name(), "doubling");
    let fragment = reader.fragments().next().unwrap();
    assert_eq!(fragment.resource_count(), 2);
}

#[test]
fn descriptor_without_roles_never_builds_a_reader() {
    assert!(matches!(
        StructuredStrategy::<Opaque>::described(),
        Err(PacketError::InvalidPacketType { .. })
    ));

    let factory = PacketReaderFactory::new(ReaderCandidate::<Opaque>::described(), Vec::new());
    assert!(factory.new_instance(&Opaque).is_none());
}

#[test]
fn failed_selection_counts_every_attempt() {
    let factory = PacketReaderFactory::new(
        ReaderCandidate::<Units>::structured(),
        vec![ReaderCandidate::structured(), ReaderCandidate::structured()],
    );

    match factory.try_new_instance(&Units(Vec::new())) {
        Err(PacketError::NoReader { attempts, .. }) => assert_eq!(attempts, 3),
        other => panic!("Expected NoReader, got {other:?}"),
    }
}

fn runs(devices: &[u8]) -> usize {
    devices.windows(2).filter(|w| w[0] != w[1]).count() + usize::from(!devices.is_empty())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn one_fragment_per_run_of_devices(devices in prop::collection::vec(0u8..3, 1..24)) {
        let units: Vec<_> = devices
            .iter()
            .enumerate()
            .map(|(i, d)| unit(&format!("dev-{d}"), &format!("r{i}"), i as i64))
            .collect();

        let factory = PacketReaderFactory::<Units>::structured();
        let mut reader = factory.new_instance(&Units(units)).unwrap();
        let fragments: Vec<_> = reader.fragments().collect();

        prop_assert_eq!(fragments.len(), runs(&devices));
        let resources: usize = fragments.iter().map(|f| f.resource_count()).sum();
        prop_assert_eq!(resources, devices.len());
        prop_assert!(reader.end().is_some_and(|end| end.is_exhausted()));
    }

    #[test]
    fn treating_every_pair_empties_the_fragment(count in 1usize..12) {
        let units: Vec<_> = (0..count).map(|i| unit("dev", "r", i as i64)).collect();
        let factory = PacketReaderFactory::<Units>::structured();
        let mut reader = factory.new_instance(&Units(units)).unwrap();

        let mut fragment = reader.fragments().next().unwrap();
        let pairs = fragment.task_id_value_pairs(PairCollection::All);
        prop_assert_eq!(pairs.len(), count);

        for pair in &pairs {
            prop_assert!(fragment.treated(pair.task_identifier()));
        }
        prop_assert!(!fragment.treated(pairs[0].task_identifier()));
        prop_assert!(fragment.is_empty());
        prop_assert!(fragment.services().is_empty());
    }
}
