//! Fixture packets shared by unit tests and benchmarks
//!
//! Two packet shapes cover both default reading modes:
//! - [`MeterPacket`] registers a descriptor and iterates over its readings
//! - [`ScriptedPacket`] describes itself and can fail, panic or stall on demand

#![cfg(any(test, feature = "benchmark"))]

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

use crate::adapters::{DescribedPacket, FlagRole, PacketDescriptor, TextRole};
use crate::packet::{Packet, StructuredPacket, SubPacket, SubPacketSource};
use crate::types::{CommandType, Value};
use crate::{PacketError, Result};

/// One reading carried by a [`MeterPacket`].
#[derive(Debug, Clone, PartialEq)]
pub struct MeterReading {
    pub service: String,
    pub resource: String,
    pub attribute: Option<String>,
    pub value: Value,
    pub timestamp: i64,
}

/// Smart meter report holding several readings for one device.
#[derive(Debug, Clone)]
pub struct MeterPacket {
    pub profile: Option<String>,
    pub device: String,
    pub hello: bool,
    pub readings: Vec<MeterReading>,
    cursor: usize,
    raw: Vec<u8>,
}

impl MeterPacket {
    pub fn new(device: impl Into<String>) -> Self {
        let device = device.into();
        Self {
            profile: None,
            raw: device.as_bytes().to_vec(),
            device,
            hello: false,
            readings: Vec::new(),
            cursor: 0,
        }
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn hello(mut self) -> Self {
        self.hello = true;
        self
    }

    pub fn reading(
        mut self,
        service: &str,
        resource: &str,
        value: impl Into<Value>,
        timestamp: i64,
    ) -> Self {
        self.readings.push(MeterReading {
            service: service.to_string(),
            resource: resource.to_string(),
            attribute: None,
            value: value.into(),
            timestamp,
        });
        self
    }

    /// Reading naming an explicit attribute.
    pub fn attribute_reading(
        mut self,
        service: &str,
        resource: &str,
        attribute: &str,
        value: impl Into<Value>,
        timestamp: i64,
    ) -> Self {
        self.readings.push(MeterReading {
            service: service.to_string(),
            resource: resource.to_string(),
            attribute: Some(attribute.to_string()),
            value: value.into(),
            timestamp,
        });
        self
    }

    fn current(&self) -> Option<&MeterReading> {
        self.readings.get(self.cursor)
    }
}

impl Packet for MeterPacket {
    fn bytes(&self) -> &[u8] {
        &self.raw
    }
}

impl DescribedPacket for MeterPacket {
    fn descriptor() -> Result<PacketDescriptor<Self>> {
        PacketDescriptor::builder()
            .text(TextRole::ProfileId, |p: &MeterPacket| Ok(p.profile.clone()))
            .text(TextRole::ServiceProviderId, |p: &MeterPacket| Ok(Some(p.device.clone())))
            .text(TextRole::ServiceId, |p: &MeterPacket| {
                Ok(p.current().map(|r| r.service.clone()))
            })
            .text(TextRole::ResourceId, |p: &MeterPacket| {
                Ok(p.current().map(|r| r.resource.clone()))
            })
            .text(TextRole::AttributeId, |p: &MeterPacket| {
                Ok(p.current().and_then(|r| r.attribute.clone()))
            })
            .command(|p: &MeterPacket| Ok(p.current().map(|_| CommandType::Set)))
            .data(|p: &MeterPacket| Ok(p.current().map(|r| r.value.clone())))
            .timestamp(|p: &MeterPacket| Ok(p.current().map(|r| r.timestamp)))
            .flag(FlagRole::Hello, |p: &MeterPacket| Ok(p.hello))
            .iteration(|p: &mut MeterPacket| {
                p.cursor += 1;
                Ok(p.cursor < p.readings.len())
            })
            .build()
    }
}

/// Latch holding a source back until released.
#[derive(Debug, Clone, Default)]
pub struct Gate {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self) {
        let (lock, ready) = &*self.inner;
        if let Ok(mut open) = lock.lock() {
            *open = true;
            ready.notify_all();
        }
    }

    pub fn wait(&self) {
        let (lock, ready) = &*self.inner;
        let Ok(mut open) = lock.lock() else {
            return;
        };
        while !*open {
            open = match ready.wait(open) {
                Ok(guard) => guard,
                Err(_) => return,
            };
        }
    }
}

/// Scripted behaviour of a [`ScriptedPacket`] source.
#[derive(Debug, Clone)]
pub enum Step {
    Unit(SubPacket),
    Fail(String),
    Panic(String),
    Wait(Gate),
}

/// Self-describing packet replaying a script of units and faults.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPacket {
    steps: Vec<Step>,
    unreadable: bool,
}

impl ScriptedPacket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Packet whose structure cannot be opened at all.
    pub fn unreadable() -> Self {
        Self { steps: Vec::new(), unreadable: true }
    }

    pub fn unit(mut self, unit: SubPacket) -> Self {
        self.steps.push(Step::Unit(unit));
        self
    }

    pub fn units(mut self, units: impl IntoIterator<Item = SubPacket>) -> Self {
        self.steps.extend(units.into_iter().map(Step::Unit));
        self
    }

    pub fn fail(mut self, reason: &str) -> Self {
        self.steps.push(Step::Fail(reason.to_string()));
        self
    }

    pub fn panic(mut self, message: &str) -> Self {
        self.steps.push(Step::Panic(message.to_string()));
        self
    }

    pub fn wait(mut self, gate: &Gate) -> Self {
        self.steps.push(Step::Wait(gate.clone()));
        self
    }
}

impl Packet for ScriptedPacket {
    fn bytes(&self) -> &[u8] {
        &[]
    }
}

impl StructuredPacket for ScriptedPacket {
    fn sub_packets(&self) -> Result<Box<dyn SubPacketSource>> {
        if self.unreadable {
            return Err(PacketError::invalid_packet("scripted packet is unreadable"));
        }
        Ok(Box::new(ScriptSource { steps: self.steps.iter().cloned().collect() }))
    }
}

struct ScriptSource {
    steps: VecDeque<Step>,
}

impl SubPacketSource for ScriptSource {
    fn next_unit(&mut self) -> Result<Option<SubPacket>> {
        while let Some(step) = self.steps.pop_front() {
            match step {
                Step::Unit(unit) => return Ok(Some(unit)),
                Step::Fail(reason) => return Err(PacketError::invalid_packet(reason)),
                Step::Panic(message) => panic!("{}", message),
                Step::Wait(gate) => gate.wait(),
            }
        }
        Ok(None)
    }
}

/// Unit addressing `provider/service/resource` with a data point.
pub fn data_unit(
    provider: &str,
    service: &str,
    resource: &str,
    data: impl Into<Value>,
) -> SubPacket {
    SubPacket::builder()
        .service_provider(provider)
        .service(service)
        .resource(resource)
        .data(data)
        .timestamp(1_000)
        .build()
}

/// Packet of `devices` devices with `readings` data units each.
pub fn bulk_packet(devices: usize, readings: usize) -> ScriptedPacket {
    ScriptedPacket::new().units((0..devices).flat_map(|device| {
        (0..readings).map(move |reading| {
            data_unit(
                &format!("device-{device}"),
                "meter",
                &format!("channel-{reading}"),
                reading as i64,
            )
        })
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meter_descriptor_covers_its_readings() {
        let descriptor = Arc::new(MeterPacket::descriptor().unwrap());
        let packet = MeterPacket::new("meter-1")
            .reading("power", "active", 12.5, 10)
            .attribute_reading("power", "active", "unit", "kW", 10);

        let units: Vec<_> = descriptor.units(&packet).collect();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].attribute_id(), None);
        assert_eq!(units[1].attribute_id(), Some("unit"));
        assert_eq!(units[1].command(), Some(CommandType::Set));
    }

    #[test]
    fn script_replays_units_then_faults() {
        let mut source = ScriptedPacket::new()
            .unit(data_unit("P1", "S", "R", 1))
            .fail("broken trailer")
            .sub_packets()
            .unwrap();

        assert!(source.next_unit().unwrap().is_some());
        assert!(source.next_unit().is_err());
        assert!(source.next_unit().unwrap().is_none());
    }

    #[test]
    fn open_gate_releases_waiters() {
        let gate = Gate::new();
        let waiter = {
            let gate = gate.clone();
            std::thread::spawn(move || gate.wait())
        };
        gate.open();
        waiter.join().unwrap();
    }

    #[test]
    fn bulk_packet_has_every_unit() {
        let mut source = bulk_packet(3, 4).sub_packets().unwrap();
        let mut count = 0;
        while source.next_unit().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 12);
    }
}
