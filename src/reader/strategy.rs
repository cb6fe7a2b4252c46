//! Reading strategies turning packets into structural units

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error};

use super::worker::panic_message;
use crate::adapters::{DescribedPacket, DescribedUnits, PacketDescriptor};
use crate::packet::{Packet, StructuredPacket, SubPacket, SubPacketSource, VecSource};
use crate::{PacketError, Result};

/// Interpretation of a packet type as a sequence of structural units.
///
/// A strategy is shared by every reader built from it and must not keep
/// per-packet state; per-packet state lives in the returned source.
pub trait ReadingStrategy<P>: Send + Sync {
    /// Name used in logs and reports.
    fn name(&self) -> &str;

    /// Open a source over the units of `packet`.
    ///
    /// Fails with [`PacketError::InvalidPacket`] if the packet cannot be
    /// interpreted by this strategy.
    fn open(&self, packet: &P) -> Result<Box<dyn SubPacketSource>>;
}

type Opener<P> = Box<dyn Fn(&P) -> Result<Box<dyn SubPacketSource>> + Send + Sync>;

/// Default strategy for packets that expose their own structure.
pub struct StructuredStrategy<P> {
    name: String,
    opener: Opener<P>,
}

impl<P: StructuredPacket> StructuredStrategy<P> {
    /// Read packets through [`StructuredPacket::sub_packets`].
    pub fn self_describing() -> Self {
        Self {
            name: format!("structured<{}>", short_type_name::<P>()),
            opener: Box::new(|packet: &P| packet.sub_packets()),
        }
    }
}

impl<P: DescribedPacket + Clone> StructuredStrategy<P> {
    /// Read packets through their registered [`PacketDescriptor`].
    ///
    /// Fails with [`PacketError::InvalidPacketType`] if the descriptor
    /// cannot be built.
    pub fn described() -> Result<Self> {
        Ok(Self::from_descriptor(Arc::new(P::descriptor()?)))
    }
}

impl<P: Packet + Clone> StructuredStrategy<P> {
    /// Read packets through an already built descriptor.
    pub fn from_descriptor(descriptor: Arc<PacketDescriptor<P>>) -> Self {
        Self {
            name: format!("described<{}>", short_type_name::<P>()),
            opener: Box::new(move |packet: &P| -> Result<Box<dyn SubPacketSource>> {
                // accessors run on the caller's thread here
                let peeked = panic::catch_unwind(AssertUnwindSafe(|| {
                    let mut units: DescribedUnits<P> = descriptor.units(packet);
                    let populated =
                        units.peek().is_some_and(|first| *first != SubPacket::default());
                    (units, populated)
                }));
                let (units, populated) = match peeked {
                    Ok(peeked) => peeked,
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        error!("Descriptor of {} panicked: {}", short_type_name::<P>(), message);
                        return Err(PacketError::invalid_packet(format!(
                            "descriptor of {} panicked: {}",
                            short_type_name::<P>(),
                            message
                        )));
                    }
                };
                if !populated {
                    return Err(PacketError::invalid_packet(format!(
                        "{} exposes no structural data",
                        short_type_name::<P>()
                    )));
                }
                Ok(Box::new(units))
            }),
        }
    }
}

impl<P: Packet> ReadingStrategy<P> for StructuredStrategy<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, packet: &P) -> Result<Box<dyn SubPacketSource>> {
        (self.opener)(packet)
    }
}

impl<P> fmt::Debug for StructuredStrategy<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuredStrategy").field("name", &self.name).finish()
    }
}

type Decoder<P> = Box<dyn Fn(&P) -> Result<Vec<SubPacket>> + Send + Sync>;

/// Protocol-specific strategy decoding a packet up front.
///
/// ```rust
/// use southbound::reader::{ReadingStrategy, SimpleStrategy};
/// use southbound::{BytesPacket, Packet, PacketError, SubPacket};
///
/// let strategy = SimpleStrategy::new("csv", |packet: &BytesPacket| {
///     let text = std::str::from_utf8(packet.bytes())
///         .map_err(|e| PacketError::invalid_packet_with_source("not UTF-8", Box::new(e)))?;
///     Ok(text
///         .lines()
///         .filter_map(|line| line.split_once(','))
///         .map(|(device, value)| {
///             SubPacket::builder().service_provider(device).data(value).build()
///         })
///         .collect())
/// });
///
/// assert_eq!(strategy.name(), "csv");
/// assert!(strategy.open(&BytesPacket::new(b"dev-1,20".to_vec())).is_ok());
/// assert!(strategy.open(&BytesPacket::new(vec![0xff, 0xfe])).is_err());
/// ```
pub struct SimpleStrategy<P> {
    name: String,
    decoder: Decoder<P>,
}

impl<P: Packet> SimpleStrategy<P> {
    pub fn new<F>(name: impl Into<String>, decoder: F) -> Self
    where
        F: Fn(&P) -> Result<Vec<SubPacket>> + Send + Sync + 'static,
    {
        Self { name: name.into(), decoder: Box::new(decoder) }
    }
}

impl<P: Packet> ReadingStrategy<P> for SimpleStrategy<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, packet: &P) -> Result<Box<dyn SubPacketSource>> {
        let units = (self.decoder)(packet)?;
        debug!("Strategy '{}' decoded {} units", self.name, units.len());
        Ok(Box::new(VecSource::new(units)))
    }
}

impl<P> fmt::Debug for SimpleStrategy<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleStrategy").field("name", &self.name).finish()
    }
}

fn short_type_name<P>() -> &'static str {
    let full = std::any::type_name::<P>();
    full.rsplit("::").next().unwrap_or(full)
}
