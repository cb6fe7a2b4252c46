//! Packet readers and their factory.
//!
//! A [`PacketReader`] turns one loaded packet into a sequence of
//! [`PayloadFragment`]s. Parsing runs on a dedicated worker thread owned by
//! the reader; fragments are handed over through a single-slot mailbox, so
//! the worker never runs more than one fragment ahead of the consumer.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──load──▶ Loaded ──next──▶ Parsing ──▶ FragmentReady ──next──▶ ...
//!                                    │
//!                                    └──────▶ EndOfStream ──load──▶ Loaded
//! ```
//!
//! The end of a cycle is a value, [`StreamEnd`], observed exactly once:
//! - `Exhausted` when the packet was read to its last unit
//! - `Terminated` when a unit without a service provider stopped the cycle
//! - `Failed` when the source could not be read further
//! - `Interrupted` when the consumer was interrupted while waiting
//! - `WorkerLost` when the source panicked or the worker stopped silently
//!
//! # Example
//!
//! ```rust
//! use southbound::packet::{Packet, StructuredPacket, SubPacket, SubPacketSource, VecSource};
//! use southbound::reader::{PacketReader, StreamEnd, StructuredStrategy};
//! use southbound::{PipelineConfig, Result};
//!
//! struct Report(Vec<SubPacket>);
//!
//! impl Packet for Report {
//!     fn bytes(&self) -> &[u8] {
//!         &[]
//!     }
//! }
//!
//! impl StructuredPacket for Report {
//!     fn sub_packets(&self) -> Result<Box<dyn SubPacketSource>> {
//!         Ok(Box::new(VecSource::new(self.0.clone())))
//!     }
//! }
//!
//! let config = PipelineConfig::default();
//! let mut reader = PacketReader::with_strategy(StructuredStrategy::self_describing(), &config);
//! let report = Report(vec![
//!     SubPacket::builder().service_provider("P1").service("S1").resource("R1").data(5).build(),
//! ]);
//!
//! reader.load(&report)?;
//! let fragments: Vec<_> = reader.fragments().collect();
//! assert_eq!(fragments.len(), 1);
//! assert!(matches!(reader.end(), Some(StreamEnd::Exhausted)));
//! # Ok::<(), southbound::PacketError>(())
//! ```

mod assembler;
mod factory;
mod mailbox;
mod state;
mod strategy;
mod worker;

pub use factory::{PacketReaderFactory, ReaderCandidate};
pub use mailbox::{Interrupt, StreamEnd};
pub use state::ReaderState;
pub use strategy::{ReadingStrategy, SimpleStrategy, StructuredStrategy};

pub(crate) use mailbox::Cycle;

use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::config::PipelineConfig;
use crate::payload::PayloadFragment;
use crate::stream::FragmentStream;
use crate::{PacketError, Result};
use state::StateCell;
use worker::{ParseJob, Worker};

/// Stateful reader producing payload fragments from one packet at a time.
pub struct PacketReader<P> {
    strategy: Arc<dyn ReadingStrategy<P>>,
    worker_name: String,
    worker: Option<Worker>,
    state: StateCell,
    cycle: Option<Cycle>,
}

impl<P: 'static> PacketReader<P> {
    /// Create a reader over a shared strategy.
    ///
    /// No thread is started until the first packet is loaded.
    pub fn new(strategy: Arc<dyn ReadingStrategy<P>>, config: &PipelineConfig) -> Self {
        Self {
            strategy,
            worker_name: config.worker_name.clone(),
            worker: None,
            state: StateCell::new(ReaderState::Idle),
            cycle: None,
        }
    }

    pub fn with_strategy<S>(strategy: S, config: &PipelineConfig) -> Self
    where
        S: ReadingStrategy<P> + 'static,
    {
        Self::new(Arc::new(strategy), config)
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    pub fn state(&self) -> ReaderState {
        self.state.get()
    }

    /// Load a packet and start parsing it on the worker.
    ///
    /// An unfinished previous cycle is cancelled first. Fails with
    /// [`PacketError::InvalidPacket`] if the strategy cannot interpret the
    /// packet, leaving the reader idle.
    pub fn load(&mut self, packet: &P) -> Result<()> {
        if !self.state.get().accepts_load() {
            debug!("Cancelling unfinished parse cycle of '{}'", self.strategy.name());
        }
        self.cycle = None;
        self.state.set(ReaderState::Idle);

        let source = self.strategy.open(packet).map_err(|e| match e {
            PacketError::InvalidPacket { .. } => e,
            other => PacketError::invalid_packet_with_source(
                format!("strategy '{}' cannot read the packet", self.strategy.name()),
                Box::new(other),
            ),
        })?;

        let worker = match self.worker.take() {
            Some(worker) => worker,
            None => Worker::spawn(&self.worker_name)?,
        };
        let worker = self.worker.insert(worker);

        let (cycle, mailbox, cancel) = Cycle::open(self.state.clone());
        if let Err(e) = worker.submit(ParseJob { source, mailbox, cancel }) {
            self.worker = None;
            self.state.set(ReaderState::Idle);
            return Err(e);
        }

        trace!("Packet loaded on worker '{}'", worker.name());
        self.cycle = Some(cycle);
        Ok(())
    }

    /// Blocking iterator over the fragments of the loaded packet.
    ///
    /// Yields nothing if no packet is loaded.
    pub fn fragments(&mut self) -> Fragments<'_> {
        Fragments { cycle: self.cycle.as_mut() }
    }

    /// Fragments of the loaded packet as an async stream.
    pub fn fragment_stream(&mut self) -> FragmentStream<'_> {
        FragmentStream::new(self.cycle.as_mut())
    }

    /// Handle interrupting the consumer of the current cycle.
    pub fn interrupt_handle(&self) -> Option<Interrupt> {
        self.cycle.as_ref().map(Cycle::interrupt_handle)
    }

    /// Why the current cycle ended, once it has.
    pub fn end(&self) -> Option<&StreamEnd> {
        self.cycle.as_ref().and_then(Cycle::end)
    }

    /// Consume the reader, keeping only why its last cycle ended.
    pub fn into_end(mut self) -> Option<StreamEnd> {
        self.cycle.take().and_then(|mut cycle| cycle.take_end())
    }

    /// Drop the current cycle and return to [`ReaderState::Idle`].
    pub fn reset(&mut self) {
        self.cycle = None;
        self.state.set(ReaderState::Idle);
    }
}

impl<P> fmt::Debug for PacketReader<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketReader")
            .field("strategy", &self.strategy.name())
            .field("state", &self.state.get())
            .field("worker", &self.worker.as_ref().map(Worker::name))
            .finish()
    }
}

/// Blocking iterator returned by [`PacketReader::fragments`].
///
/// Fused: once the end was observed every call returns `None`.
#[derive(Debug)]
pub struct Fragments<'a> {
    cycle: Option<&'a mut Cycle>,
}

impl Iterator for Fragments<'_> {
    type Item = PayloadFragment;

    fn next(&mut self) -> Option<PayloadFragment> {
        self.cycle.as_mut()?.recv_blocking()
    }
}

impl FusedIterator for Fragments<'_> {}
