//! Reader lifecycle states

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a [`PacketReader`](super::PacketReader).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReaderState {
    /// No packet loaded
    Idle,
    /// Packet handed to the worker, nothing consumed yet
    Loaded,
    /// Consumer waiting for the worker
    Parsing,
    /// A fragment was handed to the consumer
    FragmentReady,
    /// The current packet yields nothing more
    EndOfStream,
}

impl ReaderState {
    const fn to_u8(self) -> u8 {
        match self {
            ReaderState::Idle => 0,
            ReaderState::Loaded => 1,
            ReaderState::Parsing => 2,
            ReaderState::FragmentReady => 3,
            ReaderState::EndOfStream => 4,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => ReaderState::Loaded,
            2 => ReaderState::Parsing,
            3 => ReaderState::FragmentReady,
            4 => ReaderState::EndOfStream,
            _ => ReaderState::Idle,
        }
    }

    /// True if a new packet may be loaded without cancelling a cycle.
    pub fn accepts_load(self) -> bool {
        matches!(self, ReaderState::Idle | ReaderState::EndOfStream)
    }
}

impl fmt::Display for ReaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReaderState::Idle => "idle",
            ReaderState::Loaded => "loaded",
            ReaderState::Parsing => "parsing",
            ReaderState::FragmentReady => "fragment-ready",
            ReaderState::EndOfStream => "end-of-stream",
        };
        f.write_str(name)
    }
}

/// State shared between a reader and the consumers of its cycles.
#[derive(Debug, Clone)]
pub(crate) struct StateCell(Arc<AtomicU8>);

impl StateCell {
    pub fn new(state: ReaderState) -> Self {
        Self(Arc::new(AtomicU8::new(state.to_u8())))
    }

    pub fn get(&self) -> ReaderState {
        ReaderState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: ReaderState) {
        self.0.store(state.to_u8(), Ordering::Release);
    }
}
