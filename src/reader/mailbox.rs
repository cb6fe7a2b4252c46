//! Single-slot handoff between a reader worker and its consumer

use futures::Stream;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::state::{ReaderState, StateCell};
use crate::PacketError;
use crate::payload::PayloadFragment;

/// Capacity of the handoff slot: one in-flight fragment at a time.
pub(crate) const MAILBOX_CAPACITY: usize = 1;

/// Message published by the worker.
#[derive(Debug)]
pub(crate) enum Mailbox {
    Fragment(PayloadFragment),
    End(StreamEnd),
}

/// Why a parse cycle stopped producing fragments.
#[derive(Debug)]
pub enum StreamEnd {
    /// Every structural unit of the packet was consumed
    Exhausted,
    /// A malformed terminator unit stopped the cycle
    Terminated(PacketError),
    /// The packet content could not be interpreted further
    Failed(PacketError),
    /// The consumer was interrupted while waiting
    Interrupted,
    /// The source panicked, or the worker stopped without reporting an end
    WorkerLost,
}

impl StreamEnd {
    /// True when the packet was read to its last unit.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, StreamEnd::Exhausted)
    }

    /// Error attached to the end, if any.
    pub fn error(&self) -> Option<&PacketError> {
        match self {
            StreamEnd::Terminated(e) | StreamEnd::Failed(e) => Some(e),
            StreamEnd::Exhausted | StreamEnd::Interrupted | StreamEnd::WorkerLost => None,
        }
    }
}

impl fmt::Display for StreamEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamEnd::Exhausted => f.write_str("exhausted"),
            StreamEnd::Terminated(e) => write!(f, "terminated: {}", e),
            StreamEnd::Failed(e) => write!(f, "failed: {}", e),
            StreamEnd::Interrupted => f.write_str("interrupted"),
            StreamEnd::WorkerLost => f.write_str("worker lost"),
        }
    }
}

/// Handle interrupting a consumer waiting on a parse cycle.
///
/// An interrupted consumer observes [`StreamEnd::Interrupted`] and the end of
/// iteration, never an error.
#[derive(Debug, Clone)]
pub struct Interrupt {
    token: CancellationToken,
}

impl Interrupt {
    pub fn interrupt(&self) {
        self.token.cancel();
    }

    pub fn is_interrupted(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Consumer side of one parse cycle.
#[derive(Debug)]
pub(crate) struct Cycle {
    messages: ReceiverStream<Mailbox>,
    cancel: CancellationToken,
    state: StateCell,
    end: Option<StreamEnd>,
    delivered: usize,
}

impl Cycle {
    /// Open a cycle; returns the worker-side sender with it.
    pub fn open(state: StateCell) -> (Self, mpsc::Sender<Mailbox>, CancellationToken) {
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        let cancel = CancellationToken::new();
        state.set(ReaderState::Loaded);

        let cycle = Self {
            messages: ReceiverStream::new(rx),
            cancel: cancel.clone(),
            state,
            end: None,
            delivered: 0,
        };
        (cycle, tx, cancel)
    }

    pub fn interrupt_handle(&self) -> Interrupt {
        Interrupt { token: self.cancel.clone() }
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn end(&self) -> Option<&StreamEnd> {
        self.end.as_ref()
    }

    /// Move the end out; the cycle must not be polled afterwards.
    pub fn take_end(&mut self) -> Option<StreamEnd> {
        self.end.take()
    }

    pub fn is_finished(&self) -> bool {
        self.end.is_some()
    }

    /// Block the calling thread until a fragment or the end is available.
    pub fn recv_blocking(&mut self) -> Option<PayloadFragment> {
        if self.is_finished() {
            return None;
        }
        self.state.set(ReaderState::Parsing);

        let messages = &mut self.messages;
        let cancel = &self.cancel;
        let received = futures::executor::block_on(async {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                message = messages.as_mut().recv() => Some(message),
            }
        });

        match received {
            Some(message) => self.accept(message),
            None => self.finish(StreamEnd::Interrupted),
        }
    }

    /// Poll for a fragment or the end without blocking.
    pub fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<PayloadFragment>> {
        if self.is_finished() {
            return Poll::Ready(None);
        }
        if self.cancel.is_cancelled() {
            return Poll::Ready(self.finish(StreamEnd::Interrupted));
        }
        self.state.set(ReaderState::Parsing);

        match Pin::new(&mut self.messages).poll_next(cx) {
            Poll::Ready(message) => Poll::Ready(self.accept(message)),
            Poll::Pending => Poll::Pending,
        }
    }

    /// Record the end of the cycle from the consumer side.
    pub fn interrupt(&mut self) {
        if !self.is_finished() {
            self.finish(StreamEnd::Interrupted);
        }
    }

    fn accept(&mut self, message: Option<Mailbox>) -> Option<PayloadFragment> {
        match message {
            Some(Mailbox::Fragment(fragment)) => {
                self.delivered += 1;
                trace!(
                    "Fragment {} for '{}' handed to consumer",
                    self.delivered,
                    fragment.service_provider_id()
                );
                self.state.set(ReaderState::FragmentReady);
                Some(fragment)
            }
            Some(Mailbox::End(end)) => self.finish(end),
            None => self.finish(StreamEnd::WorkerLost),
        }
    }

    fn finish(&mut self, end: StreamEnd) -> Option<PayloadFragment> {
        debug!("Parse cycle ended after {} fragments: {}", self.delivered, end);
        self.end = Some(end);
        self.state.set(ReaderState::EndOfStream);
        self.cancel.cancel();
        self.messages.close();
        None
    }
}

impl Drop for Cycle {
    fn drop(&mut self) {
        // release a worker blocked on the slot
        self.cancel.cancel();
    }
}
