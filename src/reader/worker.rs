//! Dedicated parse worker owned by one reader

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::assembler::FragmentAssembler;
use super::mailbox::{Mailbox, StreamEnd};
use crate::packet::SubPacketSource;
use crate::{PacketError, Result};

static WORKER_SEQUENCE: AtomicUsize = AtomicUsize::new(0);

/// One parse cycle handed to the worker.
pub(crate) struct ParseJob {
    pub source: Box<dyn SubPacketSource>,
    pub mailbox: mpsc::Sender<Mailbox>,
    pub cancel: CancellationToken,
}

/// Handle to a worker thread.
///
/// Dropping the handle closes the job channel; the thread finishes its
/// current job and exits without being joined.
#[derive(Debug)]
pub(crate) struct Worker {
    name: String,
    jobs: mpsc::UnboundedSender<ParseJob>,
}

impl Worker {
    /// Spawn a worker thread named `<prefix>-<n>`.
    pub fn spawn(prefix: &str) -> Result<Self> {
        let name = format!("{}-{}", prefix, WORKER_SEQUENCE.fetch_add(1, Ordering::Relaxed));
        let (jobs, receiver) = mpsc::unbounded_channel();

        let thread_name = name.clone();
        thread::Builder::new()
            .name(name.clone())
            .spawn(move || run(thread_name, receiver))
            .map_err(|e| PacketError::worker(format!("failed to spawn '{}': {}", name, e)))?;

        debug!("Spawned reader worker '{}'", name);
        Ok(Self { name, jobs })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn submit(&self, job: ParseJob) -> Result<()> {
        self.jobs.send(job).map_err(|_| {
            PacketError::worker(format!("worker '{}' is no longer running", self.name))
        })
    }
}

fn run(name: String, mut jobs: mpsc::UnboundedReceiver<ParseJob>) {
    info!("Reader worker '{}' started", name);
    let mut cycles = 0u64;

    while let Some(job) = jobs.blocking_recv() {
        cycles += 1;
        trace!("Worker '{}' starting cycle {}", name, cycles);

        // the job (and its mailbox sender) is dropped on unwind
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || parse(job))) {
            error!(
                "Worker '{}' panicked during cycle {}: {}",
                name,
                cycles,
                panic_message(payload.as_ref())
            );
        }
    }

    info!("Reader worker '{}' stopped after {} cycles", name, cycles);
}

fn parse(job: ParseJob) {
    let ParseJob { mut source, mailbox, cancel } = job;
    let mut assembler = FragmentAssembler::new();
    let mut index = 0usize;

    let end = loop {
        if cancel.is_cancelled() {
            debug!("Parse cycle cancelled after {} units", index);
            return;
        }

        let unit = match panic::catch_unwind(AssertUnwindSafe(|| source.next_unit())) {
            Ok(Ok(Some(unit))) => unit,
            Ok(Ok(None)) => {
                trace!("Source exhausted after {} units", index);
                break StreamEnd::Exhausted;
            }
            Ok(Err(e)) => {
                warn!("Failed to read unit {}: {}", index, e);
                break StreamEnd::Failed(e);
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("Source panicked reading unit {}: {}", index, message);
                break StreamEnd::WorkerLost;
            }
        };

        match assembler.parse(index, unit) {
            Ok(Some(fragment)) => {
                if !publish(&mailbox, &cancel, Mailbox::Fragment(fragment)) {
                    return;
                }
            }
            Ok(None) => {}
            Err(e) => {
                debug!("Unit {} ends the stream: {}", index, e);
                break StreamEnd::Terminated(e);
            }
        }
        index += 1;
    };

    if let Some(fragment) = assembler.finish() {
        if !publish(&mailbox, &cancel, Mailbox::Fragment(fragment)) {
            return;
        }
    }
    publish(&mailbox, &cancel, Mailbox::End(end));
}

/// Wait for the slot to free up; false if the consumer is gone.
fn publish(mailbox: &mpsc::Sender<Mailbox>, cancel: &CancellationToken, message: Mailbox) -> bool {
    let sent = futures::executor::block_on(async {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            sent = mailbox.send(message) => sent.is_ok(),
        }
    });

    if !sent {
        debug!("Consumer left the parse cycle, dropping remaining output");
    }
    sent
}

pub(super) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
