//! Fragment mailbox exposed as a Stream

use futures::Stream;
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::sync::WaitForCancellationFutureOwned;

use crate::payload::PayloadFragment;
use crate::reader::Cycle;

pin_project! {
    /// Fragments of the packet loaded in a reader, as an async stream.
    ///
    /// Ends once the cycle ends; an interrupt wakes a pending poll and ends
    /// the stream with [`StreamEnd::Interrupted`](crate::reader::StreamEnd).
    pub struct FragmentStream<'a> {
        cycle: Option<&'a mut Cycle>,
        #[pin]
        cancelled: Option<WaitForCancellationFutureOwned>,
    }
}

impl<'a> FragmentStream<'a> {
    pub(crate) fn new(cycle: Option<&'a mut Cycle>) -> Self {
        let cancelled = cycle.as_ref().map(|cycle| cycle.cancellation().cancelled_owned());
        Self { cycle, cancelled }
    }
}

impl Stream for FragmentStream<'_> {
    type Item = PayloadFragment;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<PayloadFragment>> {
        let this = self.project();
        let Some(cycle) = this.cycle.as_mut() else {
            return Poll::Ready(None);
        };
        if cycle.is_finished() {
            return Poll::Ready(None);
        }

        if let Some(cancelled) = this.cancelled.as_pin_mut() {
            if cancelled.poll(cx).is_ready() {
                cycle.interrupt();
                return Poll::Ready(None);
            }
        }

        cycle.poll_recv(cx)
    }
}
