//! Flattening fragment streams into task pairs

use futures::{Stream, ready};
use pin_project_lite::pin_project;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::payload::{PairCollection, PayloadFragment};
use crate::types::TaskIdValuePair;

/// Extension trait converting any fragment stream into its task pairs
pub trait TaskPairsExt: Stream<Item = PayloadFragment> {
    /// Emit the pairs of each fragment, in fragment then service order.
    fn task_pairs(self, collection: PairCollection) -> TaskPairs<Self>
    where
        Self: Sized,
    {
        TaskPairs::new(self, collection)
    }
}

impl<T: Stream<Item = PayloadFragment>> TaskPairsExt for T {}

pin_project! {
    /// Stream combinator returned by [`TaskPairsExt::task_pairs`]
    pub struct TaskPairs<S> {
        #[pin]
        stream: S,
        collection: PairCollection,
        pending: VecDeque<TaskIdValuePair>,
    }
}

impl<S> TaskPairs<S> {
    pub fn new(stream: S, collection: PairCollection) -> Self {
        Self { stream, collection, pending: VecDeque::new() }
    }
}

impl<S: Stream<Item = PayloadFragment>> Stream for TaskPairs<S> {
    type Item = TaskIdValuePair;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<TaskIdValuePair>> {
        let mut this = self.project();

        loop {
            if let Some(pair) = this.pending.pop_front() {
                return Poll::Ready(Some(pair));
            }

            match ready!(this.stream.as_mut().poll_next(cx)) {
                Some(fragment) => {
                    this.pending.extend(fragment.task_id_value_pairs(*this.collection))
                }
                None => return Poll::Ready(None),
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (_, upper) = self.stream.size_hint();
        (self.pending.len(), upper.filter(|n| *n == 0).map(|_| self.pending.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{PayloadResourceFragment, PayloadServiceFragment};
    use crate::types::{CommandType, Value};
    use futures::StreamExt;

    fn fragment(provider: &str, values: &[i64]) -> PayloadFragment {
        let mut service =
            PayloadServiceFragment::new(Some(CommandType::Set), Some("S".into()), Some("R".into()));
        for (i, value) in values.iter().enumerate() {
            service.push(PayloadResourceFragment::new(
                Some(format!("a{i}")),
                None,
                Value::Int(*value),
                10,
            ));
        }
        let mut fragment = PayloadFragment::new(provider, None);
        fragment.add_service(service);
        fragment
    }

    #[tokio::test]
    async fn pairs_follow_fragment_order() {
        let fragments = futures::stream::iter(vec![fragment("P1", &[1, 2]), fragment("P2", &[3])]);
        let pairs: Vec<_> = fragments.task_pairs(PairCollection::All).collect().await;

        let ids: Vec<_> = pairs.iter().map(|p| p.task_identifier().to_string()).collect();
        assert_eq!(ids, vec!["P1/SET/S/R/a0", "P1/SET/S/R/a1", "P2/SET/S/R/a0"]);
        assert_eq!(pairs[2].value(), &Value::Int(3));
    }

    #[tokio::test]
    async fn first_only_takes_one_pair_per_service() {
        let fragments = futures::stream::iter(vec![fragment("P1", &[1, 2, 3])]);
        let pairs: Vec<_> = fragments.task_pairs(PairCollection::FirstOnly).collect().await;
        assert_eq!(pairs.len(), 1);
    }

    #[tokio::test]
    async fn empty_fragments_are_skipped() {
        let fragments =
            futures::stream::iter(vec![PayloadFragment::new("P0", None), fragment("P1", &[7])]);
        let pairs: Vec<_> = fragments.task_pairs(PairCollection::All).collect().await;
        assert_eq!(pairs.len(), 1);
    }
}
