//! Packet-to-task dispatch loop

use futures::StreamExt;
use std::fmt;
use std::pin::pin;
use tracing::{debug, info, trace, warn};

use crate::Result;
use crate::payload::PayloadFragment;
use crate::reader::{PacketReaderFactory, StreamEnd};
use crate::types::TaskIdValuePair;

/// Downstream consumer of task pairs, typically a task manager.
///
/// Implementations report whether they resolved a pair; resolved pairs are
/// marked treated on their fragment and never handed out again.
#[async_trait::async_trait]
pub trait TaskDispatcher: Send {
    /// Hand one pair over.
    ///
    /// Returns:
    /// - `Ok(true)` - The pair was resolved
    /// - `Ok(false)` - The pair was not resolved and stays untreated
    /// - `Err(e)` - Dispatch failed; processing of the packet stops
    async fn dispatch(&mut self, pair: &TaskIdValuePair) -> Result<bool>;

    /// Called before the pairs of a fragment flagged as a hello message.
    async fn device_appeared(&mut self, _fragment: &PayloadFragment) -> Result<()> {
        Ok(())
    }

    /// Called after the pairs of a fragment flagged as a goodbye message.
    async fn device_left(&mut self, _fragment: &PayloadFragment) -> Result<()> {
        Ok(())
    }
}

/// Outcome of processing one packet.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Strategy of the reader that accepted the packet
    pub strategy: String,
    pub fragments: usize,
    pub dispatched: usize,
    pub treated: usize,
    /// Resource fragments left after dispatch
    pub untreated: usize,
    pub hello: usize,
    pub goodbye: usize,
    pub end: Option<StreamEnd>,
}

impl DispatchReport {
    /// True if the packet was read to its end and every pair was treated.
    pub fn is_complete(&self) -> bool {
        self.untreated == 0 && self.end.as_ref().is_some_and(StreamEnd::is_exhausted)
    }
}

impl fmt::Display for DispatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} fragments, {}/{} pairs treated, {} left via '{}'",
            self.fragments, self.treated, self.dispatched, self.untreated, self.strategy
        )?;
        if let Some(end) = &self.end {
            write!(f, " ({})", end)?;
        }
        Ok(())
    }
}

/// Drives packets through a reader factory into a dispatcher.
pub struct Pipeline<P, D> {
    factory: PacketReaderFactory<P>,
    dispatcher: D,
    processed: u64,
}

impl<P: 'static, D: TaskDispatcher> Pipeline<P, D> {
    pub fn new(factory: PacketReaderFactory<P>, dispatcher: D) -> Self {
        info!("Pipeline started with {} reader candidates", factory.candidates().len());
        Self { factory, dispatcher, processed: 0 }
    }

    pub fn factory(&self) -> &PacketReaderFactory<P> {
        &self.factory
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }

    pub fn into_dispatcher(self) -> D {
        self.dispatcher
    }

    /// Packets processed so far.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Read one packet and dispatch every pair it yields.
    ///
    /// Fails with [`PacketError::NoReader`](crate::PacketError::NoReader) if
    /// no reader accepts the packet, or with the dispatcher's error.
    pub async fn process(&mut self, packet: &P) -> Result<DispatchReport> {
        let mut reader = self.factory.try_new_instance(packet)?;
        let config = self.factory.config();
        let collection = config.pair_collection;
        let discard_untreated = config.discard_untreated;

        self.processed += 1;
        let mut report = DispatchReport {
            strategy: reader.strategy_name().to_string(),
            ..DispatchReport::default()
        };
        debug!("Packet {} read with '{}'", self.processed, report.strategy);

        {
            let mut fragments = pin!(reader.fragment_stream());
            while let Some(mut fragment) = fragments.next().await {
                report.fragments += 1;
                if fragment.is_hello_message() {
                    report.hello += 1;
                    self.dispatcher.device_appeared(&fragment).await?;
                }

                for pair in fragment.task_id_value_pairs(collection) {
                    report.dispatched += 1;
                    let resolved = self.dispatcher.dispatch(&pair).await?;
                    if resolved && fragment.treated(pair.task_identifier()) {
                        report.treated += 1;
                    } else {
                        trace!("Task '{}' left untreated", pair.task_identifier());
                    }
                }

                if fragment.is_goodbye_message() {
                    report.goodbye += 1;
                    self.dispatcher.device_left(&fragment).await?;
                }

                let left = fragment.resource_count();
                if left > 0 {
                    report.untreated += left;
                    let device = fragment.service_provider_id();
                    if discard_untreated {
                        debug!("Discarding {} untreated resources of '{}'", left, device);
                    } else {
                        warn!("{} resources of '{}' were not treated", left, device);
                    }
                }
            }
        }

        report.end = reader.into_end();
        debug!("Packet {}: {}", self.processed, report);
        Ok(report)
    }
}

impl<P, D: fmt::Debug> fmt::Debug for Pipeline<P, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("factory", &self.factory)
            .field("dispatcher", &self.dispatcher)
            .field("processed", &self.processed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PacketError;
    use crate::config::PipelineConfig;
    use crate::packet::SubPacket;
    use crate::payload::PairCollection;
    use crate::reader::ReaderCandidate;
    use crate::test_utils::{MeterPacket, ScriptedPacket, data_unit};
    use crate::types::Value;

    #[derive(Debug, Default)]
    struct Recorder {
        pairs: Vec<TaskIdValuePair>,
        reject_suffix: Option<&'static str>,
        appeared: Vec<String>,
        left: Vec<String>,
    }

    #[async_trait::async_trait]
    impl TaskDispatcher for Recorder {
        async fn dispatch(&mut self, pair: &TaskIdValuePair) -> Result<bool> {
            self.pairs.push(pair.clone());
            Ok(self.reject_suffix.is_none_or(|suffix| !pair.task_identifier().ends_with(suffix)))
        }

        async fn device_appeared(&mut self, fragment: &PayloadFragment) -> Result<()> {
            self.appeared.push(fragment.service_provider_id().to_string());
            Ok(())
        }

        async fn device_left(&mut self, fragment: &PayloadFragment) -> Result<()> {
            self.left.push(fragment.service_provider_id().to_string());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait::async_trait]
    impl TaskDispatcher for Failing {
        async fn dispatch(&mut self, pair: &TaskIdValuePair) -> Result<bool> {
            Err(PacketError::dispatch(pair.task_identifier(), "task manager offline"))
        }
    }

    fn meter_pipeline(
        config: PipelineConfig,
        dispatcher: Recorder,
    ) -> Pipeline<MeterPacket, Recorder> {
        let factory =
            PacketReaderFactory::with_config(ReaderCandidate::described(), Vec::new(), config);
        Pipeline::new(factory, dispatcher)
    }

    #[tokio::test]
    async fn every_pair_is_dispatched_and_treated() {
        let _ = tracing_subscriber::fmt::try_init();
        let mut pipeline = meter_pipeline(PipelineConfig::default(), Recorder::default());
        let packet = MeterPacket::new("meter-1")
            .hello()
            .reading("power", "active", 1.5, 100)
            .attribute_reading("power", "active", "unit", "kW", 100);

        let report = pipeline.process(&packet).await.unwrap();

        assert_eq!(report.fragments, 1);
        assert_eq!(report.dispatched, 2);
        assert_eq!(report.treated, 2);
        assert_eq!(report.untreated, 0);
        assert_eq!(report.hello, 1);
        assert!(report.is_complete());

        let recorder = pipeline.dispatcher();
        assert_eq!(recorder.appeared, vec!["meter-1"]);
        let ids: Vec<_> = recorder.pairs.iter().map(|p| p.task_identifier()).collect();
        assert_eq!(ids, vec!["meter-1/SET/power/active/value", "meter-1/SET/power/active/unit"]);
        assert_eq!(recorder.pairs[0].value(), &Value::Float(1.5));
        assert_eq!(recorder.pairs[0].timestamp(), 100);
    }

    #[tokio::test]
    async fn rejected_pairs_stay_untreated() {
        let recorder = Recorder { reject_suffix: Some("/unit"), ..Recorder::default() };
        let mut pipeline = meter_pipeline(PipelineConfig::default(), recorder);
        let packet = MeterPacket::new("meter-1")
            .reading("power", "active", 1.5, 100)
            .attribute_reading("power", "active", "unit", "kW", 100);

        let report = pipeline.process(&packet).await.unwrap();
        assert_eq!(report.treated, 1);
        assert_eq!(report.untreated, 1);
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn first_only_collection_dispatches_one_pair_per_service() {
        let config = PipelineConfig {
            pair_collection: PairCollection::FirstOnly,
            ..PipelineConfig::default()
        };
        let mut pipeline = meter_pipeline(config, Recorder::default());
        let packet = MeterPacket::new("meter-1")
            .reading("power", "active", 1.5, 100)
            .attribute_reading("power", "active", "unit", "kW", 100);

        let report = pipeline.process(&packet).await.unwrap();
        assert_eq!(report.dispatched, 1);
        assert_eq!(report.untreated, 1);
    }

    #[tokio::test]
    async fn terminated_packets_report_their_end() {
        let factory = PacketReaderFactory::<ScriptedPacket>::structured();
        let mut pipeline = Pipeline::new(factory, Recorder::default());
        let packet = ScriptedPacket::new()
            .unit(data_unit("P1", "S1", "R1", 5))
            .unit(SubPacket::terminator())
            .unit(data_unit("P2", "S1", "R1", 6));

        let report = pipeline.process(&packet).await.unwrap();
        assert_eq!(report.fragments, 1);
        assert!(matches!(report.end, Some(StreamEnd::Terminated(_))));
        assert!(report.to_string().contains("terminated"));
        assert_eq!(pipeline.processed(), 1);
    }

    #[tokio::test]
    async fn goodbye_fragments_notify_the_dispatcher() {
        let factory = PacketReaderFactory::<ScriptedPacket>::structured();
        let mut pipeline = Pipeline::new(factory, Recorder::default());
        let goodbye = SubPacket::builder().service_provider("P9").goodbye(true).build();
        let packet = ScriptedPacket::new().unit(goodbye);

        let report = pipeline.process(&packet).await.unwrap();
        assert_eq!(report.goodbye, 1);
        assert_eq!(report.dispatched, 0);
        assert_eq!(pipeline.into_dispatcher().left, vec!["P9"]);
    }

    #[tokio::test]
    async fn unreadable_packets_fail_with_no_reader() {
        let factory = PacketReaderFactory::<ScriptedPacket>::structured();
        let mut pipeline = Pipeline::new(factory, Recorder::default());
        let err = pipeline.process(&ScriptedPacket::unreadable()).await.unwrap_err();
        assert!(matches!(err, PacketError::NoReader { .. }));
        assert_eq!(pipeline.processed(), 0);
    }

    #[tokio::test]
    async fn dispatcher_errors_stop_processing() {
        let factory = PacketReaderFactory::<ScriptedPacket>::structured();
        let mut pipeline = Pipeline::new(factory, Failing);
        let packet = ScriptedPacket::new().unit(data_unit("P1", "S", "R", 1));

        match pipeline.process(&packet).await.unwrap_err() {
            PacketError::Dispatch { task_identifier, .. } => {
                assert_eq!(task_identifier, "P1/S/R/value");
            }
            other => panic!("Expected Dispatch error, got {other:?}"),
        }
    }
}
