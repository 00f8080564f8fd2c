//! Fan-out of ordered batches to in-engine listeners and the recording sink

use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::value::parameter_value::ParameterValue;

/// Consumer of ordered parameter batches.
///
/// Called from the ordering lane: implementations must not block for long,
/// every other consumer waits behind them.
pub trait ParameterListener: Send + Sync {
    fn name(&self) -> &str {
        "listener"
    }

    fn update(&self, values: &[ParameterValue]) -> anyhow::Result<()>;
}

/// Destination that records distributed batches outside the engine
pub trait ParameterSink: Send + Sync {
    fn send_parameters(&self, values: &[ParameterValue]) -> anyhow::Result<()>;
}

/// Registered consumers, in registration order
#[derive(Default)]
pub struct ListenerDistribution {
    listeners: Vec<Arc<dyn ParameterListener>>,
    sink: Option<Arc<dyn ParameterSink>>,
}

impl ListenerDistribution {
    pub fn new(sink: Option<Arc<dyn ParameterSink>>) -> Self {
        Self {
            listeners: Vec::new(),
            sink,
        }
    }

    pub fn register(&mut self, listener: Arc<dyn ParameterListener>) {
        debug!(listener = listener.name(), "Registered parameter listener");
        self.listeners.push(listener);
    }

    /// Deliver one batch to every listener, then to the sink.
    ///
    /// A failing or panicking consumer is logged and skipped.
    pub fn distribute(&self, batch: &[ParameterValue]) {
        self.notify_listeners(batch);
        self.record(batch);
    }

    /// Deliver to listeners only; the recording sink does not see this batch
    pub fn distribute_unrecorded(&self, batch: &[ParameterValue]) {
        self.notify_listeners(batch);
    }

    fn notify_listeners(&self, batch: &[ParameterValue]) {
        for listener in &self.listeners {
            match catch_unwind(AssertUnwindSafe(|| listener.update(batch))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(
                    listener = listener.name(),
                    batch_size = batch.len(),
                    "Listener failed to process batch: {:#}",
                    e
                ),
                Err(_) => error!(
                    listener = listener.name(),
                    batch_size = batch.len(),
                    "Listener panicked while processing batch"
                ),
            }
        }
    }

    fn record(&self, batch: &[ParameterValue]) {
        if let Some(sink) = &self.sink {
            match catch_unwind(AssertUnwindSafe(|| sink.send_parameters(batch))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(batch_size = batch.len(), "Recording sink failed: {:#}", e),
                Err(_) => error!(batch_size = batch.len(), "Recording sink panicked"),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

/// A listener that logs every batch
pub struct LoggingListener;

impl ParameterListener for LoggingListener {
    fn name(&self) -> &str {
        "logging"
    }

    fn update(&self, values: &[ParameterValue]) -> anyhow::Result<()> {
        for value in values {
            debug!(
                parameter = value.qualified_name(),
                value = %value.eng_value,
                "Parameter update"
            );
        }
        Ok(())
    }
}

/// A listener that collects every batch it receives
#[derive(Default)]
pub struct BufferingListener {
    batches: Arc<RwLock<Vec<Vec<ParameterValue>>>>,
}

impl BufferingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<Vec<ParameterValue>> {
        self.batches.read().clone()
    }

    /// All received values, flattened in delivery order
    pub fn values(&self) -> Vec<ParameterValue> {
        self.batches.read().iter().flatten().cloned().collect()
    }

    pub fn clear(&self) {
        self.batches.write().clear();
    }
}

impl ParameterListener for BufferingListener {
    fn name(&self) -> &str {
        "buffering"
    }

    fn update(&self, values: &[ParameterValue]) -> anyhow::Result<()> {
        self.batches.write().push(values.to_vec());
        Ok(())
    }
}

/// Recording sink that forwards batches onto a channel towards a recorder task
pub struct ChannelParameterSink {
    tx: mpsc::UnboundedSender<Vec<ParameterValue>>,
}

impl ChannelParameterSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Vec<ParameterValue>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ParameterSink for ChannelParameterSink {
    fn send_parameters(&self, values: &[ParameterValue]) -> anyhow::Result<()> {
        self.tx
            .send(values.to_vec())
            .map_err(|_| anyhow::anyhow!("recorder channel closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mdb::types::{ParameterDefinition, ParameterType};
    use crate::value::value::Value;

    struct FailingListener;

    impl ParameterListener for FailingListener {
        fn update(&self, _values: &[ParameterValue]) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    struct PanickingListener;

    impl ParameterListener for PanickingListener {
        fn update(&self, _values: &[ParameterValue]) -> anyhow::Result<()> {
            panic!("listener bug")
        }
    }

    fn batch() -> Vec<ParameterValue> {
        let def = Arc::new(ParameterDefinition::local("/p/x", ParameterType::Boolean));
        vec![ParameterValue::new(def, Value::Boolean(true))]
    }

    #[test]
    fn test_broken_listeners_do_not_block_others() {
        let tail = Arc::new(BufferingListener::new());
        let mut distribution = ListenerDistribution::new(None);
        distribution.register(Arc::new(FailingListener));
        distribution.register(Arc::new(PanickingListener));
        distribution.register(tail.clone());
        assert_eq!(distribution.len(), 3);

        distribution.distribute(&batch());
        distribution.distribute(&batch());
        assert_eq!(tail.batches().len(), 2);
    }

    #[test]
    fn test_sink_receives_recorded_batches_only() {
        let (sink, mut rx) = ChannelParameterSink::new();
        let listener = Arc::new(BufferingListener::new());
        let mut distribution = ListenerDistribution::new(Some(Arc::new(sink)));
        distribution.register(listener.clone());

        distribution.distribute(&batch());
        distribution.distribute_unrecorded(&batch());

        assert_eq!(listener.batches().len(), 2);
        assert_eq!(rx.try_recv().unwrap().len(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_recorder_is_tolerated() {
        let (sink, rx) = ChannelParameterSink::new();
        drop(rx);
        let listener = Arc::new(BufferingListener::new());
        let mut distribution = ListenerDistribution::new(Some(Arc::new(sink)));
        distribution.register(listener.clone());

        distribution.distribute(&batch());
        assert_eq!(listener.values().len(), 1);

        listener.clear();
        assert!(listener.values().is_empty());
    }
}
