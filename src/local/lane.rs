//! Ordering lane - the single consumer through which all mutation passes
//!
//! Many producers submit requests on an unbounded channel; one spawned task
//! applies them strictly in arrival order. The subscription set and the
//! listener list live inside that task, so they need no locks and can never
//! interleave with a distribution in progress.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

use crate::core::errors::{ParamError, Result};
use crate::core::time::{Instant, MissionClock};
use crate::local::distribution::{ListenerDistribution, ParameterListener};
use crate::local::subscription::SubscriptionRegistry;
use crate::mdb::catalog::ParameterCatalog;
use crate::mdb::types::ParameterDefinition;
use crate::value::parameter_value::ParameterValue;

/// Requests applied by the lane, in submission order
pub enum LaneRequest {
    /// Coerced batch, filtered by subscription before distribution
    Update(Vec<ParameterValue>),
    /// Single assignment, always stamped and distributed
    Assign(ParameterValue),
    Subscribe(Arc<ParameterDefinition>),
    SubscribeAll,
    Unsubscribe(Arc<ParameterDefinition>),
    AddListener(Arc<dyn ParameterListener>),
    /// Resolves once everything submitted earlier has been applied
    Barrier(oneshot::Sender<()>),
    /// Stop accepting requests, drain what is queued, then exit
    Shutdown,
}

impl LaneRequest {
    fn operation(&self) -> &'static str {
        match self {
            LaneRequest::Update(_) => "update parameters",
            LaneRequest::Assign(_) => "assign parameter",
            LaneRequest::Subscribe(_) => "start providing",
            LaneRequest::SubscribeAll => "start providing all",
            LaneRequest::Unsubscribe(_) => "stop providing",
            LaneRequest::AddListener(_) => "add listener",
            LaneRequest::Barrier(_) => "sync",
            LaneRequest::Shutdown => "shut down",
        }
    }
}

/// State owned exclusively by the lane task
struct LaneState {
    subscriptions: SubscriptionRegistry,
    distribution: ListenerDistribution,
    catalog: Arc<ParameterCatalog>,
    clock: Arc<dyn MissionClock>,
}

impl LaneState {
    fn apply(&mut self, request: LaneRequest) {
        match request {
            LaneRequest::Update(values) => self.update(values),
            LaneRequest::Assign(mut value) => {
                value.stamp(self.clock.now());
                self.distribution.distribute_unrecorded(std::slice::from_ref(&value));
            }
            LaneRequest::Subscribe(definition) => self.subscriptions.subscribe(definition),
            LaneRequest::SubscribeAll => self.subscriptions.subscribe_all(self.catalog.definitions()),
            LaneRequest::Unsubscribe(definition) => self.subscriptions.unsubscribe(&definition),
            LaneRequest::AddListener(listener) => self.distribution.register(listener),
            LaneRequest::Barrier(done) => {
                // The waiter may have given up, nothing to do then
                let _ = done.send(());
            }
            LaneRequest::Shutdown => {}
        }
    }

    fn update(&mut self, values: Vec<ParameterValue>) {
        let received = values.len();
        let mut now: Option<Instant> = None;
        let batch: Vec<ParameterValue> = values
            .into_iter()
            .filter(|v| self.subscriptions.is_active(v.definition()))
            .map(|mut v| {
                if v.generation_time.is_none() || v.acquisition_time.is_none() {
                    let t = *now.get_or_insert_with(|| self.clock.now());
                    v.stamp_if_unset(t);
                }
                v
            })
            .collect();

        if batch.len() < received {
            trace!(
                dropped = received - batch.len(),
                "Dropped values for parameters nobody subscribed to"
            );
        }
        if !batch.is_empty() {
            self.distribution.distribute(&batch);
        }
    }
}

/// Handle to the ordering lane
pub struct OrderingWorker {
    tx: mpsc::UnboundedSender<LaneRequest>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl OrderingWorker {
    /// Spawn the lane task on the current tokio runtime
    pub fn spawn(
        instance: String,
        catalog: Arc<ParameterCatalog>,
        clock: Arc<dyn MissionClock>,
        distribution: ListenerDistribution,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            ParamError::configuration(format!("ordering lane needs a tokio runtime: {}", e))
        })?;
        let (tx, rx) = mpsc::unbounded_channel();
        let state = LaneState {
            subscriptions: SubscriptionRegistry::new(),
            distribution,
            catalog,
            clock,
        };
        let handle = runtime.spawn(run_lane(instance, state, rx));
        Ok(Self {
            tx,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Queue a request without waiting for it to be applied
    pub fn submit(&self, request: LaneRequest) -> Result<()> {
        let operation = request.operation();
        self.tx
            .send(request)
            .map_err(|_| ParamError::lane_closed(operation))
    }

    /// Wait until every request submitted before this call has been applied
    pub async fn sync(&self) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.submit(LaneRequest::Barrier(done_tx))?;
        done_rx.await.map_err(|_| ParamError::lane_closed("sync"))
    }

    /// Drain pending requests and stop the lane. Later submissions fail.
    pub async fn shutdown(&self) {
        // Already closed when a previous shutdown got there first
        let _ = self.tx.send(LaneRequest::Shutdown);
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Ordering lane task failed: {}", e);
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

async fn run_lane(
    instance: String,
    mut state: LaneState,
    mut rx: mpsc::UnboundedReceiver<LaneRequest>,
) {
    info!(instance = %instance, "Ordering lane started");
    let mut processed: u64 = 0;
    while let Some(request) = rx.recv().await {
        if let LaneRequest::Shutdown = request {
            debug!(instance = %instance, "Shutdown requested, draining queue");
            rx.close();
            continue;
        }
        state.apply(request);
        processed += 1;
    }
    state.subscriptions.clear();
    state.distribution.clear();
    info!(instance = %instance, processed = processed, "Ordering lane stopped");
}
