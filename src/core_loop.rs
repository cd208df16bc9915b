use std::{collections::VecDeque, fmt, sync::Arc, time::Duration};

use serde::Serialize;
use tokio::{
    sync::{mpsc, oneshot, watch},
    time::{self, Instant, Interval, MissedTickBehavior},
};
use uuid::Uuid;

use crate::{
    capacity::CapacityProvider,
    classifier::{
        chain::ClassifierChain,
        types::{ProviderDialect, SenderProfile},
    },
    config::PipelineRuntimeConfig,
    persistence::{PersistedShieldState, SnapshotPersistence},
    pipeline::{
        gate, processor,
        scheduler::BatchScheduler,
        store::ShieldStore,
        types::{BufferedMessage, ProcessedRecord},
    },
};

const COUNTDOWN_TICK: Duration = Duration::from_secs(1);
const RESULT_QUEUE_CAPACITY: usize = 8;

/// Read-only view of the pipeline published to consumers after every
/// mutation. External components never touch the live state.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineView {
    pub buffer_len: usize,
    pub is_batching: bool,
    pub batch_time_remaining_ms: u64,
    pub provider: ProviderDialect,
    pub user_profile: Option<SenderProfile>,
    pub delivered: Vec<ProcessedRecord>,
    pub deferred: Vec<ProcessedRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineClosed;

impl fmt::Display for PipelineClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pipeline runtime has stopped")
    }
}

impl std::error::Error for PipelineClosed {}

enum Command {
    Ingest {
        text: String,
        source: String,
    },
    Promote {
        id: Uuid,
        reply: oneshot::Sender<bool>,
    },
    ClearDeferred {
        reply: oneshot::Sender<usize>,
    },
    Dismiss {
        id: Uuid,
        reply: oneshot::Sender<bool>,
    },
    SetProvider {
        provider: ProviderDialect,
    },
    SetProfile {
        profile: Option<SenderProfile>,
    },
    Reset,
}

/// Cloneable entry point into the pipeline. All mutations travel through the
/// runtime's command queue; reads come from the published view.
#[derive(Clone)]
pub struct ShieldHandle {
    command_tx: mpsc::Sender<Command>,
    view_rx: watch::Receiver<PipelineView>,
}

impl ShieldHandle {
    pub async fn ingest(
        &self,
        text: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<(), PipelineClosed> {
        self.send(Command::Ingest {
            text: text.into(),
            source: source.into(),
        })
        .await
    }

    pub async fn promote(&self, id: Uuid) -> Result<bool, PipelineClosed> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Promote { id, reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| PipelineClosed)
    }

    pub async fn clear_deferred(&self) -> Result<usize, PipelineClosed> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::ClearDeferred { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| PipelineClosed)
    }

    pub async fn dismiss(&self, id: Uuid) -> Result<bool, PipelineClosed> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Dismiss { id, reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| PipelineClosed)
    }

    pub async fn set_provider(&self, provider: ProviderDialect) -> Result<(), PipelineClosed> {
        self.send(Command::SetProvider { provider }).await
    }

    pub async fn set_profile(
        &self,
        profile: Option<SenderProfile>,
    ) -> Result<(), PipelineClosed> {
        self.send(Command::SetProfile { profile }).await
    }

    pub async fn reset(&self) -> Result<(), PipelineClosed> {
        self.send(Command::Reset).await
    }

    pub fn view(&self) -> PipelineView {
        self.view_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineView> {
        self.view_rx.clone()
    }

    async fn send(&self, command: Command) -> Result<(), PipelineClosed> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| PipelineClosed)
    }
}

/// Owns every piece of mutable pipeline state and drives it from a single
/// task: command ingress, the debounce deadline, the display countdown, and
/// classification results all multiplex through one `select!` loop.
pub struct ShieldRuntime {
    command_rx: mpsc::Receiver<Command>,
    store: ShieldStore,
    scheduler: BatchScheduler,
    chain: ClassifierChain,
    capacity: Arc<dyn CapacityProvider>,
    persistence: SnapshotPersistence,
    user_profile: Option<SenderProfile>,
    view_tx: watch::Sender<PipelineView>,
}

impl ShieldRuntime {
    pub fn new(
        pipeline_config: &PipelineRuntimeConfig,
        mut chain: ClassifierChain,
        capacity: Arc<dyn CapacityProvider>,
        persistence: SnapshotPersistence,
    ) -> (Self, ShieldHandle) {
        let mut store = ShieldStore::new();
        let mut user_profile = None;

        match persistence.load() {
            Ok(Some(state)) => {
                chain.set_active(state.provider);
                user_profile = state.user_profile;
                store.restore_delivered(state.delivered);
                tracing::info!(
                    target: "pipeline",
                    path = %persistence.path().display(),
                    delivered = store.delivered().len(),
                    provider = chain.active().as_str(),
                    "shield_state_restored"
                );
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(
                    target: "pipeline",
                    path = %persistence.path().display(),
                    error = %err,
                    "failed to load shield state; starting fresh"
                );
            }
        }

        let scheduler = BatchScheduler::new(Duration::from_millis(
            pipeline_config.base_hold_window_ms.max(1),
        ));

        let (command_tx, command_rx) =
            mpsc::channel(pipeline_config.command_queue_capacity.max(1));
        let initial_view = build_view(&store, &scheduler, false, &chain, user_profile);
        let (view_tx, view_rx) = watch::channel(initial_view);

        let runtime = Self {
            command_rx,
            store,
            scheduler,
            chain,
            capacity,
            persistence,
            user_profile,
            view_tx,
        };
        let handle = ShieldHandle {
            command_tx,
            view_rx,
        };
        (runtime, handle)
    }

    pub async fn run(self) {
        let Self {
            mut command_rx,
            mut store,
            mut scheduler,
            mut chain,
            capacity,
            persistence,
            mut user_profile,
            view_tx,
        } = self;

        let (result_tx, mut result_rx) = mpsc::channel::<ProcessedRecord>(RESULT_QUEUE_CAPACITY);
        let mut countdown: Option<Interval> = None;
        let mut inflight = false;
        let mut pending: VecDeque<Vec<BufferedMessage>> = VecDeque::new();

        loop {
            let armed = scheduler.is_armed();
            let deadline = scheduler.deadline().unwrap_or_else(Instant::now);

            tokio::select! {
                command = command_rx.recv() => {
                    let Some(command) = command else { break };
                    match command {
                        Command::Ingest { text, source } => {
                            store.append(BufferedMessage::new(text, source));
                            let window = scheduler.arm(capacity.today());
                            countdown = Some(countdown_interval());
                            tracing::debug!(
                                target: "pipeline",
                                buffer_len = store.buffer_len(),
                                window_ms = window.as_millis() as u64,
                                "batch_window_armed"
                            );
                        }
                        Command::Promote { id, reply } => {
                            let moved = store.promote(&id);
                            if moved {
                                persist(&persistence, &chain, user_profile, &store);
                            }
                            let _ = reply.send(moved);
                        }
                        Command::ClearDeferred { reply } => {
                            let cleared = store.clear_deferred();
                            tracing::info!(
                                target: "pipeline",
                                cleared = cleared,
                                "deferred_queue_cleared"
                            );
                            let _ = reply.send(cleared);
                        }
                        Command::Dismiss { id, reply } => {
                            let removed = store.dismiss(&id);
                            if removed {
                                persist(&persistence, &chain, user_profile, &store);
                            }
                            let _ = reply.send(removed);
                        }
                        Command::SetProvider { provider } => {
                            chain.set_active(provider);
                            persist(&persistence, &chain, user_profile, &store);
                        }
                        Command::SetProfile { profile } => {
                            user_profile = profile;
                            persist(&persistence, &chain, user_profile, &store);
                        }
                        Command::Reset => {
                            scheduler.cancel();
                            countdown = None;
                            pending.clear();
                            store.reset();
                            persist(&persistence, &chain, user_profile, &store);
                        }
                    }
                    publish_view(&view_tx, &store, &scheduler, inflight, &chain, user_profile);
                }
                _ = time::sleep_until(deadline), if armed => {
                    scheduler.disarm();
                    countdown = None;
                    let batch = store.drain_buffer();
                    if batch.is_empty() {
                        // Degenerate firing; scheduler state is already clear.
                    } else if inflight {
                        pending.push_back(batch);
                    } else {
                        inflight = true;
                        spawn_classification(chain.clone(), batch, result_tx.clone());
                    }
                    publish_view(&view_tx, &store, &scheduler, inflight, &chain, user_profile);
                }
                _ = tick_countdown(&mut countdown), if countdown.is_some() => {
                    scheduler.tick();
                    publish_view(&view_tx, &store, &scheduler, inflight, &chain, user_profile);
                }
                Some(record) = result_rx.recv() => {
                    let disposition = gate::route(record.cost, capacity.today());
                    tracing::info!(
                        target: "pipeline",
                        record_id = %record.id,
                        cost = record.cost,
                        disposition = ?disposition,
                        "record_routed"
                    );
                    store.commit(record, disposition);
                    persist(&persistence, &chain, user_profile, &store);

                    match pending.pop_front() {
                        Some(batch) => {
                            spawn_classification(chain.clone(), batch, result_tx.clone());
                        }
                        None => inflight = false,
                    }
                    publish_view(&view_tx, &store, &scheduler, inflight, &chain, user_profile);
                }
            }
        }

        persist(&persistence, &chain, user_profile, &store);
        tracing::info!(target: "pipeline", "shield runtime stopped");
    }
}

fn countdown_interval() -> Interval {
    let mut interval = time::interval_at(Instant::now() + COUNTDOWN_TICK, COUNTDOWN_TICK);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn tick_countdown(countdown: &mut Option<Interval>) {
    match countdown.as_mut() {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn spawn_classification(
    chain: ClassifierChain,
    batch: Vec<BufferedMessage>,
    result_tx: mpsc::Sender<ProcessedRecord>,
) {
    tokio::spawn(async move {
        let record = processor::process(chain, batch).await;
        if result_tx.send(record).await.is_err() {
            tracing::warn!(
                target: "pipeline",
                "runtime stopped before classification result was committed"
            );
        }
    });
}

fn build_view(
    store: &ShieldStore,
    scheduler: &BatchScheduler,
    inflight: bool,
    chain: &ClassifierChain,
    user_profile: Option<SenderProfile>,
) -> PipelineView {
    PipelineView {
        buffer_len: store.buffer_len(),
        is_batching: scheduler.is_armed() || inflight,
        batch_time_remaining_ms: scheduler.remaining_ms(),
        provider: chain.active(),
        user_profile,
        delivered: store.delivered().iter().cloned().collect(),
        deferred: store.deferred().iter().cloned().collect(),
    }
}

fn publish_view(
    view_tx: &watch::Sender<PipelineView>,
    store: &ShieldStore,
    scheduler: &BatchScheduler,
    inflight: bool,
    chain: &ClassifierChain,
    user_profile: Option<SenderProfile>,
) {
    view_tx.send_replace(build_view(store, scheduler, inflight, chain, user_profile));
}

fn persist(
    persistence: &SnapshotPersistence,
    chain: &ClassifierChain,
    user_profile: Option<SenderProfile>,
    store: &ShieldStore,
) {
    let state = PersistedShieldState::new(
        chain.active(),
        user_profile,
        store.delivered().iter().cloned().collect(),
    );
    if let Err(err) = persistence.save(&state) {
        tracing::error!(
            target: "pipeline",
            path = %persistence.path().display(),
            error = %err,
            "failed to persist shield state"
        );
    }
}
