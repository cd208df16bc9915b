use std::{path::PathBuf, sync::Arc};

use tokio::{sync::watch, task::JoinHandle};
use uuid::Uuid;

use shield::{
    capacity::FixedCapacity,
    classifier::{
        chain::{ClassifierChain, ClassifierConfig},
        credentials::EnvCredentialProvider,
        types::ProviderDialect,
    },
    config::PipelineRuntimeConfig,
    core_loop::{PipelineView, ShieldHandle, ShieldRuntime},
    persistence::SnapshotPersistence,
};

pub fn temp_state_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("shield-{tag}-{}/state.json", Uuid::now_v7()))
}

pub fn heuristic_chain() -> ClassifierChain {
    ClassifierChain::new(
        &ClassifierConfig {
            active: ProviderDialect::Heuristic,
            ..ClassifierConfig::default()
        },
        Arc::new(EnvCredentialProvider),
    )
    .expect("chain should build")
}

pub fn spawn_pipeline(
    base_window_ms: u64,
    capacity: Option<u8>,
    chain: ClassifierChain,
    state_path: PathBuf,
) -> (ShieldHandle, JoinHandle<()>) {
    let config = PipelineRuntimeConfig {
        base_hold_window_ms: base_window_ms,
        command_queue_capacity: 64,
    };
    let (runtime, handle) = ShieldRuntime::new(
        &config,
        chain,
        Arc::new(FixedCapacity(capacity)),
        SnapshotPersistence::new(state_path),
    );
    (handle, tokio::spawn(runtime.run()))
}

/// Block until the published view satisfies the predicate. The runtime
/// republishes after every mutation, so progress always produces a change.
pub async fn wait_for(
    view_rx: &mut watch::Receiver<PipelineView>,
    predicate: impl Fn(&PipelineView) -> bool,
) -> PipelineView {
    loop {
        {
            let view = view_rx.borrow();
            if predicate(&view) {
                return view.clone();
            }
        }
        view_rx
            .changed()
            .await
            .expect("pipeline runtime should stay alive");
    }
}
