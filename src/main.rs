use std::sync::Arc;

use anyhow::{Context, Result};

use shield::{
    capacity::CheckInLedger,
    classifier::{chain::ClassifierChain, credentials::EnvCredentialProvider},
    cli::config_path_from_args,
    config::Config,
    core_loop::ShieldRuntime,
    logging::init_tracing,
    persistence::SnapshotPersistence,
    server,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config_path_from_args()?;
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let logging_guard = init_tracing(&config.logging)?;
    tracing::info!(
        target: "shield",
        run_id = %logging_guard.run_id(),
        config = %config_path.display(),
        "shield starting"
    );

    let chain = ClassifierChain::new(&config.classifier, Arc::new(EnvCredentialProvider))
        .context("failed to construct classifier chain")?;
    let ledger = CheckInLedger::new();
    let persistence = SnapshotPersistence::new(config.persistence.state_path.clone());

    let (runtime, handle) = ShieldRuntime::new(
        &config.pipeline,
        chain,
        Arc::new(ledger.clone()),
        persistence,
    );
    let runtime_task = tokio::spawn(runtime.run());

    let server_result = server::run(&config, handle, ledger).await;

    // Dropping every handle closes the command queue; the runtime then
    // writes its final snapshot and exits.
    runtime_task.await.context("runtime task join failed")?;

    server_result
}
