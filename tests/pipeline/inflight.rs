use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::time::advance;

use shield::classifier::{
    adapters::ProviderAdapter,
    chain::{ClassifierChain, ClassifierConfig},
    credentials::EnvCredentialProvider,
    error::ClassifierError,
    types::{AdapterContext, Assessment, ProviderDialect},
};

use crate::common::{spawn_pipeline, temp_state_path, wait_for};

const WINDOW_MS: u64 = 1_000;
const CLASSIFY_DELAY: Duration = Duration::from_secs(30);

/// Stand-in remote provider that takes a long time to answer, so a second
/// batch can accumulate while the first is in flight.
struct SlowAdapter;

#[async_trait]
impl ProviderAdapter for SlowAdapter {
    fn dialect(&self) -> ProviderDialect {
        ProviderDialect::Ollama
    }

    async fn assess(
        &self,
        _ctx: AdapterContext,
        text: &str,
    ) -> Result<Assessment, ClassifierError> {
        tokio::time::sleep(CLASSIFY_DELAY).await;
        Ok(Assessment {
            voltage: 1.0,
            triggers: Vec::new(),
            summary: format!("echo: {text}"),
            translation: None,
            why: None,
            sender_profile: None,
        })
    }
}

fn slow_chain() -> ClassifierChain {
    let mut adapters: HashMap<ProviderDialect, Arc<dyn ProviderAdapter>> = HashMap::new();
    adapters.insert(ProviderDialect::Ollama, Arc::new(SlowAdapter));
    ClassifierChain::new(
        &ClassifierConfig {
            active: ProviderDialect::Ollama,
            request_timeout_ms: 120_000,
            ..ClassifierConfig::default()
        },
        Arc::new(EnvCredentialProvider),
    )
    .expect("chain should build")
    .with_adapters(adapters)
}

#[tokio::test(start_paused = true)]
async fn ingest_during_classification_feeds_the_next_batch() {
    let (handle, _runtime) = spawn_pipeline(
        WINDOW_MS,
        Some(80),
        slow_chain(),
        temp_state_path("inflight"),
    );
    let mut view_rx = handle.subscribe();

    handle.ingest("first", "test").await.expect("pipeline alive");
    wait_for(&mut view_rx, |view| view.buffer_len == 1).await;

    // The window elapses and the first batch goes out for classification.
    advance(Duration::from_millis(WINDOW_MS + 500)).await;
    let view = wait_for(&mut view_rx, |view| view.buffer_len == 0).await;
    assert!(view.is_batching, "in-flight classification counts as batching");
    assert!(view.delivered.is_empty());

    // A message arriving mid-classification lands in a fresh buffer and does
    // not disturb the batch already sent out.
    handle.ingest("second", "test").await.expect("pipeline alive");
    wait_for(&mut view_rx, |view| view.buffer_len == 1).await;

    // Its window fires while the first batch is still in flight; the drained
    // batch queues behind it.
    advance(Duration::from_millis(WINDOW_MS + 500)).await;
    let view = wait_for(&mut view_rx, |view| view.buffer_len == 0).await;
    assert!(view.delivered.is_empty());

    // First classification completes and commits; the queued batch follows.
    advance(CLASSIFY_DELAY).await;
    let view = wait_for(&mut view_rx, |view| view.delivered.len() == 1).await;
    assert!(view.delivered[0].assessment.summary.contains("first"));

    advance(CLASSIFY_DELAY).await;
    let view = wait_for(&mut view_rx, |view| view.delivered.len() == 2).await;
    // Most-recent-first: the second batch leads the feed.
    assert!(view.delivered[0].assessment.summary.contains("second"));
    assert!(view.delivered[1].assessment.summary.contains("first"));
    assert!(!view.is_batching);
}
