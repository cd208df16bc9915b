use std::sync::Arc;

use shield::classifier::{
    chain::{ClassifierChain, ClassifierConfig},
    credentials::EnvCredentialProvider,
    types::{CredentialRef, ProviderDialect, ProviderProfile},
};

use crate::common::{spawn_pipeline, temp_state_path, wait_for};

fn unreachable_ollama_chain() -> ClassifierChain {
    ClassifierChain::new(
        &ClassifierConfig {
            active: ProviderDialect::Ollama,
            providers: vec![ProviderProfile {
                dialect: ProviderDialect::Ollama,
                // Reserved port; the connection is refused immediately.
                endpoint: Some("http://127.0.0.1:1".to_string()),
                model: None,
                credential: CredentialRef::None,
            }],
            request_timeout_ms: 2_000,
        },
        Arc::new(EnvCredentialProvider),
    )
    .expect("chain should build")
}

#[tokio::test]
async fn unreachable_remote_provider_still_finalizes_the_batch() {
    let (handle, _runtime) = spawn_pipeline(
        200,
        Some(90),
        unreachable_ollama_chain(),
        temp_state_path("fallback-remote"),
    );
    let mut view_rx = handle.subscribe();

    handle.ingest("hello", "test").await.expect("pipeline alive");
    let view = wait_for(&mut view_rx, |view| view.delivered.len() == 1).await;

    let record = &view.delivered[0];
    assert!((1..=5).contains(&record.cost));
    assert!(record.degraded, "heuristic substitution must be marked");
    assert_eq!(record.provider, ProviderDialect::Heuristic);
}

#[tokio::test]
async fn cloud_provider_without_credential_degrades_before_any_network_call() {
    let chain = ClassifierChain::new(
        &ClassifierConfig {
            active: ProviderDialect::Anthropic,
            ..ClassifierConfig::default()
        },
        Arc::new(EnvCredentialProvider),
    )
    .expect("chain should build");

    let (handle, _runtime) = spawn_pipeline(
        200,
        Some(90),
        chain,
        temp_state_path("fallback-credential"),
    );
    let mut view_rx = handle.subscribe();

    handle.ingest("hello", "test").await.expect("pipeline alive");
    let view = wait_for(&mut view_rx, |view| view.delivered.len() == 1).await;

    let record = &view.delivered[0];
    assert!(record.degraded);
    assert_eq!(record.provider, ProviderDialect::Heuristic);
}
