use std::time::Duration;

use tokio::time::advance;

use shield::classifier::types::{ProviderDialect, SenderProfile};

use crate::common::{heuristic_chain, spawn_pipeline, temp_state_path, wait_for};

const WINDOW_MS: u64 = 1_000;

#[tokio::test(start_paused = true)]
async fn delivered_feed_survives_a_restart() {
    let state_path = temp_state_path("snapshot-restart");

    let (handle, runtime) = spawn_pipeline(
        WINDOW_MS,
        Some(90),
        heuristic_chain(),
        state_path.clone(),
    );
    let mut view_rx = handle.subscribe();

    handle
        .ingest("please file the report", "email")
        .await
        .expect("pipeline alive");
    advance(Duration::from_millis(WINDOW_MS + 500)).await;
    wait_for(&mut view_rx, |view| view.delivered.len() == 1).await;

    drop(view_rx);
    drop(handle);
    runtime.await.expect("runtime should stop cleanly");

    let (restarted, _runtime) =
        spawn_pipeline(WINDOW_MS, Some(90), heuristic_chain(), state_path);
    let view = restarted.view();
    assert_eq!(view.delivered.len(), 1);
    assert!(
        view.delivered[0]
            .assessment
            .summary
            .contains("please file the report")
    );
    assert_eq!(view.buffer_len, 0);
    assert!(view.deferred.is_empty());
}

#[tokio::test(start_paused = true)]
async fn deferred_queue_and_buffer_are_not_persisted() {
    let state_path = temp_state_path("snapshot-volatile");

    let (handle, runtime) = spawn_pipeline(
        WINDOW_MS,
        Some(20),
        heuristic_chain(),
        state_path.clone(),
    );
    let mut view_rx = handle.subscribe();

    // One record into the deferred queue, one message left in the buffer.
    handle
        .ingest("WHY HAVEN'T YOU RESPONDED?? THIS IS UNACCEPTABLE!!!", "sms")
        .await
        .expect("pipeline alive");
    // Capacity 20 doubles the hold window.
    advance(Duration::from_millis(2 * WINDOW_MS + 500)).await;
    wait_for(&mut view_rx, |view| view.deferred.len() == 1).await;

    handle
        .ingest("still sitting in the buffer", "sms")
        .await
        .expect("pipeline alive");
    wait_for(&mut view_rx, |view| view.buffer_len == 1).await;

    drop(view_rx);
    drop(handle);
    runtime.await.expect("runtime should stop cleanly");

    let (restarted, _runtime) =
        spawn_pipeline(WINDOW_MS, Some(20), heuristic_chain(), state_path);
    let view = restarted.view();
    assert_eq!(view.buffer_len, 0, "buffer must start empty");
    assert!(view.deferred.is_empty(), "deferred queue must start empty");
    assert!(view.delivered.is_empty());
    assert!(!view.is_batching);
}

#[tokio::test(start_paused = true)]
async fn provider_and_profile_selection_survive_a_restart() {
    let state_path = temp_state_path("snapshot-settings");

    let (handle, runtime) = spawn_pipeline(
        WINDOW_MS,
        Some(90),
        heuristic_chain(),
        state_path.clone(),
    );
    let mut view_rx = handle.subscribe();

    handle
        .set_provider(ProviderDialect::Anthropic)
        .await
        .expect("pipeline alive");
    handle
        .set_profile(Some(SenderProfile::Integrator))
        .await
        .expect("pipeline alive");
    wait_for(&mut view_rx, |view| {
        view.provider == ProviderDialect::Anthropic
            && view.user_profile == Some(SenderProfile::Integrator)
    })
    .await;

    drop(view_rx);
    drop(handle);
    runtime.await.expect("runtime should stop cleanly");

    let (restarted, _runtime) =
        spawn_pipeline(WINDOW_MS, Some(90), heuristic_chain(), state_path);
    let view = restarted.view();
    assert_eq!(view.provider, ProviderDialect::Anthropic);
    assert_eq!(view.user_profile, Some(SenderProfile::Integrator));
}
