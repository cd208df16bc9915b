use std::time::Duration;

use tokio::time::advance;

use crate::common::{heuristic_chain, spawn_pipeline, temp_state_path, wait_for};

const BASE_WINDOW_MS: u64 = 60_000;

#[tokio::test(start_paused = true)]
async fn steady_ingestion_postpones_the_flush() {
    let (handle, _runtime) = spawn_pipeline(
        BASE_WINDOW_MS,
        Some(80),
        heuristic_chain(),
        temp_state_path("debounce"),
    );
    let mut view_rx = handle.subscribe();

    // Ingest at t=0, t=10s, t=20s; each re-arms the full 60s window.
    handle.ingest("one", "test").await.expect("pipeline alive");
    wait_for(&mut view_rx, |view| view.buffer_len == 1).await;

    advance(Duration::from_secs(10)).await;
    handle.ingest("two", "test").await.expect("pipeline alive");
    wait_for(&mut view_rx, |view| view.buffer_len == 2).await;

    advance(Duration::from_secs(10)).await;
    handle.ingest("three", "test").await.expect("pipeline alive");
    wait_for(&mut view_rx, |view| view.buffer_len == 3).await;

    // At t=79.5s (59.5s after the last ingest) nothing has flushed: a fixed
    // 60s window from t=0 would already have fired at t=60s.
    advance(Duration::from_millis(59_500)).await;
    let view = handle.view();
    assert_eq!(view.buffer_len, 3, "flush fired before the debounce window");
    assert!(view.is_batching);
    assert!(view.delivered.is_empty());

    // Crossing t=80s releases the whole burst as one batch.
    advance(Duration::from_millis(600)).await;
    let view = wait_for(&mut view_rx, |view| view.delivered.len() == 1).await;
    assert_eq!(view.buffer_len, 0);
    assert!(!view.is_batching);
    assert_eq!(view.batch_time_remaining_ms, 0);
}

#[tokio::test(start_paused = true)]
async fn low_capacity_doubles_the_hold_window() {
    let (handle, _runtime) = spawn_pipeline(
        BASE_WINDOW_MS,
        Some(10),
        heuristic_chain(),
        temp_state_path("window-low"),
    );
    let mut view_rx = handle.subscribe();

    handle.ingest("hold me", "test").await.expect("pipeline alive");
    let view = wait_for(&mut view_rx, |view| view.buffer_len == 1).await;
    assert_eq!(view.batch_time_remaining_ms, 2 * BASE_WINDOW_MS);

    // The base window elapses without a flush...
    advance(Duration::from_millis(BASE_WINDOW_MS + 500)).await;
    assert!(handle.view().delivered.is_empty());

    // ...and the doubled window releases it.
    advance(Duration::from_millis(BASE_WINDOW_MS)).await;
    wait_for(&mut view_rx, |view| view.delivered.len() == 1).await;
}

#[tokio::test(start_paused = true)]
async fn full_capacity_uses_the_base_window() {
    let (handle, _runtime) = spawn_pipeline(
        BASE_WINDOW_MS,
        Some(80),
        heuristic_chain(),
        temp_state_path("window-full"),
    );
    let mut view_rx = handle.subscribe();

    handle.ingest("quick", "test").await.expect("pipeline alive");
    let view = wait_for(&mut view_rx, |view| view.buffer_len == 1).await;
    assert_eq!(view.batch_time_remaining_ms, BASE_WINDOW_MS);

    advance(Duration::from_millis(BASE_WINDOW_MS + 500)).await;
    wait_for(&mut view_rx, |view| view.delivered.len() == 1).await;
}

#[tokio::test(start_paused = true)]
async fn countdown_ticks_are_display_only() {
    let (handle, _runtime) = spawn_pipeline(
        BASE_WINDOW_MS,
        Some(80),
        heuristic_chain(),
        temp_state_path("countdown"),
    );
    let mut view_rx = handle.subscribe();

    handle.ingest("tick", "test").await.expect("pipeline alive");
    wait_for(&mut view_rx, |view| view.buffer_len == 1).await;

    // Ten seconds of ticks decrement the display counter without flushing.
    advance(Duration::from_secs(10)).await;
    let view = wait_for(&mut view_rx, |view| {
        view.batch_time_remaining_ms <= BASE_WINDOW_MS - 10_000
    })
    .await;
    assert_eq!(view.buffer_len, 1);
    assert!(view.delivered.is_empty());
    assert!(view.is_batching);
}
