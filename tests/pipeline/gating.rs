use std::time::Duration;

use tokio::time::advance;
use uuid::Uuid;

use shield::pipeline::types::EmotionalCategory;

use crate::common::{heuristic_chain, spawn_pipeline, temp_state_path, wait_for};

const WINDOW_MS: u64 = 1_000;

#[tokio::test(start_paused = true)]
async fn hostile_batch_at_low_capacity_is_deferred() {
    let (handle, _runtime) = spawn_pipeline(
        WINDOW_MS,
        Some(20),
        heuristic_chain(),
        temp_state_path("gate-defer"),
    );
    let mut view_rx = handle.subscribe();

    handle
        .ingest("WHY HAVEN'T YOU RESPONDED?? THIS IS UNACCEPTABLE!!!", "sms")
        .await
        .expect("pipeline alive");
    wait_for(&mut view_rx, |view| view.buffer_len == 1).await;
    // Capacity 20 doubles the hold window.
    advance(Duration::from_millis(2 * WINDOW_MS + 500)).await;

    let view = wait_for(&mut view_rx, |view| view.deferred.len() == 1).await;
    assert!(view.delivered.is_empty());

    let record = &view.deferred[0];
    assert!(record.assessment.voltage > 6.6);
    assert_eq!(record.cost, 5);
    assert_eq!(record.category, EmotionalCategory::Hostility);
}

#[tokio::test(start_paused = true)]
async fn calm_batch_at_high_capacity_is_delivered() {
    let (handle, _runtime) = spawn_pipeline(
        WINDOW_MS,
        Some(90),
        heuristic_chain(),
        temp_state_path("gate-deliver"),
    );
    let mut view_rx = handle.subscribe();

    handle
        .ingest(
            "Whenever you have a moment, could you review this? No rush.",
            "email",
        )
        .await
        .expect("pipeline alive");
    wait_for(&mut view_rx, |view| view.buffer_len == 1).await;
    advance(Duration::from_millis(WINDOW_MS + 500)).await;

    let view = wait_for(&mut view_rx, |view| view.delivered.len() == 1).await;
    assert!(view.deferred.is_empty());

    let record = &view.delivered[0];
    assert!(record.assessment.voltage < 2.0);
    assert_eq!(record.cost, 1);
    assert_eq!(record.category, EmotionalCategory::Calm);
}

#[tokio::test(start_paused = true)]
async fn unknown_capacity_never_defers() {
    let (handle, _runtime) = spawn_pipeline(
        WINDOW_MS,
        None,
        heuristic_chain(),
        temp_state_path("gate-unknown"),
    );
    let mut view_rx = handle.subscribe();

    handle
        .ingest("WHY HAVEN'T YOU RESPONDED?? THIS IS UNACCEPTABLE!!!", "sms")
        .await
        .expect("pipeline alive");
    wait_for(&mut view_rx, |view| view.buffer_len == 1).await;
    advance(Duration::from_millis(WINDOW_MS + 500)).await;

    let view = wait_for(&mut view_rx, |view| view.delivered.len() == 1).await;
    assert!(view.deferred.is_empty());
}

#[tokio::test(start_paused = true)]
async fn promote_moves_a_deferred_record_exactly_once() {
    let (handle, _runtime) = spawn_pipeline(
        WINDOW_MS,
        Some(20),
        heuristic_chain(),
        temp_state_path("gate-promote"),
    );
    let mut view_rx = handle.subscribe();

    handle
        .ingest("THIS IS UNACCEPTABLE!!! You ALWAYS do this??", "sms")
        .await
        .expect("pipeline alive");
    advance(Duration::from_millis(2 * WINDOW_MS + 500)).await;
    let view = wait_for(&mut view_rx, |view| view.deferred.len() == 1).await;
    let id = view.deferred[0].id;

    assert!(handle.promote(id).await.expect("pipeline alive"));
    let view = wait_for(&mut view_rx, |view| view.delivered.len() == 1).await;
    assert!(view.deferred.is_empty());

    // Promoting again, or promoting garbage, is a no-op.
    assert!(!handle.promote(id).await.expect("pipeline alive"));
    assert!(!handle.promote(Uuid::now_v7()).await.expect("pipeline alive"));
    assert_eq!(handle.view().delivered.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn clear_deferred_discards_everything_held() {
    let (handle, _runtime) = spawn_pipeline(
        WINDOW_MS,
        Some(20),
        heuristic_chain(),
        temp_state_path("gate-clear"),
    );
    let mut view_rx = handle.subscribe();

    for text in [
        "THIS IS UNACCEPTABLE!!! Obviously??",
        "WHY HAVEN'T YOU RESPONDED?? ANSWER ME!!!",
    ] {
        handle.ingest(text, "sms").await.expect("pipeline alive");
        advance(Duration::from_millis(2 * WINDOW_MS + 500)).await;
    }
    wait_for(&mut view_rx, |view| view.deferred.len() == 2).await;

    assert_eq!(handle.clear_deferred().await.expect("pipeline alive"), 2);
    let view = wait_for(&mut view_rx, |view| view.deferred.is_empty()).await;
    assert!(view.delivered.is_empty());
}

#[tokio::test(start_paused = true)]
async fn dismiss_removes_a_delivered_record() {
    let (handle, _runtime) = spawn_pipeline(
        WINDOW_MS,
        Some(90),
        heuristic_chain(),
        temp_state_path("gate-dismiss"),
    );
    let mut view_rx = handle.subscribe();

    handle.ingest("quick note", "sms").await.expect("pipeline alive");
    advance(Duration::from_millis(WINDOW_MS + 500)).await;
    let view = wait_for(&mut view_rx, |view| view.delivered.len() == 1).await;
    let id = view.delivered[0].id;

    assert!(handle.dismiss(id).await.expect("pipeline alive"));
    assert!(!handle.dismiss(id).await.expect("pipeline alive"));
    assert!(handle.view().delivered.is_empty());
}
