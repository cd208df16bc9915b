use uuid::Uuid;

use crate::{
    classifier::chain::ClassifierChain,
    pipeline::{
        cost::{emotional_category, spoon_cost},
        types::{BufferedMessage, ProcessedRecord, epoch_ms},
    },
};

/// Separator between messages when a batch is combined for classification.
pub const BATCH_DELIMITER: &str = "\n---\n";

/// Combine a drained batch in arrival order and classify it into exactly one
/// finalized record. Infallible: the classifier chain terminates at the
/// heuristic, so every batch resolves.
pub async fn process(chain: ClassifierChain, messages: Vec<BufferedMessage>) -> ProcessedRecord {
    debug_assert!(!messages.is_empty(), "empty batch reached the processor");

    let combined = messages
        .iter()
        .map(|message| message.text.as_str())
        .collect::<Vec<_>>()
        .join(BATCH_DELIMITER);

    let outcome = chain.classify(&combined).await;

    let cost = spoon_cost(outcome.assessment.voltage, outcome.assessment.triggers.len());
    let category = emotional_category(outcome.assessment.voltage, &combined);

    let record = ProcessedRecord {
        id: Uuid::now_v7(),
        finalized_at: epoch_ms(),
        assessment: outcome.assessment,
        cost,
        category,
        provider: outcome.provider,
        degraded: outcome.degraded,
    };

    tracing::info!(
        target: "pipeline",
        record_id = %record.id,
        batch_size = messages.len(),
        voltage = record.assessment.voltage,
        cost = record.cost,
        category = ?record.category,
        provider = record.provider.as_str(),
        degraded = record.degraded,
        "batch_finalized"
    );

    record
}
