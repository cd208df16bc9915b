use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classifier::types::{Assessment, ProviderDialect};

/// Epoch milliseconds; the wire and persistence timestamp unit.
pub fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// A raw ingested message waiting in the buffer. Immutable; consumed exactly
/// once when the batch fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferedMessage {
    pub id: Uuid,
    pub text: String,
    pub received_at: u64,
    pub source: String,
}

impl BufferedMessage {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            text: text.into(),
            received_at: epoch_ms(),
            source: source.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmotionalCategory {
    Calm,
    Affection,
    Anxiety,
    Hostility,
    Neutral,
}

/// The finalized unit produced by one batch flush. Never mutated after
/// creation; leaves the queues only through explicit user action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub id: Uuid,
    pub finalized_at: u64,
    #[serde(flatten)]
    pub assessment: Assessment,
    /// Cognitive cost estimate ("spoons"), always in 1..=5.
    pub cost: u8,
    pub category: EmotionalCategory,
    pub provider: ProviderDialect,
    /// True when the heuristic substituted for a failed remote provider.
    pub degraded: bool,
}

/// Where the gate sent a finalized record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Delivered,
    Deferred,
}
