//! Cost and valence derivation. Pure functions of the assessment and the
//! combined batch text.

use std::sync::LazyLock;

use regex::Regex;

use crate::pipeline::types::EmotionalCategory;

pub const MIN_COST: u8 = 1;
pub const MAX_COST: u8 = 5;

const HIGH_VOLTAGE: f64 = 6.6;
const MEDIUM_VOLTAGE: f64 = 3.3;
const CALM_VOLTAGE: f64 = 2.0;
const MAX_COUNTED_TRIGGERS: usize = 2;

static AFFECTION_LEXICON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)love|care|happy|joy").expect("regex must compile"));

/// Spoon cost of a batch: voltage band sets the base, each matched trigger
/// (capped at two) adds one, clamped to 1..=5.
pub fn spoon_cost(voltage: f64, trigger_count: usize) -> u8 {
    let base: u8 = if voltage > HIGH_VOLTAGE {
        3
    } else if voltage > MEDIUM_VOLTAGE {
        2
    } else {
        1
    };
    (base + trigger_count.min(MAX_COUNTED_TRIGGERS) as u8).min(MAX_COST)
}

/// Emotional category of a batch; first matching branch wins.
pub fn emotional_category(voltage: f64, combined_text: &str) -> EmotionalCategory {
    if voltage > HIGH_VOLTAGE {
        EmotionalCategory::Hostility
    } else if voltage > MEDIUM_VOLTAGE {
        EmotionalCategory::Anxiety
    } else if AFFECTION_LEXICON.is_match(combined_text) {
        EmotionalCategory::Affection
    } else if voltage < CALM_VOLTAGE {
        EmotionalCategory::Calm
    } else {
        EmotionalCategory::Neutral
    }
}
