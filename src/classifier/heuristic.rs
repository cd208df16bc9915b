//! Rule-based classifier. Always available, never fails; terminal strategy
//! of the provider chain.

use std::sync::LazyLock;

use regex::Regex;

use crate::classifier::types::{Assessment, SenderProfile};

const MAX_VOLTAGE: f64 = 10.0;
const MIN_VOLTAGE: f64 = 1.0;
const SUMMARY_MAX_CHARS: usize = 100;

struct TriggerPattern {
    pattern: Regex,
    name: &'static str,
}

static TRIGGER_PATTERNS: LazyLock<Vec<TriggerPattern>> = LazyLock::new(|| {
    [
        (r"(?i)as per my last email", "passive-aggression"),
        (r"(?i)we need to talk", "anxiety-inducing"),
        (r"\?{2,}", "interrogative-pressure"),
        (r"!{2,}", "shouting"),
        (r"(?i)ALWAYS|NEVER", "absolutism"),
        (r"(?i)you (always|never)", "character-attack"),
        (r"(?i)obviously|clearly", "condescension"),
        (r"(?i)disappointed", "guilt-tripping"),
        (r"\.\.\.", "trailing-off"),
    ]
    .into_iter()
    .map(|(pattern, name)| TriggerPattern {
        pattern: Regex::new(pattern).expect("trigger pattern must compile"),
        name,
    })
    .collect()
});

static PROFILE_ORDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)must|should|always|duty|rule").expect("regex must compile"));
static PROFILE_ACHIEVER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)efficient|result|goal|achieve|deliver").expect("regex must compile")
});
static PROFILE_GUARDIAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)safe|protect|family|tradition|careful").expect("regex must compile")
});
static PROFILE_INTEGRATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)system|complex|meta|overall|integrate").expect("regex must compile")
});
static DOUBLE_QUESTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\?{2,}").expect("regex must compile"));
static YOU_ALWAYS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)you always").expect("regex must compile"));
static YOU_NEVER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)you never").expect("regex must compile"));
static CONDESCENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)OBVIOUSLY|CLEARLY").expect("regex must compile"));

/// Deterministic local assessment of a combined batch text.
pub fn assess(text: &str) -> Assessment {
    let triggers: Vec<String> = TRIGGER_PATTERNS
        .iter()
        .filter(|entry| entry.pattern.is_match(text))
        .map(|entry| entry.name.to_string())
        .collect();

    let exclamations = text.matches('!').count() as f64;
    let questions = text.matches('?').count() as f64;
    let all_caps = text.chars().count() > 10 && text.to_uppercase() == text;

    let mut voltage = 1.0;
    voltage += triggers.len() as f64 * 1.5;
    voltage += exclamations * 0.5;
    voltage += questions * 0.3;
    if all_caps {
        voltage += 3.0;
    }
    let voltage = voltage.clamp(MIN_VOLTAGE, MAX_VOLTAGE);

    Assessment {
        voltage,
        triggers,
        summary: summarize(text),
        translation: Some(translate(text)),
        why: Some(explain(voltage)),
        sender_profile: Some(detect_profile(text)),
    }
}

/// Bottom-line-up-front: first sentence of the batch, truncated.
fn summarize(text: &str) -> String {
    let first_sentence = text
        .split(['.', '!', '?'])
        .map(str::trim)
        .find(|sentence| !sentence.is_empty());

    match first_sentence {
        Some(sentence) => {
            let clipped: String = sentence.chars().take(SUMMARY_MAX_CHARS).collect();
            format!("Sender is communicating: {clipped}...")
        }
        None => "Message received (content unclear).".to_string(),
    }
}

/// De-escalated rewrite: drops shouting punctuation, absolutist phrasing,
/// and condescension markers while keeping the words.
fn translate(text: &str) -> String {
    let calmed = text.replace('!', ".");
    let calmed = DOUBLE_QUESTION.replace_all(&calmed, "?");
    let calmed = YOU_ALWAYS.replace_all(&calmed, "sometimes");
    let calmed = YOU_NEVER.replace_all(&calmed, "sometimes");
    let calmed = CONDESCENSION.replace_all(&calmed, "");
    calmed.trim().to_string()
}

fn explain(voltage: f64) -> String {
    if voltage > 5.0 {
        "The sender appears stressed or overwhelmed. This is likely situational, not personal."
            .to_string()
    } else {
        "The sender seems relatively calm. Standard communication patterns detected.".to_string()
    }
}

fn detect_profile(text: &str) -> SenderProfile {
    if PROFILE_ORDER.is_match(text) {
        SenderProfile::Order
    } else if PROFILE_ACHIEVER.is_match(text) {
        SenderProfile::Achiever
    } else if PROFILE_GUARDIAN.is_match(text) {
        SenderProfile::Guardian
    } else if PROFILE_INTEGRATOR.is_match(text) {
        SenderProfile::Integrator
    } else {
        SenderProfile::Empath
    }
}
