use serde::Deserialize;
use serde_json::Value;

use crate::classifier::{
    error::{ClassifierError, ClassifierErrorKind, protocol_violation},
    types::{Assessment, SenderProfile},
};

/// Instruction block sent to every remote model. The response contract is a
/// single JSON object matching [`WireAssessment`].
pub const ASSESSMENT_PROMPT: &str = r#"Act as a communication mediator. Process the following message using these rules:

1. BLUF_SUMMARY: Give a 1-sentence, emotion-neutral summary of the actual request or fact. Focus on the ACTION, not the emotion.

2. VOLTAGE_SCORE: Rate emotional intensity from 0.0 to 10.0 where:
   - 0.0-3.3 = Low (calm, neutral)
   - 3.4-6.6 = Medium (some tension)
   - 6.7-10.0 = High (hostile, aggressive, or manipulative)

3. TRIGGERS: Identify specific trigger patterns (guilt-tripping, passive-aggression, shouting, absolutism, character attacks).

4. SENDER_PROFILE: Detect the sender's likely communication style:
   - GUARDIAN: Focus on safety, tradition, tribe
   - ORDER: Focus on rules, hierarchy, duty
   - ACHIEVER: Focus on results, efficiency, autonomy
   - EMPATH: Focus on harmony, feelings, inclusion
   - INTEGRATOR: Focus on systems, complexity, meta-analysis

5. TRANSLATION: Rewrite the message to be calm, clear, and kind. Remove the 'sting' but keep the 'meaning.'

6. THE_WHY: Briefly explain why the sender likely sounded that way (e.g., "overwhelmed/tired, not hateful").

Respond ONLY with valid JSON in this exact format:
{
  "bluf": "string",
  "voltage": 0.0,
  "triggers": ["string"],
  "sender_profile": "guardian|order|achiever|empath|integrator",
  "translation": "string",
  "why": "string"
}"#;

pub fn build_prompt(text: &str) -> String {
    format!("{ASSESSMENT_PROMPT}\n\nMessage to process:\n{text}")
}

/// JSON shape the models are asked to emit.
#[derive(Debug, Deserialize)]
struct WireAssessment {
    bluf: String,
    voltage: f64,
    #[serde(default)]
    triggers: Vec<String>,
    #[serde(default)]
    sender_profile: Option<WireSenderProfile>,
    #[serde(default)]
    translation: Option<String>,
    #[serde(default)]
    why: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum WireSenderProfile {
    Guardian,
    Order,
    Achiever,
    Empath,
    Integrator,
}

impl From<WireSenderProfile> for SenderProfile {
    fn from(wire: WireSenderProfile) -> Self {
        match wire {
            WireSenderProfile::Guardian => SenderProfile::Guardian,
            WireSenderProfile::Order => SenderProfile::Order,
            WireSenderProfile::Achiever => SenderProfile::Achiever,
            WireSenderProfile::Empath => SenderProfile::Empath,
            WireSenderProfile::Integrator => SenderProfile::Integrator,
        }
    }
}

/// Models frequently wrap the JSON object in prose or code fences; take the
/// outermost `{...}` span before parsing.
pub fn extract_json_object(text: &str) -> Result<&str, ClassifierError> {
    let start = text
        .find('{')
        .ok_or_else(|| protocol_violation("response contains no JSON object"))?;
    let end = text
        .rfind('}')
        .ok_or_else(|| protocol_violation("response contains an unterminated JSON object"))?;
    if end < start {
        return Err(protocol_violation("response contains no JSON object"));
    }
    Ok(&text[start..=end])
}

pub fn parse_assessment(raw: &str) -> Result<Assessment, ClassifierError> {
    let wire: WireAssessment = serde_json::from_str(raw)
        .map_err(|err| protocol_violation(format!("invalid assessment payload: {err}")))?;
    Ok(Assessment {
        voltage: wire.voltage,
        triggers: wire.triggers,
        summary: wire.bluf,
        translation: wire.translation,
        why: wire.why,
        sender_profile: wire.sender_profile.map(SenderProfile::from),
    })
}

pub fn map_http_error(status: u16, body: &str) -> ClassifierError {
    let normalized_body = body.chars().take(240).collect::<String>();

    let mut err = if status == 401 || status == 403 {
        ClassifierError::new(ClassifierErrorKind::Authentication, "authentication failed")
    } else if (400..500).contains(&status) {
        ClassifierError::new(
            ClassifierErrorKind::BackendPermanent,
            format!("provider returned status {status}"),
        )
    } else {
        ClassifierError::new(
            ClassifierErrorKind::BackendTransient,
            format!("provider returned status {status}"),
        )
    };

    err = err.with_provider_http_status(status);
    if !normalized_body.is_empty() {
        err.message = format!("{}: {}", err.message, normalized_body);
    }
    err
}

pub fn map_request_error(err: &reqwest::Error) -> ClassifierError {
    if err.is_timeout() {
        ClassifierError::new(ClassifierErrorKind::Timeout, "provider request timed out")
    } else {
        ClassifierError::new(
            ClassifierErrorKind::BackendTransient,
            format!("provider request failed: {err}"),
        )
    }
}

pub fn string_field<'a>(payload: &'a Value, pointer: &str) -> Result<&'a str, ClassifierError> {
    payload
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| protocol_violation(format!("response is missing text at '{pointer}'")))
}
