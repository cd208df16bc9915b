use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";
pub const DEFAULT_ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProviderDialect {
    Ollama,
    OpenAiCompatible,
    Anthropic,
    Heuristic,
}

impl ProviderDialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderDialect::Ollama => "ollama",
            ProviderDialect::OpenAiCompatible => "openai_compatible",
            ProviderDialect::Anthropic => "anthropic",
            ProviderDialect::Heuristic => "heuristic",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialRef {
    Env { var: String },
    InlineToken { token: String },
    None,
}

impl Default for CredentialRef {
    fn default() -> Self {
        Self::None
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedCredential {
    pub auth_header: Option<String>,
    pub extra_headers: Vec<(String, String)>,
}

impl ResolvedCredential {
    pub fn none() -> Self {
        Self {
            auth_header: None,
            extra_headers: Vec::new(),
        }
    }
}

/// Connection parameters for one configured provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub dialect: ProviderDialect,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub credential: CredentialRef,
}

impl ProviderProfile {
    pub fn heuristic() -> Self {
        Self {
            dialect: ProviderDialect::Heuristic,
            endpoint: None,
            model: None,
            credential: CredentialRef::None,
        }
    }
}

/// Sender communication style detected by the providers. Carried through to
/// the feed so responses can be phrased for the sender; also selectable as
/// the user's own profile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SenderProfile {
    Guardian,
    Order,
    Achiever,
    Empath,
    Integrator,
}

/// Structured output of a classification pass over one combined batch.
///
/// `voltage` is an intensity score, practically 0..10. `triggers` holds the
/// matched high-arousal pattern names. `summary` is a one-sentence neutral
/// restatement of the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub voltage: f64,
    pub triggers: Vec<String>,
    pub summary: String,
    #[serde(default)]
    pub translation: Option<String>,
    #[serde(default)]
    pub why: Option<String>,
    #[serde(default)]
    pub sender_profile: Option<SenderProfile>,
}

#[derive(Debug, Clone)]
pub struct AdapterContext {
    pub endpoint: String,
    pub model: String,
    pub credential: ResolvedCredential,
    pub timeout: Duration,
    pub request_id: String,
}
