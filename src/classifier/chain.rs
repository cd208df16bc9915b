use std::{collections::HashMap, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classifier::{
    adapters::{ProviderAdapter, build_default_adapters},
    credentials::CredentialProvider,
    error::{ClassifierError, internal_error, invalid_config},
    heuristic,
    types::{
        AdapterContext, Assessment, CredentialRef, DEFAULT_ANTHROPIC_ENDPOINT,
        DEFAULT_ANTHROPIC_MODEL, DEFAULT_OLLAMA_ENDPOINT, DEFAULT_OLLAMA_MODEL,
        DEFAULT_OPENAI_ENDPOINT, DEFAULT_OPENAI_MODEL, ProviderDialect, ProviderProfile,
    },
};

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_active_provider() -> ProviderDialect {
    // Local-first: no credential, no cloud round trip.
    ProviderDialect::Ollama
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_active_provider")]
    pub active: ProviderDialect,
    #[serde(default)]
    pub providers: Vec<ProviderProfile>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            active: default_active_provider(),
            providers: Vec::new(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Maps a dialect to its configured connection profile, synthesizing a
/// default profile for dialects the config leaves out.
#[derive(Clone)]
struct ProviderRouter {
    profiles: HashMap<ProviderDialect, ProviderProfile>,
}

impl ProviderRouter {
    fn new(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let mut profiles = HashMap::new();
        for profile in &config.providers {
            if profiles.insert(profile.dialect, profile.clone()).is_some() {
                return Err(invalid_config(format!(
                    "duplicate provider dialect '{}' in classifier.providers",
                    profile.dialect.as_str()
                )));
            }
        }
        Ok(Self { profiles })
    }

    fn select(&self, dialect: ProviderDialect) -> ProviderProfile {
        self.profiles
            .get(&dialect)
            .cloned()
            .unwrap_or_else(|| default_profile(dialect))
    }
}

fn default_profile(dialect: ProviderDialect) -> ProviderProfile {
    ProviderProfile {
        dialect,
        endpoint: None,
        model: None,
        credential: CredentialRef::None,
    }
}

fn default_endpoint(dialect: ProviderDialect) -> &'static str {
    match dialect {
        ProviderDialect::Ollama => DEFAULT_OLLAMA_ENDPOINT,
        ProviderDialect::Anthropic => DEFAULT_ANTHROPIC_ENDPOINT,
        ProviderDialect::OpenAiCompatible => DEFAULT_OPENAI_ENDPOINT,
        ProviderDialect::Heuristic => "",
    }
}

fn default_model(dialect: ProviderDialect) -> &'static str {
    match dialect {
        ProviderDialect::Ollama => DEFAULT_OLLAMA_MODEL,
        ProviderDialect::Anthropic => DEFAULT_ANTHROPIC_MODEL,
        ProviderDialect::OpenAiCompatible => DEFAULT_OPENAI_MODEL,
        ProviderDialect::Heuristic => "",
    }
}

/// Result of one pass through the chain. `degraded` marks that the
/// configured remote provider failed and the heuristic answered instead.
#[derive(Debug, Clone)]
pub struct ChainOutcome {
    pub assessment: Assessment,
    pub provider: ProviderDialect,
    pub degraded: bool,
}

/// Ordered classification strategy: the configured provider first, the
/// heuristic as the terminal, never-failing strategy. `classify` therefore
/// cannot return an error.
#[derive(Clone)]
pub struct ClassifierChain {
    active: ProviderDialect,
    router: ProviderRouter,
    adapters: HashMap<ProviderDialect, Arc<dyn ProviderAdapter>>,
    credential_provider: Arc<dyn CredentialProvider>,
    request_timeout: Duration,
}

impl ClassifierChain {
    pub fn new(
        config: &ClassifierConfig,
        credential_provider: Arc<dyn CredentialProvider>,
    ) -> Result<Self, ClassifierError> {
        Ok(Self {
            active: config.active,
            router: ProviderRouter::new(config)?,
            adapters: build_default_adapters(),
            credential_provider,
            request_timeout: Duration::from_millis(config.request_timeout_ms.max(1)),
        })
    }

    pub fn with_adapters(
        mut self,
        adapters: HashMap<ProviderDialect, Arc<dyn ProviderAdapter>>,
    ) -> Self {
        self.adapters = adapters;
        self
    }

    pub fn active(&self) -> ProviderDialect {
        self.active
    }

    pub fn set_active(&mut self, dialect: ProviderDialect) {
        self.active = dialect;
    }

    pub async fn classify(&self, text: &str) -> ChainOutcome {
        let request_id = Uuid::now_v7().to_string();

        if self.active == ProviderDialect::Heuristic {
            return ChainOutcome {
                assessment: heuristic::assess(text),
                provider: ProviderDialect::Heuristic,
                degraded: false,
            };
        }

        match self.classify_remote(&request_id, text).await {
            Ok(assessment) => ChainOutcome {
                assessment,
                provider: self.active,
                degraded: false,
            },
            Err(err) => {
                tracing::warn!(
                    target: "classifier",
                    request_id = %request_id,
                    provider = self.active.as_str(),
                    kind = ?err.kind,
                    error = %err,
                    "remote classification failed; answering with heuristic"
                );
                ChainOutcome {
                    assessment: heuristic::assess(text),
                    provider: ProviderDialect::Heuristic,
                    degraded: true,
                }
            }
        }
    }

    async fn classify_remote(
        &self,
        request_id: &str,
        text: &str,
    ) -> Result<Assessment, ClassifierError> {
        let profile = self.router.select(self.active);

        // Cloud dialects without a credential are a configuration error;
        // detect before any network attempt.
        if requires_credential(self.active) && matches!(profile.credential, CredentialRef::None) {
            return Err(invalid_config(format!(
                "provider '{}' requires a credential but none is configured",
                self.active.as_str()
            )));
        }

        let credential = self
            .credential_provider
            .resolve(&profile.credential, &profile)
            .await?;

        let adapter = self.adapters.get(&self.active).cloned().ok_or_else(|| {
            internal_error(format!(
                "adapter for dialect '{}' is not registered",
                self.active.as_str()
            ))
        })?;

        let ctx = AdapterContext {
            endpoint: profile
                .endpoint
                .clone()
                .unwrap_or_else(|| default_endpoint(self.active).to_string()),
            model: profile
                .model
                .clone()
                .unwrap_or_else(|| default_model(self.active).to_string()),
            credential,
            timeout: self.request_timeout,
            request_id: request_id.to_string(),
        };

        adapter.assess(ctx, text).await
    }
}

fn requires_credential(dialect: ProviderDialect) -> bool {
    matches!(
        dialect,
        ProviderDialect::OpenAiCompatible | ProviderDialect::Anthropic
    )
}
