pub mod anthropic;
pub mod http_common;
pub mod ollama;
pub mod openai_compatible;

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;

use crate::classifier::{
    error::ClassifierError,
    types::{AdapterContext, Assessment, ProviderDialect},
};

/// One remote classification capability. Adapters are stateless beyond their
/// HTTP client; connection parameters arrive per call in [`AdapterContext`].
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn dialect(&self) -> ProviderDialect;

    async fn assess(
        &self,
        ctx: AdapterContext,
        text: &str,
    ) -> Result<Assessment, ClassifierError>;
}

pub fn build_default_adapters() -> HashMap<ProviderDialect, Arc<dyn ProviderAdapter>> {
    let mut adapters: HashMap<ProviderDialect, Arc<dyn ProviderAdapter>> = HashMap::new();
    adapters.insert(
        ProviderDialect::Ollama,
        Arc::new(ollama::OllamaAdapter::default()),
    );
    adapters.insert(
        ProviderDialect::OpenAiCompatible,
        Arc::new(openai_compatible::OpenAiCompatibleAdapter::default()),
    );
    adapters.insert(
        ProviderDialect::Anthropic,
        Arc::new(anthropic::AnthropicAdapter::default()),
    );
    adapters
}
