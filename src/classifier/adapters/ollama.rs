use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, header};
use serde_json::{Value, json};

use crate::classifier::{
    adapters::{ProviderAdapter, http_common},
    error::{ClassifierError, protocol_violation},
    types::{AdapterContext, Assessment, ProviderDialect},
};

/// Local-network model endpoint. No credential; the generate API is asked
/// for a single non-streamed JSON completion.
#[derive(Clone)]
pub struct OllamaAdapter {
    client: Client,
}

impl Default for OllamaAdapter {
    fn default() -> Self {
        Self {
            client: Client::builder()
                .pool_idle_timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client must build"),
        }
    }
}

#[async_trait]
impl ProviderAdapter for OllamaAdapter {
    fn dialect(&self) -> ProviderDialect {
        ProviderDialect::Ollama
    }

    async fn assess(
        &self,
        ctx: AdapterContext,
        text: &str,
    ) -> Result<Assessment, ClassifierError> {
        let url = format!("{}/api/generate", ctx.endpoint.trim_end_matches('/'));
        let body = json!({
            "model": ctx.model,
            "prompt": http_common::build_prompt(text),
            "stream": false,
            "format": "json",
            "options": {
                "temperature": 0.3,
                "num_predict": 1024,
            },
        });

        let request_started_at = Instant::now();
        tracing::debug!(
            target: "classifier.ollama",
            request_id = %ctx.request_id,
            model = %ctx.model,
            url = %url,
            timeout_ms = ctx.timeout.as_millis() as u64,
            "ollama_dispatch_start"
        );

        let response = self
            .client
            .post(url)
            .timeout(ctx.timeout)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-request-id", ctx.request_id.clone())
            .json(&body)
            .send()
            .await
            .map_err(|err| http_common::map_request_error(&err))?;

        let status = response.status();
        tracing::debug!(
            target: "classifier.ollama",
            request_id = %ctx.request_id,
            status = status.as_u16(),
            elapsed_ms = request_started_at.elapsed().as_millis() as u64,
            "ollama_http_headers"
        );
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(http_common::map_http_error(status.as_u16(), &body));
        }

        let payload = response
            .json::<Value>()
            .await
            .map_err(|err| protocol_violation(format!("invalid ollama response payload: {err}")))?;
        let completion = http_common::string_field(&payload, "/response")?;

        let raw = http_common::extract_json_object(completion)?;
        http_common::parse_assessment(raw)
    }
}
