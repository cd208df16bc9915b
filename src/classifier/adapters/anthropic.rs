use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header};
use serde_json::{Value, json};

use crate::classifier::{
    adapters::{ProviderAdapter, http_common},
    error::{ClassifierError, protocol_violation},
    types::{AdapterContext, Assessment, ProviderDialect},
};

const MAX_TOKENS: u64 = 1024;

/// Anthropic messages API. The credential arrives as `x-api-key` plus the
/// `anthropic-version` header, resolved upstream.
#[derive(Clone)]
pub struct AnthropicAdapter {
    client: Client,
}

impl Default for AnthropicAdapter {
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
impl ProviderAdapter for AnthropicAdapter {
    fn dialect(&self) -> ProviderDialect {
        ProviderDialect::Anthropic
    }

    async fn assess(
        &self,
        ctx: AdapterContext,
        text: &str,
    ) -> Result<Assessment, ClassifierError> {
        let url = format!("{}/v1/messages", ctx.endpoint.trim_end_matches('/'));
        let body = json!({
            "model": ctx.model,
            "max_tokens": MAX_TOKENS,
            "messages": [
                {"role": "user", "content": http_common::build_prompt(text)},
            ],
        });

        let mut request = self
            .client
            .post(url)
            .timeout(ctx.timeout)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-request-id", ctx.request_id.clone())
            .json(&body);
        for (name, value) in &ctx.credential.extra_headers {
            request = request.header(name, value);
        }

        tracing::debug!(
            target: "classifier.anthropic",
            request_id = %ctx.request_id,
            model = %ctx.model,
            timeout_ms = ctx.timeout.as_millis() as u64,
            "messages_dispatch"
        );

        let response = request
            .send()
            .await
            .map_err(|err| http_common::map_request_error(&err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(http_common::map_http_error(status.as_u16(), &body));
        }

        let payload = response
            .json::<Value>()
            .await
            .map_err(|err| protocol_violation(format!("invalid messages payload: {err}")))?;
        let completion = http_common::string_field(&payload, "/content/0/text")?;

        let raw = http_common::extract_json_object(completion)?;
        http_common::parse_assessment(raw)
    }
}
