use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header};
use serde_json::{Value, json};

use crate::classifier::{
    adapters::{ProviderAdapter, http_common},
    error::{ClassifierError, protocol_violation},
    types::{AdapterContext, Assessment, ProviderDialect},
};

/// Chat-completions dialect. Covers the OpenAI cloud endpoint and any
/// vendor exposing the same wire shape behind an `endpoint` override.
#[derive(Clone)]
pub struct OpenAiCompatibleAdapter {
    client: Client,
}

impl Default for OpenAiCompatibleAdapter {
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
impl ProviderAdapter for OpenAiCompatibleAdapter {
    fn dialect(&self) -> ProviderDialect {
        ProviderDialect::OpenAiCompatible
    }

    async fn assess(
        &self,
        ctx: AdapterContext,
        text: &str,
    ) -> Result<Assessment, ClassifierError> {
        let body = json!({
            "model": ctx.model,
            "messages": [
                {"role": "user", "content": http_common::build_prompt(text)},
            ],
            "temperature": 0.3,
            "response_format": {"type": "json_object"},
        });

        let mut request = self
            .client
            .post(ctx.endpoint.clone())
            .timeout(ctx.timeout)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-request-id", ctx.request_id.clone())
            .json(&body);
        if let Some(auth_header) = &ctx.credential.auth_header {
            request = request.header(header::AUTHORIZATION, auth_header);
        }
        for (name, value) in &ctx.credential.extra_headers {
            request = request.header(name, value);
        }

        tracing::debug!(
            target: "classifier.openai_compatible",
            request_id = %ctx.request_id,
            model = %ctx.model,
            endpoint = %ctx.endpoint,
            timeout_ms = ctx.timeout.as_millis() as u64,
            "chat_completion_dispatch"
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

        let payload = response.json::<Value>().await.map_err(|err| {
            protocol_violation(format!("invalid chat completion payload: {err}"))
        })?;
        let completion = http_common::string_field(&payload, "/choices/0/message/content")?;

        let raw = http_common::extract_json_object(completion)?;
        http_common::parse_assessment(raw)
    }
}
