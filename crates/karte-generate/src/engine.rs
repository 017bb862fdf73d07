use std::time::Duration;

use async_trait::async_trait;
use karte_core::GeneratorSettings;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{GenerateError, GENERIC_UPSTREAM_MESSAGE};
use crate::parse;

/// Status and decoded body of one upstream call. A body that is not JSON is `Null`.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: u16,
    pub body: Value,
}

impl UpstreamReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport to the generative-completion service.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// POST `body` to `endpoint`, authenticating with `api_key`.
    async fn post(
        &self,
        endpoint: &str,
        api_key: &str,
        body: &Value,
    ) -> Result<UpstreamReply, GenerateError>;
}

/// reqwest-backed client. The key travels as the `key` query parameter.
#[derive(Clone)]
pub struct HttpCompletionClient {
    client: reqwest::Client,
}

impl HttpCompletionClient {
    /// `timeout` of `None` leaves the call unbounded.
    pub fn new(timeout: Option<Duration>) -> Result<Self, GenerateError> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn post(
        &self,
        endpoint: &str,
        api_key: &str,
        body: &Value,
    ) -> Result<UpstreamReply, GenerateError> {
        let response = self
            .client
            .post(endpoint)
            .query(&[("key", api_key)])
            .json(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Ok(UpstreamReply { status, body })
    }
}

/// Request body asking for a strict JSON completion of `prompt`.
pub fn request_body(prompt: &str) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": { "response_mime_type": "application/json" }
    })
}

/// Issue one completion call and return the generated text.
/// Fails before any network call when no key is configured.
pub async fn complete(
    client: &dyn CompletionClient,
    settings: &GeneratorSettings,
    prompt: &str,
) -> Result<String, GenerateError> {
    let api_key = settings.api_key().ok_or(GenerateError::MissingApiKey)?;
    let endpoint = settings.endpoint_url();

    debug!(model = %settings.model, prompt_len = prompt.len(), "sending completion request");

    let reply = client.post(&endpoint, api_key, &request_body(prompt)).await?;

    if !reply.is_success() {
        let message = parse::upstream_error_message(&reply.body)
            .unwrap_or_else(|| GENERIC_UPSTREAM_MESSAGE.to_string());
        warn!(status = reply.status, %message, "upstream rejected completion request");
        return Err(GenerateError::Upstream(message));
    }

    parse::extract_text(&reply.body)
}
