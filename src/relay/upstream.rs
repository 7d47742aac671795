use super::conversation::Message;
use super::framer::{self, LineStream};
use super::functions;
use crate::config::UpstreamConfig;
use crate::error::AppError;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    functions: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<&'static str>,
    stream: bool,
}

/// Streaming client for the chat-completion API.
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    config: UpstreamConfig,
}

impl UpstreamClient {
    pub fn new(http: reqwest::Client, config: UpstreamConfig) -> Self {
        Self { http, config }
    }

    pub fn has_api_key(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Start one streaming completion. With `with_functions` the FAQ catalogue
    /// is declared and the model may choose to call it.
    pub async fn stream_completion(
        &self,
        messages: &[Message],
        with_functions: bool,
    ) -> Result<LineStream, AppError> {
        let api_key = self.config.api_key.as_deref().ok_or(AppError::MissingApiKey)?;

        let body = ChatRequest {
            model: &self.config.model,
            messages,
            functions: with_functions.then(functions::definitions),
            function_call: with_functions.then_some("auto"),
            stream: true,
        };

        log::debug!(
            "Opening upstream stream: {} messages, functions={}",
            messages.len(),
            with_functions
        );

        let resp = self
            .http
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let error_body = resp.text().await.unwrap_or_default();
            log::error!("Upstream API error {}: {}", status, error_body);
            return Err(AppError::Upstream {
                status: status.as_u16(),
                body: upstream_message(&error_body),
            });
        }

        Ok(framer::sse_lines(resp.bytes_stream()))
    }
}

/// `error.message` of an OpenAI-style error body, or the raw body.
fn upstream_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
