use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use deskhub_core::errors::UpstreamError;
use deskhub_core::provider::{GenerateOptions, GenerativeModel};
use deskhub_core::security::ApiKey;

use crate::models;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_OUTPUT: u32 = 8_192;

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiModel {
    client: Client,
    api_key: ApiKey,
    base_url: String,
    model: String,
    display_name: String,
    max_output: u32,
    timeout: Duration,
}

impl GeminiModel {
    /// Build a client for `model`. Unknown model names are passed through
    /// to the API unchanged.
    pub fn new(
        api_key: ApiKey,
        model: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::NetworkError(format!("build HTTP client: {e}")))?;

        let (display_name, max_output) = match models::find_model(model) {
            Some(info) => (info.display_name.to_string(), info.max_output),
            None => (model.to_string(), DEFAULT_MAX_OUTPUT),
        };

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            display_name,
            max_output,
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

/// Single-turn request body.
pub fn build_request_body(prompt: &str, options: &GenerateOptions, max_output: u32) -> Value {
    let mut generation_config = serde_json::Map::new();
    if let Some(temperature) = options.temperature {
        generation_config.insert("temperature".into(), json!(temperature));
    }
    let max_tokens = options
        .max_output_tokens
        .map_or(max_output, |requested| requested.min(max_output));
    generation_config.insert("maxOutputTokens".into(), json!(max_tokens));

    json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": prompt }],
        }],
        "generationConfig": generation_config,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Concatenate the text parts of the first candidate.
pub fn extract_text(body: &str) -> Result<String, UpstreamError> {
    let parsed: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| UpstreamError::InvalidResponse(format!("decode generateContent: {e}")))?;

    if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(UpstreamError::InvalidResponse(format!("prompt blocked: {reason}")));
    }

    let candidate = parsed
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| UpstreamError::InvalidResponse("no candidates".into()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".into());
        return Err(UpstreamError::InvalidResponse(format!(
            "empty candidate (finish reason: {reason})"
        )));
    }
    Ok(text)
}

fn retry_after(resp: &reqwest::Response) -> Option<Duration> {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl GenerativeModel for GeminiModel {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    #[instrument(skip(self, prompt, options), fields(provider = "gemini", model = %self.model))]
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String, UpstreamError> {
        let body = build_request_body(prompt, options, self.max_output);

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose())
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| UpstreamError::from_transport(e.is_timeout(), self.timeout, e.to_string()))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let suggested = retry_after(&resp);
            let body = resp.text().await.unwrap_or_default();
            warn!(status, "generateContent failed");
            return Err(match UpstreamError::from_status(status, body) {
                UpstreamError::RateLimited { .. } => UpstreamError::RateLimited {
                    retry_after: suggested,
                },
                other => other,
            });
        }

        let text = resp
            .text()
            .await
            .map_err(|e| UpstreamError::from_transport(e.is_timeout(), self.timeout, e.to_string()))?;
        let output = extract_text(&text)?;
        debug!(chars = output.len(), "generateContent succeeded");
        Ok(output)
    }
}
