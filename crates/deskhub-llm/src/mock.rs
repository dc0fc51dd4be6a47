use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use deskhub_core::errors::UpstreamError;
use deskhub_core::provider::{GenerateOptions, GenerativeModel};

/// Pre-programmed responses for deterministic testing without API calls.
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Return this text.
    Text(String),
    /// Fail with this error.
    Error(UpstreamError),
    /// Wait a duration, then resolve the inner response.
    Delay(Duration, Box<MockResponse>),
}

impl MockResponse {
    pub fn text(text: &str) -> Self {
        Self::Text(text.to_string())
    }

    /// Convenience: wrap any response with a delay.
    pub fn delayed(delay: Duration, inner: MockResponse) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Mock model that returns pre-programmed responses in sequence and records
/// every prompt it receives.
pub struct MockModel {
    responses: Vec<MockResponse>,
    call_count: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockModel {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses,
            call_count: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl GenerativeModel for MockModel {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    fn display_name(&self) -> &str {
        "Mock Model"
    }

    async fn generate(
        &self,
        prompt: &str,
        _options: &GenerateOptions,
    ) -> Result<String, UpstreamError> {
        let idx = self.call_count.fetch_add(1, Ordering::Relaxed);
        self.prompts.lock().push(prompt.to_string());

        let Some(response) = self.responses.get(idx) else {
            return Err(UpstreamError::InvalidRequest(format!(
                "MockModel: no response configured for call {idx}"
            )));
        };

        resolve_response(response).await
    }
}

/// Resolve a MockResponse, handling Delay by sleeping first.
/// Unrolls nested delays iteratively to avoid recursive async.
async fn resolve_response(response: &MockResponse) -> Result<String, UpstreamError> {
    let mut current = response;
    loop {
        match current {
            MockResponse::Text(text) => return Ok(text.clone()),
            MockResponse::Error(e) => return Err(e.clone()),
            MockResponse::Delay(duration, inner) => {
                tokio::time::sleep(*duration).await;
                current = inner;
            }
        }
    }
}
