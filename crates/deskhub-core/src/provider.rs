use async_trait::async_trait;

use crate::errors::UpstreamError;

/// Options controlling a single generation call.
#[derive(Clone, Debug)]
pub struct GenerateOptions {
    pub max_output_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            max_output_tokens: None,
            temperature: Some(0.7),
        }
    }
}

/// Trait implemented by each generative-language backend.
///
/// Implementations are only constructed when a credential is available, so
/// "not configured" is expressed by the absence of a model, not by an error.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    fn name(&self) -> &str;
    fn model(&self) -> &str;
    fn display_name(&self) -> &str;

    /// Run a single-turn prompt and return the concatenated text of the reply.
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String, UpstreamError>;
}
