//! LLM provider trait for text generation

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{GenerationRequest, GenerationResult};

/// Trait for text generation
///
/// Implementations:
/// - `BedrockRuntime`: Bedrock `InvokeModel` with per-family request shaping
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate text for a fully assembled prompt
    ///
    /// Fails with `Error::Generation` when the model could not be reached or
    /// rejected the request.
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
