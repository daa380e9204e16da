//! Generation request/response types

use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;

/// Returned when the model answered but the expected text field was missing
pub const NO_RESPONSE_GENERATED: &str = "No response generated";

/// Parameters for one text-generation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub model_id: String,
    pub prompt: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl GenerationRequest {
    /// Build a request from the configured sampling parameters
    pub fn from_config(config: &GenerationConfig, prompt: impl Into<String>) -> Self {
        Self {
            model_id: config.model_id.clone(),
            prompt: prompt.into(),
            temperature: config.temperature,
            top_p: config.top_p,
            max_tokens: config.max_tokens,
        }
    }
}

/// Text produced by the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub answer_text: String,
}

impl GenerationResult {
    pub fn new(answer_text: impl Into<String>) -> Self {
        Self {
            answer_text: answer_text.into(),
        }
    }

    /// Model was reached but no text was found at the expected field
    pub fn empty() -> Self {
        Self::new(NO_RESPONSE_GENERATED)
    }

    pub fn is_empty_response(&self) -> bool {
        self.answer_text == NO_RESPONSE_GENERATED
    }
}
