//! Bedrock Runtime client for answer generation
//!
//! One `InvokeModel` call per request; the body and the answer path depend on
//! the model family resolved from the model identifier.

use async_trait::async_trait;
use reqwest::Method;
use std::sync::Arc;

use super::auth::AwsAuth;
use super::client::{encode_path_segment, AwsServiceClient};
use crate::config::HttpConfig;
use crate::error::Result;
use crate::generation::{ModelFamily, ModelRegistry};
use crate::providers::llm::LlmProvider;
use crate::types::{GenerationRequest, GenerationResult};

/// Bedrock `InvokeModel` client
pub struct BedrockRuntime {
    client: AwsServiceClient,
    registry: ModelRegistry,
}

impl BedrockRuntime {
    /// Create a client with the built-in model families
    pub fn new(auth: Arc<AwsAuth>, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: AwsServiceClient::new(auth, "bedrock-runtime", "bedrock", http)?,
            registry: ModelRegistry::default(),
        })
    }

    /// Create from an existing service client
    pub fn from_client(client: AwsServiceClient) -> Self {
        Self {
            client,
            registry: ModelRegistry::default(),
        }
    }

    /// Replace the model family registry
    pub fn with_registry(mut self, registry: ModelRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn family_for(&self, model_id: &str) -> ModelFamily {
        self.registry.resolve(model_id)
    }
}

#[async_trait]
impl LlmProvider for BedrockRuntime {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        let family = self.registry.resolve(&request.model_id);
        let body = family.request_body(request);
        let path = format!("/model/{}/invoke", encode_path_segment(&request.model_id));

        tracing::debug!(
            "Invoking {} as {} ({} prompt chars)",
            request.model_id,
            family.name(),
            request.prompt.chars().count()
        );

        let response = self
            .client
            .send_json(Method::POST, &path, Some(&body))
            .await
            .map_err(|e| e.into_generation(&request.model_id))?;

        match family.extract_text(&response) {
            Some(text) => Ok(GenerationResult::new(text)),
            None => {
                tracing::warn!(
                    "No text at the {} response field for {}",
                    family.name(),
                    request.model_id
                );
                Ok(GenerationResult::empty())
            }
        }
    }

    fn name(&self) -> &str {
        "bedrock-runtime"
    }
}
