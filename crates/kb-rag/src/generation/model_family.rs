//! Model family registry
//!
//! Bedrock model families disagree on request field names and on where the
//! generated text lives in the response. The registry maps identifier
//! patterns to a family; the family owns both shapes.

use serde_json::{json, Value};

use crate::types::GenerationRequest;

/// Messages API version expected by Anthropic models on Bedrock
pub const ANTHROPIC_BEDROCK_VERSION: &str = "bedrock-2023-05-31";

/// A class of models sharing a request/response schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    /// Claude v2 / Instant text completions (`prompt`, `max_tokens_to_sample`)
    AnthropicCompletions,
    /// Claude 3+ messages API (`messages`, `max_tokens`)
    AnthropicMessages,
    /// Amazon Titan text (`inputText`, `textGenerationConfig`)
    TitanText,
    /// Meta Llama (`prompt`, `max_gen_len`)
    MetaLlama,
    /// Mistral instruct (`prompt`, `max_tokens`)
    Mistral,
    /// Anything else (`prompt`, `max_tokens`); the raw body is the answer
    Generic,
}

impl ModelFamily {
    pub fn name(&self) -> &'static str {
        match self {
            ModelFamily::AnthropicCompletions => "anthropic-completions",
            ModelFamily::AnthropicMessages => "anthropic-messages",
            ModelFamily::TitanText => "titan-text",
            ModelFamily::MetaLlama => "meta-llama",
            ModelFamily::Mistral => "mistral",
            ModelFamily::Generic => "generic",
        }
    }

    /// Build the `InvokeModel` body for this family
    pub fn request_body(&self, request: &GenerationRequest) -> Value {
        match self {
            ModelFamily::AnthropicCompletions => json!({
                "prompt": format!("\n\nHuman: {}\n\nAssistant:", request.prompt),
                "max_tokens_to_sample": request.max_tokens,
                "temperature": request.temperature,
                "top_p": request.top_p,
            }),
            ModelFamily::AnthropicMessages => json!({
                "anthropic_version": ANTHROPIC_BEDROCK_VERSION,
                "max_tokens": request.max_tokens,
                "temperature": request.temperature,
                "top_p": request.top_p,
                "messages": [
                    {
                        "role": "user",
                        "content": [{ "type": "text", "text": request.prompt }]
                    }
                ],
            }),
            ModelFamily::TitanText => json!({
                "inputText": request.prompt,
                "textGenerationConfig": {
                    "maxTokenCount": request.max_tokens,
                    "temperature": request.temperature,
                    "topP": request.top_p,
                },
            }),
            ModelFamily::MetaLlama => json!({
                "prompt": request.prompt,
                "max_gen_len": request.max_tokens,
                "temperature": request.temperature,
                "top_p": request.top_p,
            }),
            ModelFamily::Mistral => json!({
                "prompt": format!("<s>[INST] {} [/INST]", request.prompt),
                "max_tokens": request.max_tokens,
                "temperature": request.temperature,
                "top_p": request.top_p,
            }),
            ModelFamily::Generic => json!({
                "prompt": request.prompt,
                "max_tokens": request.max_tokens,
                "temperature": request.temperature,
                "top_p": request.top_p,
            }),
        }
    }

    /// Locate the generated text in a response body
    ///
    /// `None` means the model answered but the family's field was absent.
    pub fn extract_text(&self, body: &Value) -> Option<String> {
        match self {
            ModelFamily::AnthropicCompletions => string_at(body, &["completion"]),
            ModelFamily::AnthropicMessages => {
                let parts: Vec<&str> = body
                    .get("content")?
                    .as_array()?
                    .iter()
                    .filter(|part| part.get("type").and_then(Value::as_str) == Some("text"))
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.concat())
                }
            }
            ModelFamily::TitanText => body
                .get("results")?
                .get(0)?
                .get("outputText")?
                .as_str()
                .map(str::to_string),
            ModelFamily::MetaLlama => string_at(body, &["generation"]),
            ModelFamily::Mistral => body
                .get("outputs")?
                .get(0)?
                .get("text")?
                .as_str()
                .map(str::to_string),
            ModelFamily::Generic => Some(body.to_string()),
        }
    }
}

fn string_at(body: &Value, path: &[&str]) -> Option<String> {
    let mut current = body;
    for key in path {
        current = current.get(*key)?;
    }
    current.as_str().map(str::to_string)
}

/// Ordered pattern → family table; the first matching pattern wins
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    entries: Vec<(String, ModelFamily)>,
    fallback: ModelFamily,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self {
            entries: vec![
                ("claude-v2".to_string(), ModelFamily::AnthropicCompletions),
                ("claude-instant".to_string(), ModelFamily::AnthropicCompletions),
                ("claude".to_string(), ModelFamily::AnthropicMessages),
                ("titan".to_string(), ModelFamily::TitanText),
                ("llama".to_string(), ModelFamily::MetaLlama),
                ("mistral".to_string(), ModelFamily::Mistral),
            ],
            fallback: ModelFamily::Generic,
        }
    }
}

impl ModelRegistry {
    /// Empty registry resolving everything to `fallback`
    pub fn with_fallback(fallback: ModelFamily) -> Self {
        Self {
            entries: Vec::new(),
            fallback,
        }
    }

    /// Add a pattern ahead of the existing ones
    pub fn register(mut self, pattern: impl Into<String>, family: ModelFamily) -> Self {
        self.entries.insert(0, (pattern.into().to_lowercase(), family));
        self
    }

    /// Family for a model identifier (case-insensitive substring match)
    pub fn resolve(&self, model_id: &str) -> ModelFamily {
        let model_id = model_id.to_lowercase();
        self.entries
            .iter()
            .find(|(pattern, _)| model_id.contains(pattern.as_str()))
            .map(|(_, family)| *family)
            .unwrap_or(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(model_id: &str) -> GenerationRequest {
        GenerationRequest {
            model_id: model_id.to_string(),
            prompt: "What is the payload capacity of the DT1000?".to_string(),
            temperature: 0.5,
            top_p: 0.9,
            max_tokens: 1000,
        }
    }

    #[test]
    fn test_resolve_builtin_families() {
        let registry = ModelRegistry::default();
        assert_eq!(registry.resolve("anthropic.claude-v2"), ModelFamily::AnthropicCompletions);
        assert_eq!(registry.resolve("anthropic.claude-v2:1"), ModelFamily::AnthropicCompletions);
        assert_eq!(
            registry.resolve("anthropic.claude-3-sonnet-20240229-v1:0"),
            ModelFamily::AnthropicMessages
        );
        assert_eq!(registry.resolve("amazon.titan-text-express-v1"), ModelFamily::TitanText);
        assert_eq!(registry.resolve("meta.llama3-8b-instruct-v1:0"), ModelFamily::MetaLlama);
        assert_eq!(registry.resolve("mistral.mistral-7b-instruct-v0:2"), ModelFamily::Mistral);
        assert_eq!(registry.resolve("cohere.command-text-v14"), ModelFamily::Generic);
    }

    #[test]
    fn test_claude_request_uses_anthropic_fields() {
        let req = request("anthropic.claude-v2");
        let body = ModelRegistry::default().resolve(&req.model_id).request_body(&req);

        let prompt = body["prompt"].as_str().unwrap();
        assert!(prompt.starts_with("\n\nHuman: "));
        assert!(prompt.ends_with("\n\nAssistant:"));
        assert_eq!(body["max_tokens_to_sample"], 1000);
        assert!(body.get("inputText").is_none());
        assert!(body.get("textGenerationConfig").is_none());
    }

    #[test]
    fn test_claude_messages_request() {
        let req = request("anthropic.claude-3-haiku-20240307-v1:0");
        let body = ModelRegistry::default().resolve(&req.model_id).request_body(&req);

        assert_eq!(body["anthropic_version"], ANTHROPIC_BEDROCK_VERSION);
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"][0]["text"], req.prompt.as_str());
    }

    #[test]
    fn test_titan_request_uses_titan_fields() {
        let req = request("amazon.titan-text-express-v1");
        let body = ModelRegistry::default().resolve(&req.model_id).request_body(&req);

        assert_eq!(body["inputText"], req.prompt.as_str());
        assert_eq!(body["textGenerationConfig"]["maxTokenCount"], 1000);
        assert!(body["textGenerationConfig"].get("topP").is_some());
        assert!(body.get("prompt").is_none());
        assert!(body.get("max_tokens_to_sample").is_none());
    }

    #[test]
    fn test_extract_text_per_family() {
        let completion = json!({ "completion": " The DT1000 carries 100 tonnes." });
        assert_eq!(
            ModelFamily::AnthropicCompletions.extract_text(&completion).as_deref(),
            Some(" The DT1000 carries 100 tonnes.")
        );

        let messages = json!({ "content": [{ "type": "text", "text": "Hello" }, { "type": "text", "text": " world" }] });
        assert_eq!(
            ModelFamily::AnthropicMessages.extract_text(&messages).as_deref(),
            Some("Hello world")
        );

        let titan = json!({ "results": [{ "outputText": "Titan says hi" }] });
        assert_eq!(ModelFamily::TitanText.extract_text(&titan).as_deref(), Some("Titan says hi"));

        let mistral = json!({ "outputs": [{ "text": "bonjour" }] });
        assert_eq!(ModelFamily::Mistral.extract_text(&mistral).as_deref(), Some("bonjour"));

        let llama = json!({ "generation": "llama text" });
        assert_eq!(ModelFamily::MetaLlama.extract_text(&llama).as_deref(), Some("llama text"));
    }

    #[test]
    fn test_missing_field_is_none() {
        assert!(ModelFamily::AnthropicCompletions.extract_text(&json!({})).is_none());
        assert!(ModelFamily::TitanText.extract_text(&json!({ "results": [] })).is_none());
        assert!(ModelFamily::AnthropicMessages.extract_text(&json!({ "content": [] })).is_none());
        assert!(ModelFamily::Generic.extract_text(&json!({ "text": "x" })).is_some());
    }

    #[test]
    fn test_register_overrides_builtin() {
        let registry = ModelRegistry::default().register("claude-3-5", ModelFamily::Generic);
        assert_eq!(registry.resolve("anthropic.claude-3-5-sonnet-20240620-v1:0"), ModelFamily::Generic);
        assert_eq!(registry.resolve("anthropic.claude-3-opus"), ModelFamily::AnthropicMessages);

        let empty = ModelRegistry::with_fallback(ModelFamily::TitanText);
        assert_eq!(empty.resolve("anything"), ModelFamily::TitanText);
    }
}
