//! Prompt-based domain check
//!
//! The generation model classifies the question with a YES/NO answer. A failed
//! call is an error; an answer that is neither counts as out of domain.

use std::sync::Arc;

use crate::config::ValidationConfig;
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::providers::LlmProvider;
use crate::types::{GenerationRequest, GenerationResult};

/// Token budget for the one-word classification answer
const CLASSIFICATION_MAX_TOKENS: u32 = 10;

/// Parsed classification answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    InDomain,
    OutOfDomain,
    Unclear,
}

/// Interpret a YES/NO answer
///
/// The first word decides. Otherwise a lone standalone YES or NO anywhere in
/// the text does, which covers models whose raw response body is returned as
/// the answer. Both present, or neither, is unclear.
pub fn parse_verdict(answer: &str) -> Verdict {
    let mut words = answer
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_uppercase);

    match words.next().as_deref() {
        Some("YES") | Some("Y") | Some("TRUE") => return Verdict::InDomain,
        Some("NO") | Some("N") | Some("FALSE") => return Verdict::OutOfDomain,
        None => return Verdict::Unclear,
        Some(_) => {}
    }

    let (mut yes, mut no) = (false, false);
    for word in words {
        match word.as_str() {
            "YES" => yes = true,
            "NO" => no = true,
            _ => {}
        }
    }
    match (yes, no) {
        (true, false) => Verdict::InDomain,
        (false, true) => Verdict::OutOfDomain,
        _ => Verdict::Unclear,
    }
}

/// Verdict for a model reply; an empty reply is never a clean NO
fn classify(result: &GenerationResult) -> Verdict {
    if result.is_empty_response() {
        Verdict::Unclear
    } else {
        parse_verdict(&result.answer_text)
    }
}

/// Domain validator backed by an LLM
pub struct DomainValidator {
    llm: Arc<dyn LlmProvider>,
    domain: String,
}

impl DomainValidator {
    pub fn new(llm: Arc<dyn LlmProvider>, config: &ValidationConfig) -> Self {
        Self {
            llm,
            domain: config.domain.clone(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// True when the model says the question belongs to the domain
    pub async fn is_in_domain(&self, query: &str, model_id: &str) -> Result<bool> {
        let request = GenerationRequest {
            model_id: model_id.to_string(),
            prompt: PromptBuilder::build_classification_prompt(query, &self.domain),
            temperature: 0.0,
            top_p: 1.0,
            max_tokens: CLASSIFICATION_MAX_TOKENS,
        };

        let result = self
            .llm
            .generate(&request)
            .await
            .map_err(|e| Error::validation(e.to_string()))?;

        match classify(&result) {
            Verdict::InDomain => Ok(true),
            Verdict::OutOfDomain => Ok(false),
            Verdict::Unclear => {
                tracing::warn!(
                    "Unclear domain classification {:?}; treating as out of domain",
                    result.answer_text
                );
                Ok(false)
            }
        }
    }
}
