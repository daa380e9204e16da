//! Prompt templates for answer generation and domain classification

use crate::types::RetrievedPassage;

/// Instruction telling the model to decline when the context is not enough
pub const DECLINE_INSTRUCTION: &str =
    "If you don't know the answer, just say that you don't know, don't try to make up an answer.";

/// Prompt builder for knowledge-base queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Label each passage "Source i:" in rank order, separated by blank lines
    ///
    /// Passages are never truncated.
    pub fn build_context(passages: &[RetrievedPassage]) -> String {
        passages
            .iter()
            .enumerate()
            .map(|(i, passage)| format!("Source {}:\n{}", i + 1, passage.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Full grounded prompt for a question and its retrieved passages
    pub fn build_prompt(question: &str, passages: &[RetrievedPassage]) -> String {
        format!(
            r#"Use the following pieces of context to answer the question at the end.
{decline}

{context}

Question: {question}
Helpful Answer:"#,
            decline = DECLINE_INSTRUCTION,
            context = Self::build_context(passages),
            question = question
        )
    }

    /// Yes/no classification prompt for the domain check
    pub fn build_classification_prompt(question: &str, domain: &str) -> String {
        format!(
            r#"You are a strict classifier. Decide whether the question below is about {domain}.
Answer with a single word: YES if it is about {domain}, NO otherwise.

Question: {question}
Answer:"#,
            domain = domain,
            question = question
        )
    }
}
