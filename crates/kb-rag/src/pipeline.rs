//! Query-and-answer pipeline
//!
//! validate → retrieve → assemble prompt → generate → format references.
//! Rejection, an empty knowledge base answer and a failed retrieval all end
//! the run without calling the model.

use std::sync::Arc;
use std::time::Instant;

use crate::config::{GenerationConfig, KbRagConfig};
use crate::error::{Error, Result};
use crate::generation::{format_references, PromptBuilder};
use crate::providers::{LlmProvider, RetrievalProvider};
use crate::retrieval::RetrievalAdapter;
use crate::types::{GenerationRequest, PipelineOutcome, QueryAnswer, SearchType};
use crate::validation::DomainValidator;

/// Grounded question answering over one knowledge base
pub struct QueryAnswerPipeline {
    retrieval: RetrievalAdapter,
    llm: Arc<dyn LlmProvider>,
    validator: Option<DomainValidator>,
    validation_model: String,
    generation: GenerationConfig,
    max_results: Option<usize>,
}

impl QueryAnswerPipeline {
    /// Build from injected providers; validation follows `config.validation.enabled`
    pub fn new(
        retriever: Arc<dyn RetrievalProvider>,
        llm: Arc<dyn LlmProvider>,
        config: &KbRagConfig,
    ) -> Self {
        let validator = config
            .validation
            .enabled
            .then(|| DomainValidator::new(llm.clone(), &config.validation));

        Self {
            retrieval: RetrievalAdapter::new(retriever, &config.knowledge_base),
            llm,
            validator,
            validation_model: config.validation_model().to_string(),
            generation: config.generation.clone(),
            max_results: None,
        }
    }

    /// Skip the domain check
    pub fn without_validation(mut self) -> Self {
        self.validator = None;
        self
    }

    /// Override the configured result count
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn with_search_type(mut self, search_type: SearchType) -> Self {
        self.retrieval = self.retrieval.with_search_type(search_type);
        self
    }

    pub fn model_id(&self) -> &str {
        &self.generation.model_id
    }

    /// Run one question through the pipeline
    ///
    /// Errors: `EmptyQuery`, `Validation` when the domain check could not run,
    /// `Generation` when the model call failed, `Config` for a zero result
    /// count.
    pub async fn answer(&self, query: &str, knowledge_base_id: &str) -> Result<PipelineOutcome> {
        let start = Instant::now();
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::EmptyQuery);
        }

        tracing::info!("Query: \"{}\"", query);

        if let Some(validator) = &self.validator {
            if !validator.is_in_domain(query, &self.validation_model).await? {
                tracing::info!("Query rejected: not about {}", validator.domain());
                return Ok(PipelineOutcome::Rejected {
                    query: query.to_string(),
                });
            }
        }

        let retrieved = self
            .retrieval
            .retrieve(query, knowledge_base_id, self.max_results)
            .await?;
        if let Some(error) = retrieved.error {
            return Ok(PipelineOutcome::RetrievalFailed { error });
        }
        if retrieved.passages.is_empty() {
            tracing::info!("No passages found in {}", knowledge_base_id);
            return Ok(PipelineOutcome::NoResults);
        }

        let passages = retrieved.passages;
        let prompt = PromptBuilder::build_prompt(query, &passages);
        let request = GenerationRequest::from_config(&self.generation, prompt);

        tracing::debug!("Generating with {} via {}", request.model_id, self.llm.name());
        let result = self.llm.generate(&request).await?;

        let references = format_references(&passages);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            "Query completed in {}ms, {} references",
            elapsed_ms,
            passages.len()
        );

        Ok(PipelineOutcome::Answered(QueryAnswer {
            answer: result.answer_text.trim().to_string(),
            references,
            passages,
            model_id: request.model_id,
            elapsed_ms,
        }))
    }
}
