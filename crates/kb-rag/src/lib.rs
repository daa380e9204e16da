//! kb-rag: operator tools for Amazon Bedrock knowledge bases
//!
//! The core is a grounded question-answering pipeline: a domain check, ranked
//! retrieval from a knowledge base, prompt assembly, answer generation with a
//! Bedrock foundation model and a numbered reference list. Around it sit the
//! administrative tools: model updates with status polling, knowledge-base
//! diagnostics, SQL through the RDS Data API and a PDF text check.

pub mod admin;
pub mod config;
pub mod error;
pub mod generation;
pub mod inspection;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod types;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::KbRagConfig;
pub use error::{Error, Result, ServiceError};
pub use pipeline::QueryAnswerPipeline;
pub use types::{
    GenerationRequest, GenerationResult, PipelineOutcome, QueryAnswer, ReferenceList,
    RetrievedPassage,
};
