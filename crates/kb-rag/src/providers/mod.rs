//! Provider abstractions for retrieval, generation and administration
//!
//! The pipeline only sees these traits, so the Bedrock clients can be swapped
//! for in-memory fakes in tests.

pub mod admin;
pub mod aws;
pub mod llm;
pub mod retrieval;

pub use admin::KnowledgeBaseAdmin;
pub use llm::LlmProvider;
pub use retrieval::RetrievalProvider;
