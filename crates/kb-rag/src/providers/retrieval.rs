//! Retrieval provider trait for knowledge-base search

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{RetrievalQuery, RetrievedPassage};

/// Trait for ranked passage retrieval
///
/// Implementations:
/// - `BedrockKnowledgeBase`: Bedrock Knowledge Bases `Retrieve` API
#[async_trait]
pub trait RetrievalProvider: Send + Sync {
    /// Retrieve passages in the service's rank order
    async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<RetrievedPassage>>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
