//! Knowledge-base retrieval with failure recovery
//!
//! Ranking belongs to the service: results are capped at `max_results` but
//! never re-sorted or filtered. A failed call is turned into an empty result
//! that still carries the error.

use std::sync::Arc;

use crate::config::KnowledgeBaseConfig;
use crate::error::{Error, Result};
use crate::providers::RetrievalProvider;
use crate::types::{RetrievalQuery, RetrievedPassage, SearchType};

/// Passages from one retrieval, plus the error when the call failed
#[derive(Debug, Default)]
pub struct RetrievalOutcome {
    pub passages: Vec<RetrievedPassage>,
    pub error: Option<Error>,
}

impl RetrievalOutcome {
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Retrieval adapter around a provider
pub struct RetrievalAdapter {
    provider: Arc<dyn RetrievalProvider>,
    max_results: usize,
    search_type: SearchType,
}

impl RetrievalAdapter {
    pub fn new(provider: Arc<dyn RetrievalProvider>, config: &KnowledgeBaseConfig) -> Self {
        Self {
            provider,
            max_results: config.max_results,
            search_type: config.search_type,
        }
    }

    pub fn with_search_type(mut self, search_type: SearchType) -> Self {
        self.search_type = search_type;
        self
    }

    /// Retrieve up to `max_results` passages (configured default when `None`)
    ///
    /// Only a zero `max_results` is an `Err`; service failures come back
    /// inside the outcome.
    pub async fn retrieve(
        &self,
        text: &str,
        knowledge_base_id: &str,
        max_results: Option<usize>,
    ) -> Result<RetrievalOutcome> {
        let max_results = max_results.unwrap_or(self.max_results);
        if max_results == 0 {
            return Err(Error::config("max_results must be at least 1"));
        }

        let query = RetrievalQuery {
            text: text.to_string(),
            knowledge_base_id: knowledge_base_id.to_string(),
            max_results,
            search_type: self.search_type,
        };

        match self.provider.retrieve(&query).await {
            Ok(mut passages) => {
                passages.truncate(max_results);
                tracing::info!(
                    "Retrieved {} passages from {} via {}",
                    passages.len(),
                    knowledge_base_id,
                    self.provider.name()
                );
                Ok(RetrievalOutcome {
                    passages,
                    error: None,
                })
            }
            Err(e) => {
                tracing::warn!("Retrieval from {} failed: {}", knowledge_base_id, e);
                Ok(RetrievalOutcome {
                    passages: Vec::new(),
                    error: Some(e.into_retrieval(knowledge_base_id)),
                })
            }
        }
    }
}
