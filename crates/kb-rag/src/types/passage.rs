//! Retrieved passages and retrieval requests

use serde::{Deserialize, Serialize};

/// Source shown when the service returns no location for a passage
pub const UNKNOWN_SOURCE: &str = "Unknown source";

/// Search mode forwarded to the knowledge base
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    /// Semantic + keyword search
    #[default]
    Hybrid,
    /// Vector search only
    Semantic,
}

impl SearchType {
    /// Wire value for `overrideSearchType`
    pub fn as_api_str(&self) -> &'static str {
        match self {
            SearchType::Hybrid => "HYBRID",
            SearchType::Semantic => "SEMANTIC",
        }
    }
}

impl std::str::FromStr for SearchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hybrid" => Ok(SearchType::Hybrid),
            "semantic" => Ok(SearchType::Semantic),
            other => Err(format!("unknown search type '{}'", other)),
        }
    }
}

/// A retrieval request against one knowledge base
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalQuery {
    /// Query text
    pub text: String,
    /// Knowledge base ID
    pub knowledge_base_id: String,
    /// Maximum number of passages (always >= 1)
    pub max_results: usize,
    /// Search mode
    pub search_type: SearchType,
}

/// A passage returned by the knowledge base, in service rank order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    /// Passage text
    pub text: String,
    /// Where the passage came from (S3 URI, URL, ...)
    pub source_uri: String,
    /// Relevance score from the service (0 when absent)
    pub relevance_score: f64,
    /// Page number, when the document metadata carries one
    pub page_number: Option<String>,
}

impl RetrievedPassage {
    /// Create a passage with an unknown page
    pub fn new(text: impl Into<String>, source_uri: impl Into<String>, relevance_score: f64) -> Self {
        Self {
            text: text.into(),
            source_uri: source_uri.into(),
            relevance_score,
            page_number: None,
        }
    }

    /// Attach a page number
    pub fn with_page(mut self, page: impl Into<String>) -> Self {
        self.page_number = Some(page.into());
        self
    }
}
