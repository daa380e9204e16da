//! Pipeline outcomes and formatted references

use std::fmt;

use serde::{Deserialize, Serialize};

use super::passage::RetrievedPassage;
use crate::error::Error;

/// Sentinel entry used when there is nothing to cite
pub const NO_REFERENCES: &str = "No references found.";

/// Formatted citations, one per passage, in retrieval rank order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceList {
    entries: Vec<String>,
    found: bool,
}

impl ReferenceList {
    /// Build from formatted entries; an empty list becomes the sentinel
    pub fn from_entries(entries: Vec<String>) -> Self {
        if entries.is_empty() {
            return Self {
                entries: vec![NO_REFERENCES.to_string()],
                found: false,
            };
        }
        Self {
            entries,
            found: true,
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// False when the list only holds the sentinel
    pub fn references_found(&self) -> bool {
        self.found
    }
}

impl fmt::Display for ReferenceList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.entries.join("\n"))
    }
}

/// Successful end of the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAnswer {
    /// Generated answer
    pub answer: String,
    /// Formatted references
    pub references: ReferenceList,
    /// Passages the answer was grounded on, in rank order
    pub passages: Vec<RetrievedPassage>,
    /// Model that produced the answer
    pub model_id: String,
    /// Wall-clock time for the whole pipeline
    pub elapsed_ms: u64,
}

/// Terminal state of one pipeline invocation
#[derive(Debug)]
pub enum PipelineOutcome {
    /// The question is outside the configured domain
    Rejected { query: String },
    /// The knowledge base returned nothing
    NoResults,
    /// Retrieval failed; recovered into an empty result set
    RetrievalFailed { error: Error },
    /// An answer with references
    Answered(QueryAnswer),
}

impl PipelineOutcome {
    /// Stable name of the terminal state, used in logs
    pub fn state(&self) -> &'static str {
        match self {
            PipelineOutcome::Rejected { .. } => "REJECTED",
            PipelineOutcome::NoResults => "NO_RESULTS",
            PipelineOutcome::RetrievalFailed { .. } => "RETRIEVAL_FAILED",
            PipelineOutcome::Answered(_) => "DONE",
        }
    }

    pub fn answer(&self) -> Option<&QueryAnswer> {
        match self {
            PipelineOutcome::Answered(answer) => Some(answer),
            _ => None,
        }
    }
}

/// Answer produced by the service-side retrieve-and-generate call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedAnswer {
    pub text: String,
    /// Cited passages, in citation order
    pub passages: Vec<RetrievedPassage>,
    pub session_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_reference_list_is_sentinel() {
        let refs = ReferenceList::from_entries(Vec::new());
        assert!(!refs.references_found());
        assert_eq!(refs.entries(), &[NO_REFERENCES.to_string()]);
        assert_eq!(refs.to_string(), NO_REFERENCES);
    }

    #[test]
    fn test_outcome_state_names() {
        assert_eq!(PipelineOutcome::NoResults.state(), "NO_RESULTS");
        let rejected = PipelineOutcome::Rejected {
            query: "What's the weather today?".to_string(),
        };
        assert_eq!(rejected.state(), "REJECTED");
        assert!(rejected.answer().is_none());
    }
}
