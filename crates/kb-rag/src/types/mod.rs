//! Core data types

pub mod generation;
pub mod passage;
pub mod response;

pub use generation::{GenerationRequest, GenerationResult, NO_RESPONSE_GENERATED};
pub use passage::{RetrievalQuery, RetrievedPassage, SearchType, UNKNOWN_SOURCE};
pub use response::{ManagedAnswer, PipelineOutcome, QueryAnswer, ReferenceList, NO_REFERENCES};
