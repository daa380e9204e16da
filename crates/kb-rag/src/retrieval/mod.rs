//! Knowledge-base retrieval

pub mod adapter;

pub use adapter::{RetrievalAdapter, RetrievalOutcome};
