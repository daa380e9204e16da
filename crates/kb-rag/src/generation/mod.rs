//! Prompt assembly, model-family request shaping and reference formatting

pub mod citation;
pub mod model_family;
pub mod prompt;

pub use citation::{format_references, format_search_results, preview};
pub use model_family::{ModelFamily, ModelRegistry};
pub use prompt::PromptBuilder;
