//! Knowledge-base administration workflows built on `KnowledgeBaseAdmin`

pub mod diagnostics;
pub mod model_update;

pub use diagnostics::{diagnose, DataSourceReport, KnowledgeBaseReport};
pub use model_update::{
    build_update_request, update_generation_model, wait_for_status, UpdateStatus,
    GENERATION_PROMPT_TEMPLATE,
};
