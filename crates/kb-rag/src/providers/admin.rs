//! Knowledge-base administration trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Entry from `ListKnowledgeBases`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBaseSummary {
    pub knowledge_base_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub updated_at: Option<Value>,
}

/// Entry from `ListDataSources`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceSummary {
    pub data_source_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Document counters of an ingestion job
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionStatistics {
    #[serde(default)]
    pub number_of_documents_scanned: i64,
    #[serde(default)]
    pub number_of_new_documents_indexed: i64,
    #[serde(default)]
    pub number_of_modified_documents_indexed: i64,
    #[serde(default)]
    pub number_of_documents_deleted: i64,
    #[serde(default)]
    pub number_of_documents_failed: i64,
}

/// Entry from `ListIngestionJobs`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionJobSummary {
    pub ingestion_job_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub started_at: Option<Value>,
    #[serde(default)]
    pub updated_at: Option<Value>,
    #[serde(default)]
    pub statistics: Option<IngestionStatistics>,
}

/// Trait for knowledge-base control-plane calls
///
/// Knowledge-base and data-source documents are kept as raw JSON so an
/// update can send back fields this crate does not model.
///
/// Implementations:
/// - `BedrockAgentClient`: Bedrock Agent control-plane API
#[async_trait]
pub trait KnowledgeBaseAdmin: Send + Sync {
    async fn list_knowledge_bases(&self) -> Result<Vec<KnowledgeBaseSummary>>;

    /// The `knowledgeBase` document
    async fn get_knowledge_base(&self, knowledge_base_id: &str) -> Result<Value>;

    /// Submit an `UpdateKnowledgeBase` body; returns the updated document
    async fn update_knowledge_base(&self, knowledge_base_id: &str, request: &Value) -> Result<Value>;

    async fn list_data_sources(&self, knowledge_base_id: &str) -> Result<Vec<DataSourceSummary>>;

    /// The `dataSource` document
    async fn get_data_source(&self, knowledge_base_id: &str, data_source_id: &str) -> Result<Value>;

    async fn list_ingestion_jobs(
        &self,
        knowledge_base_id: &str,
        data_source_id: &str,
    ) -> Result<Vec<IngestionJobSummary>>;
}
