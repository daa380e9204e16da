//! Bedrock Agent control-plane client (knowledge-base administration)

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;

use super::auth::AwsAuth;
use super::client::{encode_path_segment, AwsServiceClient};
use crate::config::HttpConfig;
use crate::error::{Error, Result};
use crate::providers::admin::{
    DataSourceSummary, IngestionJobSummary, KnowledgeBaseAdmin, KnowledgeBaseSummary,
};

/// Page size requested from list operations
const LIST_PAGE_SIZE: u32 = 100;

/// Bedrock Agent client
pub struct BedrockAgentClient {
    client: AwsServiceClient,
}

impl BedrockAgentClient {
    pub fn new(auth: Arc<AwsAuth>, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: AwsServiceClient::new(auth, "bedrock-agent", "bedrock", http)?,
        })
    }

    pub fn from_client(client: AwsServiceClient) -> Self {
        Self { client }
    }

    /// Follow `nextToken` until the listing is exhausted
    async fn list_all<T: DeserializeOwned>(&self, path: &str, key: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut body = json!({ "maxResults": LIST_PAGE_SIZE });
            if let Some(token) = &next_token {
                body["nextToken"] = Value::String(token.clone());
            }

            let mut page = self.client.send_json(Method::POST, path, Some(&body)).await?;
            items.extend(take_list::<T>(&mut page, key)?);

            next_token = page
                .get("nextToken")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        Ok(items)
    }
}

fn take_list<T: DeserializeOwned>(page: &mut Value, key: &str) -> Result<Vec<T>> {
    match page.get_mut(key).map(Value::take) {
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(list) => serde_json::from_value(list)
            .map_err(|e| Error::internal(format!("Unexpected '{}' shape: {}", key, e))),
    }
}

fn take_document(mut response: Value, key: &str) -> Result<Value> {
    match response.get_mut(key).map(Value::take) {
        Some(document @ Value::Object(_)) => Ok(document),
        _ => Err(Error::internal(format!("Response has no '{}' document", key))),
    }
}

#[async_trait]
impl KnowledgeBaseAdmin for BedrockAgentClient {
    async fn list_knowledge_bases(&self) -> Result<Vec<KnowledgeBaseSummary>> {
        self.list_all("/knowledgebases/", "knowledgeBaseSummaries").await
    }

    async fn get_knowledge_base(&self, knowledge_base_id: &str) -> Result<Value> {
        let path = format!("/knowledgebases/{}", encode_path_segment(knowledge_base_id));
        let response = self.client.send_json(Method::GET, &path, None).await?;
        take_document(response, "knowledgeBase")
    }

    async fn update_knowledge_base(&self, knowledge_base_id: &str, request: &Value) -> Result<Value> {
        let path = format!("/knowledgebases/{}", encode_path_segment(knowledge_base_id));
        let response = self.client.send_json(Method::PUT, &path, Some(request)).await?;
        take_document(response, "knowledgeBase")
    }

    async fn list_data_sources(&self, knowledge_base_id: &str) -> Result<Vec<DataSourceSummary>> {
        let path = format!(
            "/knowledgebases/{}/datasources/",
            encode_path_segment(knowledge_base_id)
        );
        self.list_all(&path, "dataSourceSummaries").await
    }

    async fn get_data_source(&self, knowledge_base_id: &str, data_source_id: &str) -> Result<Value> {
        let path = format!(
            "/knowledgebases/{}/datasources/{}",
            encode_path_segment(knowledge_base_id),
            encode_path_segment(data_source_id)
        );
        let response = self.client.send_json(Method::GET, &path, None).await?;
        take_document(response, "dataSource")
    }

    async fn list_ingestion_jobs(
        &self,
        knowledge_base_id: &str,
        data_source_id: &str,
    ) -> Result<Vec<IngestionJobSummary>> {
        let path = format!(
            "/knowledgebases/{}/datasources/{}/ingestionjobs/",
            encode_path_segment(knowledge_base_id),
            encode_path_segment(data_source_id)
        );
        self.list_all(&path, "ingestionJobSummaries").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_list_parses_summaries() {
        let mut page = json!({
            "knowledgeBaseSummaries": [
                { "knowledgeBaseId": "HBPKZNSUMS", "name": "machinery-kb", "status": "ACTIVE", "updatedAt": "2024-05-01T10:00:00Z" },
                { "knowledgeBaseId": "QX12345678" }
            ],
            "nextToken": "abc"
        });
        let items: Vec<KnowledgeBaseSummary> = take_list(&mut page, "knowledgeBaseSummaries").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name.as_deref(), Some("machinery-kb"));
        assert_eq!(items[1].status, None);
    }

    #[test]
    fn test_take_list_missing_key_is_empty() {
        let mut page = json!({});
        let items: Vec<DataSourceSummary> = take_list(&mut page, "dataSourceSummaries").unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_ingestion_statistics() {
        let mut page = json!({
            "ingestionJobSummaries": [{
                "ingestionJobId": "JOB1",
                "status": "COMPLETE",
                "statistics": { "numberOfDocumentsScanned": 12, "numberOfDocumentsFailed": 1 }
            }]
        });
        let jobs: Vec<IngestionJobSummary> = take_list(&mut page, "ingestionJobSummaries").unwrap();
        let stats = jobs[0].statistics.as_ref().unwrap();
        assert_eq!(stats.number_of_documents_scanned, 12);
        assert_eq!(stats.number_of_documents_failed, 1);
        assert_eq!(stats.number_of_new_documents_indexed, 0);
    }

    #[test]
    fn test_take_document() {
        let doc = take_document(json!({ "knowledgeBase": { "name": "kb" } }), "knowledgeBase").unwrap();
        assert_eq!(doc["name"], "kb");
        assert!(take_document(json!({}), "dataSource").is_err());
    }
}
