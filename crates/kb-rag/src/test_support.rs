//! In-memory providers for unit tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, Result, ServiceError};
use crate::providers::admin::{DataSourceSummary, IngestionJobSummary, KnowledgeBaseSummary};
use crate::providers::{KnowledgeBaseAdmin, LlmProvider, RetrievalProvider};
use crate::types::{GenerationRequest, GenerationResult, RetrievalQuery, RetrievedPassage};

/// Retriever returning a fixed passage list, or failing every call
pub struct FakeRetriever {
    passages: Vec<RetrievedPassage>,
    fail: bool,
    pub queries: Mutex<Vec<RetrievalQuery>>,
}

impl FakeRetriever {
    pub fn with_passages(passages: Vec<RetrievedPassage>) -> Self {
        Self {
            passages,
            fail: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            passages: Vec::new(),
            fail: true,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl RetrievalProvider for FakeRetriever {
    async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<RetrievedPassage>> {
        self.queries.lock().unwrap().push(query.clone());
        if self.fail {
            return Err(Error::Retrieval {
                knowledge_base_id: query.knowledge_base_id.clone(),
                source: ServiceError::api(
                    "bedrock-agent-runtime",
                    404,
                    Some("ResourceNotFoundException".to_string()),
                    "knowledge base not found",
                ),
            });
        }
        Ok(self.passages.clone())
    }

    fn name(&self) -> &str {
        "fake-retriever"
    }
}

/// LLM replying from a script; an exhausted script fails the call
pub struct FakeLlm {
    replies: Mutex<VecDeque<String>>,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl FakeLlm {
    pub fn scripted<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, index: usize) -> GenerationRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        self.requests.lock().unwrap().push(request.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(reply) => Ok(GenerationResult::new(reply)),
            None => Err(Error::Generation {
                model_id: request.model_id.clone(),
                source: ServiceError::api(
                    "bedrock-runtime",
                    429,
                    Some("ThrottlingException".to_string()),
                    "rate exceeded",
                ),
            }),
        }
    }

    fn name(&self) -> &str {
        "fake-llm"
    }
}

/// `count` passages with descending scores
pub fn ranked_passages(count: usize) -> Vec<RetrievedPassage> {
    (0..count)
        .map(|i| {
            RetrievedPassage::new(
                format!("passage {}", i + 1),
                format!("s3://machinery-docs/doc{}.pdf", i + 1),
                1.0 - i as f64 * 0.1,
            )
        })
        .collect()
}

/// Control plane serving one knowledge base whose status follows a script
pub struct FakeAdmin {
    pub knowledge_base: Mutex<serde_json::Value>,
    statuses: Mutex<VecDeque<String>>,
    pub updates: Mutex<Vec<serde_json::Value>>,
    pub data_sources: Vec<DataSourceSummary>,
    pub data_source_documents: Vec<serde_json::Value>,
    pub jobs: Vec<IngestionJobSummary>,
}

impl FakeAdmin {
    pub fn new(knowledge_base: serde_json::Value) -> Self {
        Self {
            knowledge_base: Mutex::new(knowledge_base),
            statuses: Mutex::new(VecDeque::new()),
            updates: Mutex::new(Vec::new()),
            data_sources: Vec::new(),
            data_source_documents: Vec::new(),
            jobs: Vec::new(),
        }
    }

    /// Statuses reported by successive `get_knowledge_base` calls; the last repeats
    pub fn with_statuses<I, S>(self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.statuses.lock().unwrap() = statuses.into_iter().map(Into::into).collect();
        self
    }
}

#[async_trait]
impl KnowledgeBaseAdmin for FakeAdmin {
    async fn list_knowledge_bases(&self) -> Result<Vec<KnowledgeBaseSummary>> {
        let kb = self.knowledge_base.lock().unwrap().clone();
        Ok(vec![serde_json::from_value(kb)?])
    }

    async fn get_knowledge_base(&self, _knowledge_base_id: &str) -> Result<serde_json::Value> {
        let mut statuses = self.statuses.lock().unwrap();
        let mut kb = self.knowledge_base.lock().unwrap();
        let next = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        };
        if let Some(status) = next {
            kb["status"] = serde_json::Value::String(status);
        }
        Ok(kb.clone())
    }

    async fn update_knowledge_base(
        &self,
        _knowledge_base_id: &str,
        request: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        self.updates.lock().unwrap().push(request.clone());
        let mut updated = request.clone();
        updated["status"] = serde_json::Value::String("UPDATING".to_string());
        Ok(updated)
    }

    async fn list_data_sources(&self, _knowledge_base_id: &str) -> Result<Vec<DataSourceSummary>> {
        Ok(self.data_sources.clone())
    }

    async fn get_data_source(
        &self,
        _knowledge_base_id: &str,
        data_source_id: &str,
    ) -> Result<serde_json::Value> {
        self.data_source_documents
            .iter()
            .find(|doc| doc["dataSourceId"] == data_source_id)
            .cloned()
            .ok_or_else(|| {
                Error::Service(ServiceError::api(
                    "bedrock-agent",
                    404,
                    Some("ResourceNotFoundException".to_string()),
                    format!("data source {} not found", data_source_id),
                ))
            })
    }

    async fn list_ingestion_jobs(
        &self,
        _knowledge_base_id: &str,
        _data_source_id: &str,
    ) -> Result<Vec<IngestionJobSummary>> {
        Ok(self.jobs.clone())
    }
}
