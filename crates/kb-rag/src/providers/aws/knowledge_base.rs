//! Bedrock Knowledge Bases client (Retrieve, RetrieveAndGenerate)

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::auth::AwsAuth;
use super::client::{encode_path_segment, AwsServiceClient};
use crate::config::HttpConfig;
use crate::error::{Error, Result};
use crate::providers::retrieval::RetrievalProvider;
use crate::types::{ManagedAnswer, RetrievalQuery, RetrievedPassage, UNKNOWN_SOURCE};

/// Metadata keys that may carry the page number, in lookup order
const PAGE_METADATA_KEYS: &[&str] = &[
    "x-amz-bedrock-kb-document-page-number",
    "page_number",
    "page",
];

/// Metadata keys that may carry the source, in lookup order
const SOURCE_METADATA_KEYS: &[&str] = &["x-amz-bedrock-kb-source-uri", "source"];

/// Bedrock Knowledge Bases runtime client
pub struct BedrockKnowledgeBase {
    client: AwsServiceClient,
}

impl BedrockKnowledgeBase {
    /// Create a client for the auth's region
    pub fn new(auth: Arc<AwsAuth>, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: AwsServiceClient::new(auth, "bedrock-agent-runtime", "bedrock", http)?,
        })
    }

    /// Create from an existing service client
    pub fn from_client(client: AwsServiceClient) -> Self {
        Self { client }
    }

    /// Let the service retrieve and generate in one call
    pub async fn retrieve_and_generate(
        &self,
        query: &RetrievalQuery,
        model_arn: &str,
    ) -> Result<ManagedAnswer> {
        let body = json!({
            "input": { "text": query.text },
            "retrieveAndGenerateConfiguration": {
                "type": "KNOWLEDGE_BASE",
                "knowledgeBaseConfiguration": {
                    "knowledgeBaseId": query.knowledge_base_id,
                    "modelArn": model_arn,
                    "retrievalConfiguration": retrieval_configuration(query),
                }
            }
        });

        let response = self
            .client
            .send_json(Method::POST, "/retrieveAndGenerate", Some(&body))
            .await
            .map_err(|e| e.into_retrieval(&query.knowledge_base_id))?;

        parse_retrieve_and_generate_response(response)
    }
}

#[async_trait]
impl RetrievalProvider for BedrockKnowledgeBase {
    async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<RetrievedPassage>> {
        let body = json!({
            "retrievalQuery": { "text": query.text },
            "retrievalConfiguration": retrieval_configuration(query),
        });
        let path = format!(
            "/knowledgebases/{}/retrieve",
            encode_path_segment(&query.knowledge_base_id)
        );

        let response = self
            .client
            .send_json(Method::POST, &path, Some(&body))
            .await
            .map_err(|e| e.into_retrieval(&query.knowledge_base_id))?;

        parse_retrieve_response(response)
    }

    fn name(&self) -> &str {
        "bedrock-knowledge-base"
    }
}

fn retrieval_configuration(query: &RetrievalQuery) -> Value {
    json!({
        "vectorSearchConfiguration": {
            "numberOfResults": query.max_results,
            "overrideSearchType": query.search_type.as_api_str(),
        }
    })
}

/// ARN for a foundation model; full ARNs pass through unchanged
pub fn foundation_model_arn(region: &str, model_id: &str) -> String {
    if model_id.starts_with("arn:") {
        model_id.to_string()
    } else {
        format!("arn:aws:bedrock:{}::foundation-model/{}", region, model_id)
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RetrieveResponse {
    #[serde(default)]
    retrieval_results: Vec<RetrievalResult>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RetrieveAndGenerateResponse {
    #[serde(default)]
    output: Option<TextHolder>,
    #[serde(default)]
    citations: Vec<ResponseCitation>,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseCitation {
    #[serde(default)]
    retrieved_references: Vec<RetrievalResult>,
}

#[derive(Deserialize)]
struct TextHolder {
    #[serde(default)]
    text: Option<String>,
}

/// One retrieved chunk; also the shape of a cited reference
#[derive(Deserialize)]
struct RetrievalResult {
    #[serde(default)]
    content: Option<TextHolder>,
    #[serde(default)]
    location: Option<ResultLocation>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ResultLocation {
    #[serde(default)]
    s3_location: Option<Map<String, Value>>,
    #[serde(default)]
    web_location: Option<Map<String, Value>>,
    #[serde(default)]
    confluence_location: Option<Map<String, Value>>,
    #[serde(default)]
    salesforce_location: Option<Map<String, Value>>,
    #[serde(default)]
    share_point_location: Option<Map<String, Value>>,
    #[serde(default)]
    kendra_document_location: Option<Map<String, Value>>,
    #[serde(default)]
    custom_document_location: Option<Map<String, Value>>,
}

impl ResultLocation {
    fn uri(&self) -> Option<String> {
        [
            (&self.s3_location, "uri"),
            (&self.web_location, "url"),
            (&self.confluence_location, "url"),
            (&self.salesforce_location, "url"),
            (&self.share_point_location, "url"),
            (&self.kendra_document_location, "uri"),
            (&self.custom_document_location, "id"),
        ]
        .into_iter()
        .find_map(|(location, key)| {
            location
                .as_ref()
                .and_then(|l| l.get(key))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
    }
}

fn metadata_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(i.to_string()),
            None => n.as_f64().map(|f| {
                if f.fract() == 0.0 {
                    format!("{}", f as i64)
                } else {
                    f.to_string()
                }
            }),
        },
        _ => None,
    }
}

impl RetrievalResult {
    fn into_passage(self) -> RetrievedPassage {
        let metadata = self.metadata.unwrap_or_default();
        let lookup = |keys: &[&str]| keys.iter().find_map(|k| metadata.get(*k).and_then(metadata_string));

        let source_uri = self
            .location
            .as_ref()
            .and_then(ResultLocation::uri)
            .or_else(|| lookup(SOURCE_METADATA_KEYS))
            .unwrap_or_else(|| UNKNOWN_SOURCE.to_string());

        RetrievedPassage {
            text: self.content.and_then(|c| c.text).unwrap_or_default(),
            source_uri,
            relevance_score: self.score.unwrap_or(0.0),
            page_number: lookup(PAGE_METADATA_KEYS),
        }
    }
}

/// Map a `Retrieve` response body to passages, keeping service order
pub fn parse_retrieve_response(body: Value) -> Result<Vec<RetrievedPassage>> {
    let response: RetrieveResponse = serde_json::from_value(body)
        .map_err(|e| Error::internal(format!("Unexpected Retrieve response shape: {}", e)))?;
    Ok(response
        .retrieval_results
        .into_iter()
        .map(RetrievalResult::into_passage)
        .collect())
}

/// Map a `RetrieveAndGenerate` response body to a managed answer
pub fn parse_retrieve_and_generate_response(body: Value) -> Result<ManagedAnswer> {
    let response: RetrieveAndGenerateResponse = serde_json::from_value(body).map_err(|e| {
        Error::internal(format!("Unexpected RetrieveAndGenerate response shape: {}", e))
    })?;

    let passages = response
        .citations
        .into_iter()
        .flat_map(|c| c.retrieved_references)
        .map(RetrievalResult::into_passage)
        .collect();

    Ok(ManagedAnswer {
        text: response.output.and_then(|o| o.text).unwrap_or_default(),
        passages,
        session_id: response.session_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_retrieve_response_keeps_order() {
        let body = json!({
            "retrievalResults": [
                {
                    "content": { "text": "The DT1000 has a payload of 100 tonnes." },
                    "location": { "type": "S3", "s3Location": { "uri": "s3://specs/dt1000.pdf" } },
                    "score": 0.82,
                    "metadata": { "x-amz-bedrock-kb-document-page-number": 3.0 }
                },
                {
                    "content": { "text": "The MC750 crane lifts 750 tonnes." },
                    "location": { "type": "WEB", "webLocation": { "url": "https://example.com/mc750" } },
                    "score": 0.64
                }
            ]
        });

        let passages = parse_retrieve_response(body).unwrap();
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].source_uri, "s3://specs/dt1000.pdf");
        assert_eq!(passages[0].page_number.as_deref(), Some("3"));
        assert!((passages[0].relevance_score - 0.82).abs() < 1e-9);
        assert_eq!(passages[1].source_uri, "https://example.com/mc750");
        assert_eq!(passages[1].page_number, None);
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let body = json!({
            "retrievalResults": [
                { "content": { "text": "orphan chunk" } },
                { "content": { "text": "tagged" }, "metadata": { "source": "manual.pdf", "page_number": "12" } }
            ]
        });

        let passages = parse_retrieve_response(body).unwrap();
        assert_eq!(passages[0].source_uri, UNKNOWN_SOURCE);
        assert_eq!(passages[0].relevance_score, 0.0);
        assert_eq!(passages[1].source_uri, "manual.pdf");
        assert_eq!(passages[1].page_number.as_deref(), Some("12"));
    }

    #[test]
    fn test_empty_response() {
        assert!(parse_retrieve_response(json!({})).unwrap().is_empty());
    }

    #[test]
    fn test_parse_retrieve_and_generate() {
        let body = json!({
            "output": { "text": "The BD850 has a 850 hp engine." },
            "citations": [
                {
                    "generatedResponsePart": { "textResponsePart": { "text": "850 hp" } },
                    "retrievedReferences": [
                        {
                            "content": { "text": "BD850 engine: 850 hp" },
                            "location": { "s3Location": { "uri": "s3://specs/bd850.pdf" } }
                        }
                    ]
                }
            ],
            "sessionId": "session-1"
        });

        let answer = parse_retrieve_and_generate_response(body).unwrap();
        assert_eq!(answer.text, "The BD850 has a 850 hp engine.");
        assert_eq!(answer.passages.len(), 1);
        assert_eq!(answer.passages[0].source_uri, "s3://specs/bd850.pdf");
        assert_eq!(answer.session_id.as_deref(), Some("session-1"));
    }

    #[test]
    fn test_foundation_model_arn() {
        assert_eq!(
            foundation_model_arn("us-east-1", "anthropic.claude-v2"),
            "arn:aws:bedrock:us-east-1::foundation-model/anthropic.claude-v2"
        );
        let arn = "arn:aws:bedrock:us-west-2::foundation-model/amazon.titan-text-express-v1";
        assert_eq!(foundation_model_arn("us-east-1", arn), arn);
    }
}
