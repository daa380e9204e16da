//! Switch a knowledge base's generation model and wait for it to settle

use std::time::{Duration, Instant};

use serde_json::{json, Map, Value};

use crate::error::{Error, Result};
use crate::providers::KnowledgeBaseAdmin;

/// Fields `UpdateKnowledgeBase` requires that must be echoed back
const REQUIRED_FIELDS: &[&str] = &[
    "name",
    "roleArn",
    "knowledgeBaseConfiguration",
    "storageConfiguration",
];

/// Prompt template installed with the new model
pub const GENERATION_PROMPT_TEMPLATE: &str = r#"Human: You are an AI assistant that answers questions based on the provided context.

<context>
$search_results$
</context>

Question: $query$

Assistant:"#;

/// How a status wait ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    /// The knowledge base reached ACTIVE
    Active,
    /// Any status other than ACTIVE / UPDATING / CREATING
    Failed(String),
    /// Still transitioning when the timeout elapsed
    TimedOut { last_status: Option<String> },
}

impl UpdateStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, UpdateStatus::Active)
    }
}

/// Build an `UpdateKnowledgeBase` body from the current document
///
/// A missing required field is a configuration error; nothing is sent.
pub fn build_update_request(current: &Value, model_arn: &str) -> Result<Value> {
    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| current.get(*field).map_or(true, Value::is_null))
        .collect();
    if !missing.is_empty() {
        return Err(Error::config(format!(
            "Knowledge base configuration is missing required field(s): {}",
            missing.join(", ")
        )));
    }

    let mut kb_configuration = current["knowledgeBaseConfiguration"].clone();
    let Some(kb_object) = kb_configuration.as_object_mut() else {
        return Err(Error::config("knowledgeBaseConfiguration is not an object"));
    };

    let generation = kb_object
        .entry("generationConfiguration")
        .or_insert_with(|| Value::Object(Map::new()));
    if !generation.is_object() {
        *generation = Value::Object(Map::new());
    }
    generation["modelArn"] = Value::String(model_arn.to_string());
    generation["promptTemplate"] = Value::String(GENERATION_PROMPT_TEMPLATE.to_string());

    let mut request = json!({
        "name": current["name"],
        "roleArn": current["roleArn"],
        "knowledgeBaseConfiguration": kb_configuration,
        "storageConfiguration": current["storageConfiguration"],
    });
    if let Some(description) = current.get("description").filter(|d| d.is_string()) {
        request["description"] = description.clone();
    }

    Ok(request)
}

/// Fetch the knowledge base, point it at `model_arn` and submit the update
///
/// Returns the status reported by the update call.
pub async fn update_generation_model(
    admin: &dyn KnowledgeBaseAdmin,
    knowledge_base_id: &str,
    model_arn: &str,
) -> Result<Option<String>> {
    let current = admin.get_knowledge_base(knowledge_base_id).await?;
    let request = build_update_request(&current, model_arn)?;

    tracing::info!("Updating knowledge base {} to model {}", knowledge_base_id, model_arn);
    let updated = admin.update_knowledge_base(knowledge_base_id, &request).await?;

    Ok(updated
        .get("status")
        .and_then(Value::as_str)
        .map(str::to_string))
}

/// Poll until the knowledge base is ACTIVE, fails or `timeout` elapses
///
/// `on_status` sees every polled status.
pub async fn wait_for_status(
    admin: &dyn KnowledgeBaseAdmin,
    knowledge_base_id: &str,
    timeout: Duration,
    poll_interval: Duration,
    mut on_status: impl FnMut(&str),
) -> Result<UpdateStatus> {
    let start = Instant::now();

    loop {
        let kb = admin.get_knowledge_base(knowledge_base_id).await?;
        let status = kb
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN")
            .to_string();
        on_status(&status);

        match status.as_str() {
            "ACTIVE" => return Ok(UpdateStatus::Active),
            "UPDATING" | "CREATING" => {
                tracing::debug!("Knowledge base {} is {}", knowledge_base_id, status);
            }
            _ => {
                tracing::warn!("Knowledge base {} update ended in {}", knowledge_base_id, status);
                return Ok(UpdateStatus::Failed(status));
            }
        }
        if start.elapsed() + poll_interval > timeout {
            return Ok(UpdateStatus::TimedOut {
                last_status: Some(status),
            });
        }
        tokio::time::sleep(poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeAdmin;

    const MODEL_ARN: &str =
        "arn:aws:bedrock:us-east-1::foundation-model/anthropic.claude-3-5-sonnet-20240620-v1:0";

    fn knowledge_base() -> Value {
        json!({
            "knowledgeBaseId": "HBPKZNSUMS",
            "name": "machinery-kb",
            "roleArn": "arn:aws:iam::123456789012:role/kb-role",
            "status": "ACTIVE",
            "knowledgeBaseConfiguration": {
                "type": "VECTOR",
                "vectorKnowledgeBaseConfiguration": {
                    "embeddingModelArn": "arn:aws:bedrock:us-east-1::foundation-model/amazon.titan-embed-text-v1"
                }
            },
            "storageConfiguration": { "type": "RDS" }
        })
    }

    #[test]
    fn test_build_update_request_sets_model() {
        let request = build_update_request(&knowledge_base(), MODEL_ARN).unwrap();
        let generation = &request["knowledgeBaseConfiguration"]["generationConfiguration"];
        assert_eq!(generation["modelArn"], MODEL_ARN);
        assert!(generation["promptTemplate"].as_str().unwrap().contains("$search_results$"));
        assert_eq!(
            request["knowledgeBaseConfiguration"]["vectorKnowledgeBaseConfiguration"]["embeddingModelArn"],
            "arn:aws:bedrock:us-east-1::foundation-model/amazon.titan-embed-text-v1"
        );
        assert_eq!(request["name"], "machinery-kb");
        assert!(request.get("status").is_none());
    }

    #[test]
    fn test_missing_role_arn_aborts() {
        let mut kb = knowledge_base();
        kb.as_object_mut().unwrap().remove("roleArn");
        let err = build_update_request(&kb, MODEL_ARN).unwrap_err();
        match err {
            Error::Config(message) => assert!(message.contains("roleArn")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_submits_request() {
        let admin = FakeAdmin::new(knowledge_base());
        let status = update_generation_model(&admin, "HBPKZNSUMS", MODEL_ARN).await.unwrap();
        assert_eq!(status.as_deref(), Some("UPDATING"));

        let updates = admin.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(
            updates[0]["knowledgeBaseConfiguration"]["generationConfiguration"]["modelArn"],
            MODEL_ARN
        );
    }

    #[tokio::test]
    async fn test_update_not_sent_when_config_incomplete() {
        let mut kb = knowledge_base();
        kb.as_object_mut().unwrap().remove("storageConfiguration");
        let admin = FakeAdmin::new(kb);

        assert!(update_generation_model(&admin, "HBPKZNSUMS", MODEL_ARN).await.is_err());
        assert!(admin.updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wait_stops_on_active() {
        let admin = FakeAdmin::new(knowledge_base()).with_statuses(["UPDATING", "UPDATING", "ACTIVE"]);
        let mut seen = Vec::new();

        let status = wait_for_status(
            &admin,
            "HBPKZNSUMS",
            Duration::from_secs(5),
            Duration::from_millis(1),
            |s| seen.push(s.to_string()),
        )
        .await
        .unwrap();

        assert_eq!(status, UpdateStatus::Active);
        assert_eq!(seen, vec!["UPDATING", "UPDATING", "ACTIVE"]);
    }

    #[tokio::test]
    async fn test_wait_stops_on_failure() {
        let admin = FakeAdmin::new(knowledge_base()).with_statuses(["UPDATING", "FAILED"]);
        let status = wait_for_status(
            &admin,
            "HBPKZNSUMS",
            Duration::from_secs(5),
            Duration::from_millis(1),
            |_| {},
        )
        .await
        .unwrap();
        assert_eq!(status, UpdateStatus::Failed("FAILED".to_string()));
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let admin = FakeAdmin::new(knowledge_base()).with_statuses(["UPDATING"]);
        let status = wait_for_status(
            &admin,
            "HBPKZNSUMS",
            Duration::from_millis(20),
            Duration::from_millis(5),
            |_| {},
        )
        .await
        .unwrap();
        assert_eq!(
            status,
            UpdateStatus::TimedOut {
                last_status: Some("UPDATING".to_string())
            }
        );
    }
}
