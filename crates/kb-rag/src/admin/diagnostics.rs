//! Knowledge-base health report: status, data sources and ingestion jobs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::providers::admin::{IngestionJobSummary, IngestionStatistics};
use crate::providers::KnowledgeBaseAdmin;

const NOT_AVAILABLE: &str = "N/A";

/// One data source with its ingestion history
#[derive(Debug, Clone, Serialize)]
pub struct DataSourceReport {
    pub data_source_id: String,
    pub name: Option<String>,
    pub status: Option<String>,
    pub bucket_arn: Option<String>,
    pub ingestion_jobs: Vec<IngestionJobSummary>,
    /// Set when the data source detail or its jobs could not be fetched
    pub error: Option<String>,
}

/// Everything `describe` prints for a knowledge base
#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeBaseReport {
    pub knowledge_base_id: String,
    pub name: Option<String>,
    pub status: Option<String>,
    pub role_arn: Option<String>,
    pub generation_model_arn: Option<String>,
    pub updated_at: Option<String>,
    pub data_sources: Vec<DataSourceReport>,
}

fn string_at(value: &Value, path: &[&str]) -> Option<String> {
    path.iter()
        .try_fold(value, |current, key| current.get(*key))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Render an API timestamp (RFC 3339 string or epoch seconds)
pub fn format_timestamp(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc).format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|_| s.clone()),
        Some(Value::Number(n)) => n
            .as_f64()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs.trunc() as i64, 0))
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| n.to_string()),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Collect the report; per-data-source failures are kept in the report
pub async fn diagnose(admin: &dyn KnowledgeBaseAdmin, knowledge_base_id: &str) -> Result<KnowledgeBaseReport> {
    let kb = admin.get_knowledge_base(knowledge_base_id).await?;

    let mut data_sources = Vec::new();
    for summary in admin.list_data_sources(knowledge_base_id).await? {
        let mut report = DataSourceReport {
            data_source_id: summary.data_source_id.clone(),
            name: summary.name,
            status: summary.status,
            bucket_arn: None,
            ingestion_jobs: Vec::new(),
            error: None,
        };

        match admin.get_data_source(knowledge_base_id, &summary.data_source_id).await {
            Ok(detail) => {
                report.bucket_arn = string_at(
                    &detail,
                    &["dataSourceConfiguration", "s3Configuration", "bucketArn"],
                );
            }
            Err(e) => {
                tracing::warn!("Could not fetch data source {}: {}", summary.data_source_id, e);
                report.error = Some(e.to_string());
            }
        }

        match admin
            .list_ingestion_jobs(knowledge_base_id, &summary.data_source_id)
            .await
        {
            Ok(jobs) => report.ingestion_jobs = jobs,
            Err(e) => {
                tracing::warn!("Could not list ingestion jobs for {}: {}", summary.data_source_id, e);
                report.error.get_or_insert_with(|| e.to_string());
            }
        }

        data_sources.push(report);
    }

    Ok(KnowledgeBaseReport {
        knowledge_base_id: knowledge_base_id.to_string(),
        name: string_at(&kb, &["name"]),
        status: string_at(&kb, &["status"]),
        role_arn: string_at(&kb, &["roleArn"]),
        generation_model_arn: string_at(
            &kb,
            &["knowledgeBaseConfiguration", "generationConfiguration", "modelArn"],
        ),
        updated_at: kb.get("updatedAt").map(|v| format_timestamp(Some(v))),
        data_sources,
    })
}

fn or_na(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(NOT_AVAILABLE)
}

fn write_statistics(f: &mut fmt::Formatter<'_>, stats: &IngestionStatistics) -> fmt::Result {
    writeln!(f, "      Documents Scanned: {}", stats.number_of_documents_scanned)?;
    writeln!(f, "      New Documents: {}", stats.number_of_new_documents_indexed)?;
    writeln!(f, "      Modified Documents: {}", stats.number_of_modified_documents_indexed)?;
    writeln!(f, "      Deleted Documents: {}", stats.number_of_documents_deleted)?;
    writeln!(f, "      Failed Documents: {}", stats.number_of_documents_failed)
}

impl fmt::Display for KnowledgeBaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Knowledge Base: {} ({})", self.knowledge_base_id, or_na(&self.name))?;
        writeln!(f, "Status: {}", or_na(&self.status))?;
        writeln!(f, "Role ARN: {}", or_na(&self.role_arn))?;
        writeln!(f, "Generation Model: {}", or_na(&self.generation_model_arn))?;
        writeln!(f, "Updated: {}", or_na(&self.updated_at))?;

        if self.data_sources.is_empty() {
            return writeln!(f, "\nNo data sources.");
        }

        writeln!(f, "\nData Sources:")?;
        for ds in &self.data_sources {
            writeln!(
                f,
                "- ID: {}, Name: {}, Status: {}",
                ds.data_source_id,
                or_na(&ds.name),
                or_na(&ds.status)
            )?;
            writeln!(f, "  S3 Location: {}", or_na(&ds.bucket_arn))?;
            if let Some(error) = &ds.error {
                writeln!(f, "  Error: {}", error)?;
            }
            if ds.ingestion_jobs.is_empty() {
                writeln!(f, "  Ingestion Jobs: none")?;
                continue;
            }
            writeln!(f, "  Ingestion Jobs:")?;
            for job in &ds.ingestion_jobs {
                writeln!(f, "  - Job ID: {}", job.ingestion_job_id)?;
                writeln!(f, "    Status: {}", or_na(&job.status))?;
                writeln!(f, "    Started: {}", format_timestamp(job.started_at.as_ref()))?;
                writeln!(f, "    Updated: {}", format_timestamp(job.updated_at.as_ref()))?;
                if let Some(stats) = &job.statistics {
                    writeln!(f, "    Statistics:")?;
                    write_statistics(f, stats)?;
                }
            }
        }
        Ok(())
    }
}
