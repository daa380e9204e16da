//! RDS Data API client (SQL on Aurora without a database driver)

use reqwest::Method;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::auth::AwsAuth;
use super::client::AwsServiceClient;
use crate::config::{HttpConfig, RdsConfig};
use crate::error::{Error, Result};

/// Default vector table of an Aurora-backed knowledge base
pub const KB_VECTOR_TABLE: &str = "bedrock_integration.bedrock_kb";

/// Labeled statements that describe a knowledge-base vector table:
/// column structure, row count, a sample of rows and metadata keys
///
/// `table` must be `schema.name` with plain identifiers.
pub fn vector_table_queries(table: &str) -> Result<Vec<(&'static str, String)>> {
    let is_ident = |part: &str| {
        !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    };
    let (schema, name) = table
        .split_once('.')
        .filter(|(schema, name)| is_ident(schema) && is_ident(name))
        .ok_or_else(|| Error::config(format!("Invalid table name '{}', expected schema.table", table)))?;

    Ok(vec![
        (
            "Table structure",
            format!(
                "SELECT column_name, data_type, character_maximum_length \
                 FROM information_schema.columns \
                 WHERE table_schema = '{}' AND table_name = '{}';",
                schema, name
            ),
        ),
        (
            "Row count",
            format!("SELECT COUNT(*) AS row_count FROM {}.{};", schema, name),
        ),
        (
            "Sample data (first 5 rows)",
            format!(
                "SELECT id, LEFT(chunks, 100) || '...' AS text_preview, \
                 jsonb_pretty(metadata) AS metadata \
                 FROM {}.{} LIMIT 5;",
                schema, name
            ),
        ),
        (
            "Metadata structure",
            format!(
                "SELECT jsonb_object_keys(metadata) AS metadata_keys, COUNT(*) AS count \
                 FROM {}.{} \
                 GROUP BY jsonb_object_keys(metadata) \
                 ORDER BY count DESC;",
                schema, name
            ),
        ),
    ])
}

/// Outcome of `ExecuteStatement`
#[derive(Debug, Clone, PartialEq)]
pub enum StatementResult {
    /// A result set, each row keyed by column name
    Rows {
        columns: Vec<String>,
        rows: Vec<Map<String, Value>>,
    },
    /// A statement without a result set
    Affected { records_updated: i64 },
}

/// RDS Data API client
pub struct RdsDataClient {
    client: AwsServiceClient,
}

impl RdsDataClient {
    pub fn new(auth: Arc<AwsAuth>, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: AwsServiceClient::new(auth, "rds-data", "rds-data", http)?,
        })
    }

    pub fn from_client(client: AwsServiceClient) -> Self {
        Self { client }
    }

    /// Run one SQL statement against the configured cluster
    pub async fn execute_statement(&self, sql: &str, target: &RdsConfig) -> Result<StatementResult> {
        let body = json!({
            "resourceArn": target.resource_arn,
            "secretArn": target.secret_arn,
            "database": target.database,
            "sql": sql,
            "includeResultMetadata": true,
        });

        tracing::info!("Executing SQL on database {}", target.database);
        let response = self.client.send_json(Method::POST, "/Execute", Some(&body)).await?;
        Ok(parse_execute_response(&response))
    }
}

/// Flatten one typed field (`{"stringValue": "x"}`) to a plain JSON value
fn field_value(field: &Value) -> Value {
    if field.get("isNull").and_then(Value::as_bool) == Some(true) {
        return Value::Null;
    }
    for key in ["stringValue", "longValue", "booleanValue", "doubleValue"] {
        if let Some(value) = field.get(key) {
            return value.clone();
        }
    }
    Value::String(field.to_string())
}

/// Map an `ExecuteStatement` response to rows or an update count
pub fn parse_execute_response(response: &Value) -> StatementResult {
    let records = match response.get("records").and_then(Value::as_array) {
        Some(records) => records,
        None => {
            return StatementResult::Affected {
                records_updated: response
                    .get("numberOfRecordsUpdated")
                    .and_then(Value::as_i64)
                    .unwrap_or(0),
            }
        }
    };

    let mut columns: Vec<String> = response
        .get("columnMetadata")
        .and_then(Value::as_array)
        .map(|meta| {
            meta.iter()
                .enumerate()
                .map(|(i, column)| {
                    column
                        .get("name")
                        .or_else(|| column.get("label"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("column_{}", i + 1))
                })
                .collect()
        })
        .unwrap_or_default();

    let width = records
        .iter()
        .filter_map(Value::as_array)
        .map(Vec::len)
        .max()
        .unwrap_or(0);
    for i in columns.len()..width {
        columns.push(format!("column_{}", i + 1));
    }

    let rows = records
        .iter()
        .map(|record| {
            record
                .as_array()
                .map(|fields| {
                    fields
                        .iter()
                        .zip(&columns)
                        .map(|(field, column)| (column.clone(), field_value(field)))
                        .collect()
                })
                .unwrap_or_default()
        })
        .collect();

    StatementResult::Rows { columns, rows }
}
