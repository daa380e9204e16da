//! Amazon Web Services provider implementations
//!
//! Thin signed REST clients for:
//! - Bedrock Knowledge Bases (retrieve, retrieve-and-generate)
//! - Bedrock Runtime (InvokeModel)
//! - Bedrock Agent control plane (knowledge-base administration)
//! - RDS Data API (SQL on Aurora)
//! - S3 (object download)

mod agent;
mod auth;
mod client;
mod knowledge_base;
mod rds_data;
mod runtime;
mod s3_store;
pub mod signer;

pub use agent::BedrockAgentClient;
pub use auth::{AwsAuth, AwsCredentials};
pub use client::{decode_error, encode_key_path, encode_path_segment, AwsServiceClient};
pub use knowledge_base::{
    foundation_model_arn, parse_retrieve_and_generate_response, parse_retrieve_response,
    BedrockKnowledgeBase,
};
pub use rds_data::{
    parse_execute_response, vector_table_queries, RdsDataClient, StatementResult, KB_VECTOR_TABLE,
};
pub use runtime::BedrockRuntime;
pub use s3_store::{parse_s3_uri, S3ObjectStore};
