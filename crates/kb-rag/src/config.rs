//! Configuration for the knowledge-base tools

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::SearchType;

/// Environment variable overriding the knowledge base ID
pub const ENV_KNOWLEDGE_BASE_ID: &str = "KB_RAG_KNOWLEDGE_BASE_ID";
/// Environment variable overriding the generation model
pub const ENV_MODEL_ID: &str = "KB_RAG_MODEL_ID";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KbRagConfig {
    /// AWS account/region settings
    #[serde(default)]
    pub aws: AwsConfig,
    /// Knowledge base used for retrieval
    #[serde(default)]
    pub knowledge_base: KnowledgeBaseConfig,
    /// Answer generation settings
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Domain validation settings
    #[serde(default)]
    pub validation: ValidationConfig,
    /// RDS Data API target (only needed for `sql`)
    #[serde(default)]
    pub rds: Option<RdsConfig>,
    /// Knowledge-base administration settings
    #[serde(default)]
    pub admin: AdminConfig,
    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,
}

/// AWS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    /// Region for every service endpoint
    #[serde(default = "default_region")]
    pub region: String,
    /// Shared-credentials profile (falls back to AWS_PROFILE, then "default")
    #[serde(default)]
    pub profile: Option<String>,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            profile: None,
        }
    }
}

/// Knowledge base retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseConfig {
    /// Knowledge base ID
    #[serde(default)]
    pub id: String,
    /// Number of passages to retrieve (default: 3)
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Search mode forwarded to the service (default: hybrid)
    #[serde(default)]
    pub search_type: SearchType,
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            max_results: default_max_results(),
            search_type: SearchType::default(),
        }
    }
}

/// Generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Bedrock model ID used for answers
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Nucleus sampling
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Domain validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Run the domain check before retrieval
    #[serde(default = "default_validation_enabled")]
    pub enabled: bool,
    /// Model used for classification (defaults to the generation model)
    #[serde(default)]
    pub model_id: Option<String>,
    /// Subject the questions must be about
    #[serde(default = "default_domain")]
    pub domain: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: default_validation_enabled(),
            model_id: None,
            domain: default_domain(),
        }
    }
}

/// RDS Data API target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RdsConfig {
    /// Aurora cluster ARN
    pub resource_arn: String,
    /// Secrets Manager secret ARN holding the DB credentials
    pub secret_arn: String,
    /// Database name
    pub database: String,
}

/// Knowledge-base administration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Seconds between status polls while an update is in progress
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Give up waiting for ACTIVE after this many seconds
    #[serde(default = "default_update_timeout")]
    pub update_timeout_secs: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            update_timeout_secs: default_update_timeout(),
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
        }
    }
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_max_results() -> usize {
    3
}

fn default_model_id() -> String {
    "anthropic.claude-3-sonnet-20240229-v1:0".to_string()
}

fn default_temperature() -> f32 {
    0.5
}

fn default_top_p() -> f32 {
    0.9
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_validation_enabled() -> bool {
    true
}

fn default_domain() -> String {
    "heavy machinery".to_string()
}

fn default_poll_interval() -> u64 {
    10
}

fn default_update_timeout() -> u64 {
    300
}

fn default_timeout() -> u64 {
    120
}

impl KbRagConfig {
    /// Default config file location: `<config_dir>/kb-rag/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("kb-rag").join("config.toml"))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from an explicit file, or from the default location
    /// when it exists, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    Error::config(format!("Failed to read config {}: {}", path.display(), e))
                })?;
                Self::from_toml_str(&text)?
            }
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(default) => {
                    tracing::debug!("Loading config from {}", default.display());
                    Self::from_toml_str(&std::fs::read_to_string(default)?)?
                }
                None => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides using the given lookup
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(region) = lookup("AWS_REGION").or_else(|| lookup("AWS_DEFAULT_REGION")) {
            self.aws.region = region;
        }
        if let Some(profile) = lookup("AWS_PROFILE") {
            if self.aws.profile.is_none() {
                self.aws.profile = Some(profile);
            }
        }
        if let Some(id) = lookup(ENV_KNOWLEDGE_BASE_ID) {
            self.knowledge_base.id = id;
        }
        if let Some(model) = lookup(ENV_MODEL_ID) {
            self.generation.model_id = model;
        }
    }

    /// Model used by the domain validator
    pub fn validation_model(&self) -> &str {
        self.validation
            .model_id
            .as_deref()
            .unwrap_or(&self.generation.model_id)
    }

    /// Check the values the pipeline depends on
    pub fn validate(&self) -> Result<()> {
        if self.aws.region.trim().is_empty() {
            return Err(Error::config("aws.region must not be empty"));
        }
        if self.knowledge_base.max_results == 0 {
            return Err(Error::config("knowledge_base.max_results must be at least 1"));
        }
        if self.generation.model_id.trim().is_empty() {
            return Err(Error::config("generation.model_id must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.generation.top_p) {
            return Err(Error::config("generation.top_p must be between 0 and 1"));
        }
        if self.generation.max_tokens == 0 {
            return Err(Error::config("generation.max_tokens must be at least 1"));
        }
        if self.admin.poll_interval_secs == 0 {
            return Err(Error::config("admin.poll_interval_secs must be at least 1"));
        }
        Ok(())
    }

    /// Knowledge base ID, or a config error when none was provided
    pub fn require_knowledge_base(&self) -> Result<&str> {
        let id = self.knowledge_base.id.trim();
        if id.is_empty() {
            return Err(Error::config(format!(
                "No knowledge base ID configured (set knowledge_base.id, {} or --kb-id)",
                ENV_KNOWLEDGE_BASE_ID
            )));
        }
        Ok(id)
    }

    /// RDS target, or a config error when the section is missing
    pub fn require_rds(&self) -> Result<&RdsConfig> {
        self.rds
            .as_ref()
            .ok_or_else(|| Error::config("No [rds] section configured"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = KbRagConfig::default();
        assert_eq!(config.aws.region, "us-east-1");
        assert_eq!(config.knowledge_base.max_results, 3);
        assert_eq!(config.knowledge_base.search_type, SearchType::Hybrid);
        assert!(config.validation.enabled);
        assert_eq!(config.validation_model(), config.generation.model_id);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = KbRagConfig::from_toml_str(
            r#"
            [knowledge_base]
            id = "HBPKZNSUMS"
            search_type = "semantic"

            [validation]
            model_id = "amazon.titan-text-express-v1"

            [rds]
            resource_arn = "arn:aws:rds:us-east-1:123456789012:cluster:demo"
            secret_arn = "arn:aws:secretsmanager:us-east-1:123456789012:secret:demo"
            database = "myapp"
            "#,
        )
        .unwrap();

        assert_eq!(config.require_knowledge_base().unwrap(), "HBPKZNSUMS");
        assert_eq!(config.knowledge_base.max_results, 3);
        assert_eq!(config.knowledge_base.search_type, SearchType::Semantic);
        assert_eq!(config.validation_model(), "amazon.titan-text-express-v1");
        assert_eq!(config.generation.max_tokens, 1000);
        assert_eq!(config.require_rds().unwrap().database, "myapp");
    }

    #[test]
    fn test_rejects_zero_max_results() {
        let config = KbRagConfig::from_toml_str("[knowledge_base]\nmax_results = 0\n").unwrap();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_zero_poll_interval() {
        let config = KbRagConfig::from_toml_str("[admin]\npoll_interval_secs = 0\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("poll_interval_secs"));
    }

    #[test]
    fn test_missing_knowledge_base() {
        let config = KbRagConfig::default();
        assert!(matches!(config.require_knowledge_base(), Err(Error::Config(_))));
        assert!(config.require_rds().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("AWS_DEFAULT_REGION", "eu-west-1"),
            (ENV_KNOWLEDGE_BASE_ID, "KBENV"),
            (ENV_MODEL_ID, "amazon.titan-text-express-v1"),
        ]
        .into_iter()
        .collect();

        let mut config = KbRagConfig::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.aws.region, "eu-west-1");
        assert_eq!(config.knowledge_base.id, "KBENV");
        assert_eq!(config.generation.model_id, "amazon.titan-text-express-v1");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[aws]\nregion = \"us-west-2\"\n\n[generation]\ntemperature = 0.2").unwrap();

        let config = KbRagConfig::load(Some(file.path())).unwrap();
        assert!((config.generation.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_load_missing_file() {
        let result = KbRagConfig::load(Some(Path::new("/nonexistent/kb-rag.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
