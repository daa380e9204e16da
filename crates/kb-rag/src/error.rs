//! Error types for the knowledge-base tools

use std::fmt;

use thiserror::Error;

/// Result type alias for kb-rag operations
pub type Result<T> = std::result::Result<T, Error>;

/// Structured failure reported by an AWS endpoint or by the transport
/// underneath it.
///
/// Decoded once at the client boundary so callers match on fields instead of
/// probing the raw response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    /// Service the request was sent to (e.g. "bedrock-agent-runtime")
    pub service: String,
    /// HTTP status, absent when the request never got a response
    pub status: Option<u16>,
    /// AWS error code (e.g. "ResourceNotFoundException")
    pub code: Option<String>,
    /// Human readable detail
    pub message: String,
}

impl ServiceError {
    /// A failure before any HTTP response was received
    pub fn transport(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            status: None,
            code: None,
            message: message.into(),
        }
    }

    /// A non-success HTTP response
    pub fn api(
        service: impl Into<String>,
        status: u16,
        code: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            status: Some(status),
            code,
            message: message.into(),
        }
    }

    /// True when the request never reached the service
    pub fn is_transport(&self) -> bool {
        self.status.is_none()
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status, &self.code) {
            (Some(status), Some(code)) => {
                write!(f, "{} returned {} ({}): {}", self.service, status, code, self.message)
            }
            (Some(status), None) => {
                write!(f, "{} returned {}: {}", self.service, status, self.message)
            }
            (None, _) => write!(f, "{} unreachable: {}", self.service, self.message),
        }
    }
}

impl std::error::Error for ServiceError {}

/// kb-rag errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (local config or a malformed knowledge-base config)
    #[error("Configuration error: {0}")]
    Config(String),

    /// AWS credentials could not be resolved
    #[error("Credentials error: {0}")]
    Credentials(String),

    /// The query was empty after trimming
    #[error("Query must not be empty")]
    EmptyQuery,

    /// The domain check could not be performed
    #[error("Domain validation could not be performed: {0}")]
    Validation(String),

    /// Knowledge-base retrieval failed
    #[error("Retrieval from knowledge base '{knowledge_base_id}' failed: {source}")]
    Retrieval {
        knowledge_base_id: String,
        #[source]
        source: ServiceError,
    },

    /// Text generation failed
    #[error("Generation with model '{model_id}' failed: {source}")]
    Generation {
        model_id: String,
        #[source]
        source: ServiceError,
    },

    /// Any other AWS call failed
    #[error("AWS request failed: {0}")]
    Service(#[from] ServiceError),

    /// PDF could not be read
    #[error("Failed to read PDF '{name}': {message}")]
    Pdf { name: String, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML config parse error
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a credentials error
    pub fn credentials(message: impl Into<String>) -> Self {
        Self::Credentials(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a PDF error
    pub fn pdf(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pdf {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Structured service detail, when the error came from an AWS call
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            Error::Retrieval { source, .. } | Error::Generation { source, .. } => Some(source),
            Error::Service(source) => Some(source),
            _ => None,
        }
    }

    /// Re-tag a service failure as a retrieval failure
    pub fn into_retrieval(self, knowledge_base_id: &str) -> Self {
        match self {
            Error::Service(source) => Error::Retrieval {
                knowledge_base_id: knowledge_base_id.to_string(),
                source,
            },
            Error::Http(err) => Error::Retrieval {
                knowledge_base_id: knowledge_base_id.to_string(),
                source: ServiceError::transport("bedrock-agent-runtime", err.to_string()),
            },
            other => other,
        }
    }

    /// Re-tag a service failure as a generation failure
    pub fn into_generation(self, model_id: &str) -> Self {
        match self {
            Error::Service(source) => Error::Generation {
                model_id: model_id.to_string(),
                source,
            },
            Error::Http(err) => Error::Generation {
                model_id: model_id.to_string(),
                source: ServiceError::transport("bedrock-runtime", err.to_string()),
            },
            other => other,
        }
    }
}
