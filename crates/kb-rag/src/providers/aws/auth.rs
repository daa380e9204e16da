//! AWS credential resolution
//!
//! Credentials come from the standard environment variables, or from a
//! profile in the shared credentials file.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Utc;

use super::signer::{self, SignableRequest, SigningOptions, SigningParams};
use crate::config::AwsConfig;
use crate::error::{Error, Result};

/// Static AWS credentials
#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &self.session_token.as_ref().map(|_| "** redacted **"))
            .finish()
    }
}

impl AwsCredentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
        }
    }

    /// Read `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` / `AWS_SESSION_TOKEN`
    pub fn from_env_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let access_key_id = lookup("AWS_ACCESS_KEY_ID").filter(|v| !v.is_empty())?;
        let secret_access_key = lookup("AWS_SECRET_ACCESS_KEY").filter(|v| !v.is_empty())?;
        let session_token = lookup("AWS_SESSION_TOKEN").filter(|v| !v.is_empty());
        Some(Self::new(access_key_id, secret_access_key, session_token))
    }

    /// Extract a profile from shared-credentials file text
    ///
    /// Accepts both `[name]` and `[profile name]` section headers.
    pub fn parse_profile(text: &str, profile: &str) -> Option<Self> {
        let mut in_profile = false;
        let mut access_key_id = None;
        let mut secret_access_key = None;
        let mut session_token = None;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                let section = section.trim();
                let name = section.strip_prefix("profile ").unwrap_or(section).trim();
                in_profile = name == profile;
                continue;
            }
            if !in_profile {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let value = value.trim().to_string();
                match key.trim() {
                    "aws_access_key_id" => access_key_id = Some(value),
                    "aws_secret_access_key" => secret_access_key = Some(value),
                    "aws_session_token" => session_token = Some(value),
                    _ => {}
                }
            }
        }

        Some(Self::new(access_key_id?, secret_access_key?, session_token))
    }

    /// Shared credentials file location
    pub fn shared_credentials_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("AWS_SHARED_CREDENTIALS_FILE") {
            return Some(PathBuf::from(path));
        }
        dirs::home_dir().map(|home| home.join(".aws").join("credentials"))
    }

    /// Read a profile from a credentials file
    pub fn from_file(path: &Path, profile: &str) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::credentials(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Ok(Self::parse_profile(&text, profile))
    }

    /// Resolve credentials: environment first, then the shared credentials file
    pub fn resolve(profile: Option<&str>) -> Result<Self> {
        if let Some(credentials) = Self::from_env_lookup(|key| std::env::var(key).ok()) {
            tracing::debug!("Using AWS credentials from environment");
            return Ok(credentials);
        }

        let profile = profile
            .map(str::to_string)
            .or_else(|| std::env::var("AWS_PROFILE").ok())
            .unwrap_or_else(|| "default".to_string());

        if let Some(path) = Self::shared_credentials_path() {
            if let Some(credentials) = Self::from_file(&path, &profile)? {
                tracing::debug!("Using AWS credentials from profile '{}'", profile);
                return Ok(credentials);
            }
        }

        Err(Error::credentials(format!(
            "No AWS credentials found in the environment or for profile '{}'",
            profile
        )))
    }
}

/// Credentials bound to a region; signs requests for any service
pub struct AwsAuth {
    credentials: AwsCredentials,
    region: String,
}

impl AwsAuth {
    pub fn new(credentials: AwsCredentials, region: impl Into<String>) -> Self {
        Self {
            credentials,
            region: region.into(),
        }
    }

    /// Resolve credentials for the configured region/profile
    pub fn from_config(config: &AwsConfig) -> Result<Self> {
        let credentials = AwsCredentials::resolve(config.profile.as_deref())?;
        Ok(Self::new(credentials, config.region.clone()))
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Sign a request at the current time
    pub fn sign(
        &self,
        request: &SignableRequest<'_>,
        service: &str,
        options: SigningOptions,
    ) -> Vec<(String, String)> {
        signer::sign(
            request,
            &SigningParams {
                credentials: &self.credentials,
                region: &self.region,
                service,
                time: Utc::now(),
                options,
            },
        )
    }
}
