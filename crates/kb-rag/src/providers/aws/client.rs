//! Signed HTTP client for AWS REST/JSON endpoints

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use serde_json::Value;

use super::auth::AwsAuth;
use super::signer::{SignableRequest, SigningOptions};
use crate::config::HttpConfig;
use crate::error::{Error, Result, ServiceError};

/// Longest raw error body kept in a ServiceError message
const MAX_ERROR_BODY: usize = 500;

/// One AWS service endpoint plus the credentials to sign for it
pub struct AwsServiceClient {
    http: reqwest::Client,
    auth: Arc<AwsAuth>,
    /// Endpoint prefix, also used to label errors (e.g. "bedrock-runtime")
    service: &'static str,
    /// SigV4 signing name (e.g. "bedrock")
    signing_name: &'static str,
    options: SigningOptions,
    endpoint: String,
}

impl AwsServiceClient {
    /// Create a client for `https://{service}.{region}.amazonaws.com`
    pub fn new(
        auth: Arc<AwsAuth>,
        service: &'static str,
        signing_name: &'static str,
        http: &HttpConfig,
    ) -> Result<Self> {
        let endpoint = format!("https://{}.{}.amazonaws.com", service, auth.region());
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(http.timeout_secs))
            .build()
            .map_err(|e| Error::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            auth,
            service,
            signing_name,
            options: SigningOptions::JSON_SERVICE,
            endpoint,
        })
    }

    /// Point the client at a different endpoint (VPC endpoint, local stack)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_signing_options(mut self, options: SigningOptions) -> Self {
        self.options = options;
        self
    }

    /// Send a JSON request and decode a JSON response
    pub async fn send_json(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let payload = match body {
            Some(body) => serde_json::to_vec(body)?,
            None => Vec::new(),
        };
        let headers = [
            ("content-type".to_string(), "application/json".to_string()),
            ("accept".to_string(), "application/json".to_string()),
        ];

        let bytes = self.send(method, path, &headers, payload).await?;
        if bytes.is_empty() {
            return Ok(Value::Object(Default::default()));
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            Error::Service(ServiceError::transport(
                self.service,
                format!("Invalid JSON response: {}", e),
            ))
        })
    }

    /// Send a signed request and return the raw body of a 2xx response
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        headers: &[(String, String)],
        payload: Vec<u8>,
    ) -> Result<Vec<u8>> {
        let url = Url::parse(&format!("{}{}", self.endpoint, path))
            .map_err(|e| Error::config(format!("Invalid endpoint URL {}{}: {}", self.endpoint, path, e)))?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(Error::config(format!("Endpoint has no host: {}", url))),
        };
        let query: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let signed = self.auth.sign(
            &SignableRequest {
                method: method.as_str(),
                host: &host,
                path: url.path(),
                query: &query,
                headers,
                payload: &payload,
            },
            self.signing_name,
            self.options,
        );

        let mut header_map = HeaderMap::new();
        for (name, value) in headers.iter().chain(signed.iter()) {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::internal(format!("Invalid header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::internal(format!("Invalid header value: {}", e)))?;
            header_map.insert(name, value);
        }

        tracing::debug!("{} {} {}", self.service, method, url.path());

        let response = self
            .http
            .request(method, url)
            .headers(header_map)
            .body(payload)
            .send()
            .await
            .map_err(|e| ServiceError::transport(self.service, e.to_string()))?;

        let status = response.status();
        let error_type = response
            .headers()
            .get("x-amzn-errortype")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| ServiceError::transport(self.service, e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Service(decode_error(
                self.service,
                status.as_u16(),
                error_type.as_deref(),
                &body,
            )));
        }

        Ok(body.to_vec())
    }
}

/// Percent-encode one path segment (model IDs contain ':')
pub fn encode_path_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Percent-encode an object key, keeping '/' separators
pub fn encode_key_path(key: &str) -> String {
    key.split('/')
        .map(encode_path_segment)
        .collect::<Vec<_>>()
        .join("/")
}

fn xml_tag<'a>(body: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = body.find(&open)? + open.len();
    let end = body[start..].find(&close)? + start;
    Some(&body[start..end])
}

/// Decode an AWS error response into a ServiceError
///
/// The code comes from `x-amzn-ErrorType`, the JSON `__type`/`code` field or
/// the S3 XML `<Code>` element, in that order.
pub fn decode_error(service: &str, status: u16, error_type: Option<&str>, body: &[u8]) -> ServiceError {
    let text = String::from_utf8_lossy(body);
    let json: Option<Value> = serde_json::from_slice(body).ok();

    let header_code = error_type
        .and_then(|v| v.split(':').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    let json_code = json.as_ref().and_then(|j| {
        ["__type", "code", "Code"]
            .iter()
            .find_map(|key| j.get(*key).and_then(Value::as_str))
            .map(|code| code.rsplit('#').next().unwrap_or(code).to_string())
    });

    let code = header_code
        .or(json_code)
        .or_else(|| xml_tag(&text, "Code").map(str::to_string));

    let message = json
        .as_ref()
        .and_then(|j| {
            ["message", "Message"]
                .iter()
                .find_map(|key| j.get(*key).and_then(Value::as_str))
                .map(str::to_string)
        })
        .or_else(|| xml_tag(&text, "Message").map(str::to_string))
        .unwrap_or_else(|| {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                "no error body".to_string()
            } else {
                trimmed.chars().take(MAX_ERROR_BODY).collect()
            }
        });

    ServiceError::api(service, status, code, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_json_error_with_header() {
        let err = decode_error(
            "bedrock-agent-runtime",
            404,
            Some("ResourceNotFoundException:http://internal.amazon.com/coral/"),
            br#"{"message":"Knowledge base HBPKZNSUMS not found"}"#,
        );
        assert_eq!(err.status, Some(404));
        assert_eq!(err.code.as_deref(), Some("ResourceNotFoundException"));
        assert_eq!(err.message, "Knowledge base HBPKZNSUMS not found");
    }

    #[test]
    fn test_decode_json_type_field() {
        let err = decode_error(
            "rds-data",
            400,
            None,
            br#"{"__type":"com.amazon.rdsdata#BadRequestException","Message":"syntax error"}"#,
        );
        assert_eq!(err.code.as_deref(), Some("BadRequestException"));
        assert_eq!(err.message, "syntax error");
    }

    #[test]
    fn test_decode_s3_xml_error() {
        let body = b"<?xml version=\"1.0\"?><Error><Code>NoSuchKey</Code><Message>The specified key does not exist.</Message></Error>";
        let err = decode_error("s3", 404, None, body);
        assert_eq!(err.code.as_deref(), Some("NoSuchKey"));
        assert_eq!(err.message, "The specified key does not exist.");
    }

    #[test]
    fn test_decode_plain_body() {
        let err = decode_error("bedrock-runtime", 502, None, b"");
        assert_eq!(err.code, None);
        assert_eq!(err.message, "no error body");
    }

    #[test]
    fn test_encode_paths() {
        assert_eq!(
            encode_path_segment("anthropic.claude-3-sonnet-20240229-v1:0"),
            "anthropic.claude-3-sonnet-20240229-v1%3A0"
        );
        assert_eq!(encode_key_path("manuals/DT 1000.pdf"), "manuals/DT%201000.pdf");
    }
}
