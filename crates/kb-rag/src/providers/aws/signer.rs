//! AWS Signature Version 4 request signing
//!
//! Produces the `Authorization` and `x-amz-*` headers for a request. The
//! signer is pure: the caller passes the signing time, which keeps it
//! testable against the published AWS test vectors.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use super::auth::AwsCredentials;

type HmacSha256 = Hmac<Sha256>;

/// Signing algorithm identifier
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// SHA-256 of an empty payload
pub const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Per-service signing behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningOptions {
    /// Encode each path segment a second time (every service except S3)
    pub double_encode_path: bool,
    /// Send and sign `x-amz-content-sha256` (required by S3)
    pub sign_content_sha256: bool,
}

impl SigningOptions {
    /// Options for JSON services (Bedrock, RDS Data)
    pub const JSON_SERVICE: SigningOptions = SigningOptions {
        double_encode_path: true,
        sign_content_sha256: false,
    };

    /// Options for S3
    pub const S3: SigningOptions = SigningOptions {
        double_encode_path: false,
        sign_content_sha256: true,
    };
}

/// Identity and scope used to sign
pub struct SigningParams<'a> {
    pub credentials: &'a AwsCredentials,
    pub region: &'a str,
    /// Signing name (e.g. "bedrock", "rds-data", "s3")
    pub service: &'a str,
    pub time: DateTime<Utc>,
    pub options: SigningOptions,
}

/// The parts of an HTTP request covered by the signature
pub struct SignableRequest<'a> {
    pub method: &'a str,
    /// Host header value, including a non-default port
    pub host: &'a str,
    /// Path as sent on the wire (already percent-encoded once)
    pub path: &'a str,
    /// Decoded query parameters
    pub query: &'a [(String, String)],
    /// Additional headers to sign (e.g. content-type)
    pub headers: &'a [(String, String)],
    pub payload: &'a [u8],
}

/// Hex-encoded SHA-256
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Derive the signing key for a date (`YYYYMMDD`), region and service
pub fn derive_signing_key(secret_access_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{}", secret_access_key).as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

fn canonical_uri(path: &str, double_encode: bool) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    if !double_encode {
        return path.to_string();
    }
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn canonical_query(query: &[(String, String)]) -> String {
    let mut pairs: Vec<(String, String)> = query
        .iter()
        .map(|(k, v)| {
            (
                urlencoding::encode(k).into_owned(),
                urlencoding::encode(v).into_owned(),
            )
        })
        .collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the canonical request string
pub fn canonical_request(
    request: &SignableRequest<'_>,
    signed: &[(String, String)],
    payload_hash: &str,
    double_encode_path: bool,
) -> String {
    let canonical_headers: String = signed
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value))
        .collect();
    let signed_headers = signed
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        request.method,
        canonical_uri(request.path, double_encode_path),
        canonical_query(request.query),
        canonical_headers,
        signed_headers,
        payload_hash
    )
}

/// Sign a request, returning the headers to add to it
pub fn sign(request: &SignableRequest<'_>, params: &SigningParams<'_>) -> Vec<(String, String)> {
    let amz_date = params.time.format("%Y%m%dT%H%M%SZ").to_string();
    let date = params.time.format("%Y%m%d").to_string();
    let payload_hash = sha256_hex(request.payload);

    let mut added = vec![("x-amz-date".to_string(), amz_date.clone())];
    if let Some(token) = &params.credentials.session_token {
        added.push(("x-amz-security-token".to_string(), token.clone()));
    }
    if params.options.sign_content_sha256 {
        added.push(("x-amz-content-sha256".to_string(), payload_hash.clone()));
    }

    let mut signed: Vec<(String, String)> = vec![("host".to_string(), request.host.to_string())];
    signed.extend(
        request
            .headers
            .iter()
            .chain(added.iter())
            .map(|(name, value)| (name.to_ascii_lowercase(), value.trim().to_string())),
    );
    signed.sort_by(|a, b| a.0.cmp(&b.0));

    let canonical = canonical_request(request, &signed, &payload_hash, params.options.double_encode_path);
    let scope = format!("{}/{}/{}/aws4_request", date, params.region, params.service);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        sha256_hex(canonical.as_bytes())
    );

    let key = derive_signing_key(
        &params.credentials.secret_access_key,
        &date,
        params.region,
        params.service,
    );
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()));
    let signed_headers = signed
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    added.push((
        "authorization".to_string(),
        format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, params.credentials.access_key_id, scope, signed_headers, signature
        ),
    ));
    added
}
