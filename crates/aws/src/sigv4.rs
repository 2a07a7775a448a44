//! AWS Signature Version 4 request signing.
//!
//! Implements the header-based flavour of SigV4: the request is reduced to
//! its canonical form, hashed into a string-to-sign under a
//! `date/region/service/aws4_request` scope, and signed with a key derived
//! from the secret access key by a chain of HMAC-SHA256 operations. The
//! result is added as an `authorization` header alongside `x-amz-date`,
//! `x-amz-security-token` and `x-amz-content-sha256`.
//!
//! Everything is a pure function of the request, credentials, region,
//! service and timestamp, so fixed inputs always produce the same headers.

use crate::{AwsCredentials, AwsError};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

/// Signing algorithm identifier.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

const AMZ_DATE_HEADER: &str = "x-amz-date";
const TOKEN_HEADER: &str = "x-amz-security-token";
const SHA256_HEADER: &str = "x-amz-content-sha256";
const AUTH_HEADER: &str = "authorization";
const SCOPE_TERMINATOR: &str = "aws4_request";

/// Headers that never take part in the signature.
const UNSIGNABLE_HEADERS: &[&str] = &[
    "authorization",
    "cache-control",
    "connection",
    "expect",
    "from",
    "keep-alive",
    "max-forwards",
    "pragma",
    "referer",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "user-agent",
    "x-amzn-trace-id",
];

/// An HTTP request as seen by the signer.
///
/// Header names keep the casing and order they were inserted with; signing
/// appends its own headers at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// HTTP method, e.g. `POST`
    pub method: String,
    /// Absolute path, e.g. `/`
    pub path: String,
    /// Query string without the leading `?`
    pub query: String,
    /// Request headers
    pub headers: IndexMap<String, String>,
    /// Request body
    pub body: String,
}

/// Everything besides the request that determines a signature.
#[derive(Debug, Clone)]
pub struct SigningParams<'a> {
    /// Key pair (and session token) to sign with
    pub credentials: &'a AwsCredentials,
    /// Region of the target endpoint
    pub region: &'a str,
    /// Service signing name, e.g. `sts`
    pub service: &'a str,
    /// Signing timestamp
    pub time: DateTime<Utc>,
    /// Whether to add an `x-amz-content-sha256` header
    pub apply_checksum: bool,
}

/// Intermediate values of a signature, kept for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// The canonical request that was hashed
    pub canonical_request: String,
    /// The string that was signed
    pub string_to_sign: String,
    /// Semicolon-separated list of signed header names
    pub signed_headers: String,
    /// Hex-encoded signature
    pub signature: String,
}

/// Sign `request` in place.
///
/// # Errors
///
/// Returns [`AwsError::Signing`] if the HMAC key cannot be initialised.
pub fn sign(request: &mut HttpRequest, params: &SigningParams<'_>) -> Result<Signature, AwsError> {
    let long_date = params.time.format("%Y%m%dT%H%M%SZ").to_string();
    let short_date = params.time.format("%Y%m%d").to_string();
    let scope = format!(
        "{short_date}/{}/{}/{SCOPE_TERMINATOR}",
        params.region, params.service
    );

    request.headers.retain(|name, _| {
        let lower = name.to_ascii_lowercase();
        lower != AUTH_HEADER && lower != AMZ_DATE_HEADER && lower != "date"
    });
    request
        .headers
        .insert(AMZ_DATE_HEADER.to_string(), long_date.clone());
    if let Some(token) = params.credentials.session_token() {
        request
            .headers
            .insert(TOKEN_HEADER.to_string(), token.to_string());
    }

    let payload_hash = hex_sha256(request.body.as_bytes());
    let has_checksum = request
        .headers
        .keys()
        .any(|name| name.eq_ignore_ascii_case(SHA256_HEADER));
    if params.apply_checksum && !has_checksum {
        request
            .headers
            .insert(SHA256_HEADER.to_string(), payload_hash.clone());
    }

    let canonical_headers = canonical_headers(&request.headers);
    let signed_headers = canonical_headers
        .keys()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(";");
    let canonical_request = canonical_request(
        request,
        &canonical_headers,
        &signed_headers,
        &payload_hash,
    );
    let string_to_sign = format!(
        "{ALGORITHM}\n{long_date}\n{scope}\n{}",
        hex_sha256(canonical_request.as_bytes())
    );

    let key = signing_key(
        params.credentials.secret_access_key(),
        &short_date,
        params.region,
        params.service,
    )?;
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

    request.headers.insert(
        AUTH_HEADER.to_string(),
        format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            params.credentials.access_key_id()
        ),
    );

    Ok(Signature {
        canonical_request,
        string_to_sign,
        signed_headers,
        signature,
    })
}

/// Lower-cased, trimmed, sorted headers that participate in the signature.
fn canonical_headers(headers: &IndexMap<String, String>) -> BTreeMap<String, String> {
    let mut canonical: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let name = name.to_ascii_lowercase();
        if UNSIGNABLE_HEADERS.contains(&name.as_str()) {
            continue;
        }
        let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
        canonical
            .entry(name)
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    canonical
}

fn canonical_query(query: &str) -> String {
    let mut pairs: Vec<(&str, &str)> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .collect();
    pairs.sort_unstable();
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn canonical_request(
    request: &HttpRequest,
    canonical_headers: &BTreeMap<String, String>,
    signed_headers: &str,
    payload_hash: &str,
) -> String {
    let headers: String = canonical_headers
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect();
    let path = if request.path.is_empty() {
        "/"
    } else {
        request.path.as_str()
    };

    format!(
        "{}\n{path}\n{}\n{headers}\n{signed_headers}\n{payload_hash}",
        request.method.to_ascii_uppercase(),
        canonical_query(&request.query),
    )
}

/// Derive the per-day, per-region, per-service signing key.
fn signing_key(
    secret_access_key: &str,
    short_date: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, AwsError> {
    let k_date = hmac_sha256(
        format!("AWS4{secret_access_key}").as_bytes(),
        short_date.as_bytes(),
    )?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, SCOPE_TERMINATOR.as_bytes())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, AwsError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| AwsError::Signing {
        message: format!("Invalid signing key: {e}"),
    })?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn hex_sha256(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
