//! AWS region discovery.
//!
//! `AWS_REGION` wins when set (Lambda and most CI runners export it). On EC2
//! the region is read from the instance identity document, using an IMDSv2
//! session token.

use crate::AwsError;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Link-local address of the EC2 instance metadata service.
pub const DEFAULT_METADATA_ENDPOINT: &str = "http://169.254.169.254";

/// Deadline applied to each metadata call.
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(5);

const TOKEN_PATH: &str = "/latest/api/token";
const IDENTITY_DOCUMENT_PATH: &str = "/latest/dynamic/instance-identity/document";
const TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";
const TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";
// 6 hours
const TOKEN_TTL_SECONDS: &str = "21600";

#[derive(Debug, Deserialize)]
struct IdentityDocument {
    region: String,
}

/// Resolves the region whose STS endpoint signs the identity proof.
#[derive(Debug, Clone)]
pub struct RegionResolver {
    region_override: Option<String>,
    metadata_endpoint: String,
}

impl RegionResolver {
    /// Create a resolver with an explicit override (empty means unset).
    #[must_use]
    pub fn new(region_override: Option<String>) -> Self {
        Self {
            region_override: region_override.filter(|r| !r.is_empty()),
            metadata_endpoint: DEFAULT_METADATA_ENDPOINT.to_string(),
        }
    }

    /// Create a resolver that honours `AWS_REGION`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(std::env::var("AWS_REGION").ok())
    }

    /// Point the resolver at a different metadata service base URL.
    #[must_use]
    pub fn with_metadata_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.metadata_endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Determine the region.
    ///
    /// # Errors
    ///
    /// Returns [`AwsError::RegionUnavailable`] if there is no override and
    /// either metadata call fails, times out, returns non-2xx, or yields a
    /// document without a region. No retry is attempted.
    pub async fn resolve(&self) -> Result<String, AwsError> {
        if let Some(region) = &self.region_override {
            debug!(%region, "Using AWS region from environment");
            return Ok(region.clone());
        }

        let region = self.query_metadata().await?;
        debug!(%region, "Resolved AWS region from instance metadata");
        Ok(region)
    }

    async fn query_metadata(&self) -> Result<String, AwsError> {
        let client = Client::builder()
            .timeout(METADATA_TIMEOUT)
            .build()
            .map_err(|e| AwsError::region(format!("Failed to build metadata client: {e}")))?;

        let token_url = format!("{}{TOKEN_PATH}", self.metadata_endpoint);
        debug!(url = %token_url, "Requesting instance metadata token");
        let token = client
            .put(&token_url)
            .header(TOKEN_TTL_HEADER, TOKEN_TTL_SECONDS)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AwsError::region(format!("Metadata token request failed: {e}")))?
            .text()
            .await
            .map_err(|e| AwsError::region(format!("Failed to read metadata token: {e}")))?;

        let document_url = format!("{}{IDENTITY_DOCUMENT_PATH}", self.metadata_endpoint);
        debug!(url = %document_url, "Fetching instance identity document");
        let document: IdentityDocument = client
            .get(&document_url)
            .header(TOKEN_HEADER, token.trim())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AwsError::region(format!("Identity document request failed: {e}")))?
            .json()
            .await
            .map_err(|e| AwsError::region(format!("Malformed identity document: {e}")))?;

        if document.region.is_empty() {
            return Err(AwsError::region("identity document has an empty region"));
        }
        Ok(document.region)
    }
}
