//! Signed `sts:GetCallerIdentity` proof for AWS IAM login.
//!
//! The proof is a fully signed STS request that is never sent to AWS by this
//! process. Its body and headers are base64-encoded and handed to the secret
//! service, which replays the request against STS to learn who signed it.

use crate::sigv4::{self, HttpRequest, SigningParams};
use crate::{AwsError, CredentialSource, DefaultChainCredentials, RegionResolver};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::debug;

/// Body of the `GetCallerIdentity` request.
pub const STS_REQUEST_BODY: &str = "Action=GetCallerIdentity&Version=2011-06-15";

/// HTTP method of the signed request.
pub const STS_REQUEST_METHOD: &str = "POST";

const STS_SERVICE: &str = "sts";
const STS_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// Login fields proving control of an AWS identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IamLoginPayload {
    /// Machine identity the proof is presented for
    pub identity_id: String,
    /// Method of the signed request (always `POST`)
    pub http_request_method: String,
    /// Base64 of the request body
    pub request_body: String,
    /// Base64 of the JSON object of signed headers
    pub request_headers: String,
}

impl IamLoginPayload {
    /// Form fields in the order the login endpoint expects.
    #[must_use]
    pub fn form_fields(&self) -> [(&'static str, &str); 4] {
        [
            ("identityId", self.identity_id.as_str()),
            ("iamHttpRequestMethod", self.http_request_method.as_str()),
            ("iamRequestBody", self.request_body.as_str()),
            ("iamRequestHeaders", self.request_headers.as_str()),
        ]
    }
}

/// The unsigned `GetCallerIdentity` request for a region.
#[must_use]
pub fn sts_request(region: &str) -> HttpRequest {
    let host = format!("sts.{region}.amazonaws.com");
    HttpRequest {
        method: STS_REQUEST_METHOD.to_string(),
        path: "/".to_string(),
        query: String::new(),
        headers: IndexMap::from([
            ("Content-Type".to_string(), STS_CONTENT_TYPE.to_string()),
            ("Host".to_string(), host),
            (
                "Content-Length".to_string(),
                STS_REQUEST_BODY.len().to_string(),
            ),
        ]),
        body: STS_REQUEST_BODY.to_string(),
    }
}

/// Encode a signed request as a login payload.
///
/// The `authorization` header is renamed to `Authorization`; every other
/// header keeps the name it was signed with.
///
/// # Errors
///
/// Returns [`AwsError::Signing`] if the headers cannot be serialized.
pub fn login_payload(identity_id: &str, request: &HttpRequest) -> Result<IamLoginPayload, AwsError> {
    let headers: IndexMap<String, &str> = request
        .headers
        .iter()
        .map(|(name, value)| {
            let name = if name.eq_ignore_ascii_case("authorization") {
                "Authorization".to_string()
            } else {
                name.clone()
            };
            (name, value.as_str())
        })
        .collect();
    let headers_json = serde_json::to_string(&headers).map_err(|e| AwsError::Signing {
        message: format!("Failed to serialize signed headers: {e}"),
    })?;

    Ok(IamLoginPayload {
        identity_id: identity_id.to_string(),
        http_request_method: request.method.clone(),
        request_body: STANDARD.encode(request.body.as_bytes()),
        request_headers: STANDARD.encode(headers_json.as_bytes()),
    })
}

/// Builds signed identity proofs from the ambient region and credentials.
#[derive(Clone)]
pub struct CloudIdentitySigner {
    regions: RegionResolver,
    credentials: Arc<dyn CredentialSource>,
}

impl std::fmt::Debug for CloudIdentitySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudIdentitySigner")
            .field("regions", &self.regions)
            .finish_non_exhaustive()
    }
}

impl CloudIdentitySigner {
    /// Create a signer from explicit collaborators.
    #[must_use]
    pub fn new(regions: RegionResolver, credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            regions,
            credentials,
        }
    }

    /// Signer using `AWS_REGION`/instance metadata and the SDK default chain.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(
            RegionResolver::from_env(),
            Arc::new(DefaultChainCredentials::new()),
        )
    }

    /// Produce a login payload signed at the current time.
    ///
    /// # Errors
    ///
    /// Returns [`AwsError::RegionUnavailable`] or
    /// [`AwsError::CredentialsUnavailable`] when the ambient environment
    /// cannot supply a region or a key pair.
    pub async fn sign_login(&self, identity_id: &str) -> Result<IamLoginPayload, AwsError> {
        self.sign_login_at(identity_id, Utc::now()).await
    }

    /// Produce a login payload signed at `time`.
    ///
    /// # Errors
    ///
    /// See [`sign_login`](Self::sign_login).
    pub async fn sign_login_at(
        &self,
        identity_id: &str,
        time: DateTime<Utc>,
    ) -> Result<IamLoginPayload, AwsError> {
        let region = self.regions.resolve().await?;
        let mut request = sts_request(&region);
        let credentials = self.credentials.credentials().await?;

        let signature = sigv4::sign(
            &mut request,
            &SigningParams {
                credentials: &credentials,
                region: &region,
                service: STS_SERVICE,
                time,
                apply_checksum: true,
            },
        )?;
        debug!(
            %region,
            signed_headers = %signature.signed_headers,
            "Signed sts:GetCallerIdentity request"
        );

        login_payload(identity_id, &request)
    }
}
