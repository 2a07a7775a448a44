//! Error types for Infisical login and secret retrieval

use keyrelay_aws::AwsError;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

/// Errors raised while obtaining an access token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Universal auth selected without a client id or client secret
    #[error("Missing universal auth credentials: both client id and client secret are required")]
    MissingCredentials,

    /// OIDC or AWS IAM auth selected without an identity id
    #[error("Missing identity ID for {method} auth")]
    MissingIdentity {
        /// Auth method tag that needed the identity
        method: &'static str,
    },

    /// The method selector is not one of the known tags
    #[error("Invalid authentication method: {method}")]
    UnsupportedMethod {
        /// The tag that was supplied
        method: String,
    },

    /// The AWS credential chain produced nothing usable
    #[error("AWS credentials not found: {message}")]
    CredentialsUnavailable {
        /// Detail from the credential chain
        message: String,
    },

    /// The AWS region could not be determined
    #[error("Unable to determine AWS region: {message}")]
    RegionUnavailable {
        /// Detail from the region resolver
        message: String,
    },

    /// The AWS identity proof could not be signed
    #[error("Failed to sign AWS identity request: {message}")]
    Signing {
        /// Detail of the signing failure
        message: String,
    },

    /// The execution environment could not mint an identity token
    #[error("Failed to obtain OIDC identity token: {message}")]
    IdentityToken {
        /// Detail of the failure
        message: String,
    },

    /// The login endpoint refused the proof, or could not be reached
    #[error("Login rejected{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    RemoteRejected {
        /// HTTP status, absent for transport failures
        status: Option<u16>,
        /// Server-provided message when available
        message: String,
    },
}

impl From<AwsError> for AuthError {
    fn from(err: AwsError) -> Self {
        match err {
            AwsError::RegionUnavailable { message } => Self::RegionUnavailable { message },
            AwsError::CredentialsUnavailable { message } => {
                Self::CredentialsUnavailable { message }
            }
            AwsError::Signing { message } => Self::Signing { message },
        }
    }
}

/// Errors raised while fetching secrets.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response
    #[error("Failed to reach secrets endpoint: {message}")]
    Transport {
        /// Transport error detail
        message: String,
    },

    /// The server answered with a non-2xx status
    #[error("Secrets request failed (HTTP {status}): {message}")]
    Rejected {
        /// HTTP status
        status: u16,
        /// Server-provided message when available
        message: String,
    },

    /// The response body did not have the expected shape
    #[error("Unexpected secrets response: {message}")]
    Decode {
        /// Deserialization error detail
        message: String,
    },
}

/// Errors raised while building the HTTP client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The domain is not an absolute http(s) URL
    #[error("Invalid Infisical domain '{domain}': {message}")]
    InvalidDomain {
        /// The configured domain
        domain: String,
        /// Parse error detail
        message: String,
    },

    /// A default header has an invalid name or value
    #[error("Invalid header '{name}': {message}")]
    InvalidHeader {
        /// Header name
        name: String,
        /// Validation error detail
        message: String,
    },

    /// The HTTP client could not be initialised
    #[error("Failed to build HTTP client: {message}")]
    Build {
        /// Builder error detail
        message: String,
    },
}

/// Log a non-2xx response body and return the message to surface.
///
/// A structured `message` field is logged verbatim, followed by the whole
/// JSON body pretty-printed, so operators see what the server said.
pub(crate) fn report_remote_error(status: StatusCode, body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| v.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string);

    match &message {
        Some(message) => error!(status = status.as_u16(), "{message}"),
        None => error!(status = status.as_u16(), "Request failed"),
    }
    if let Some(body @ Value::Object(_)) = &parsed
        && let Ok(pretty) = serde_json::to_string_pretty(body)
    {
        error!("{pretty}");
    }

    message.unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            status.to_string()
        } else {
            trimmed.to_string()
        }
    })
}

/// Body of a non-2xx response, empty when it cannot be read.
pub(crate) async fn read_error_body(response: reqwest::Response) -> String {
    body_or_empty(response.text().await)
}

fn body_or_empty(body: Result<String, reqwest::Error>) -> String {
    body.unwrap_or_else(|e| {
        debug!("Failed to read error response body: {e}");
        String::new()
    })
}

/// Log a failed request (transport or decode) and return its message.
pub(crate) fn report_request_error(err: &reqwest::Error) -> String {
    let message = err.to_string();
    error!("{message}");
    message
}
