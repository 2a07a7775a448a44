//! Error type for the AWS identity proof

use thiserror::Error;

/// Errors raised while building an AWS IAM identity proof.
#[derive(Debug, Error)]
pub enum AwsError {
    /// Neither `AWS_REGION` nor the instance metadata service produced a region
    #[error("Unable to determine AWS region: {message}")]
    RegionUnavailable {
        /// What went wrong while querying the metadata service
        message: String,
    },

    /// The credential chain yielded no access key / secret key pair
    #[error("AWS credentials not found: {message}")]
    CredentialsUnavailable {
        /// Detail from the credential provider chain
        message: String,
    },

    /// The request could not be signed
    #[error("Failed to sign AWS request: {message}")]
    Signing {
        /// Detail of the signing failure
        message: String,
    },
}

impl AwsError {
    pub(crate) fn region(message: impl Into<String>) -> Self {
        Self::RegionUnavailable {
            message: message.into(),
        }
    }

    pub(crate) fn credentials(message: impl Into<String>) -> Self {
        Self::CredentialsUnavailable {
            message: message.into(),
        }
    }
}
