//! Short-lived AWS credentials and where they come from.

use crate::AwsError;
use async_trait::async_trait;
use aws_config::default_provider::credentials::DefaultCredentialsChain;
use aws_credential_types::provider::ProvideCredentials;
use keyrelay_secrets::SecureSecret;
use keyrelay_secrets::redaction::register_secret;

/// An access key pair with an optional session token.
#[derive(Clone, Debug)]
pub struct AwsCredentials {
    access_key_id: String,
    secret_access_key: SecureSecret,
    session_token: Option<SecureSecret>,
}

impl AwsCredentials {
    /// Build credentials, rejecting an empty access key or secret key.
    ///
    /// # Errors
    ///
    /// Returns [`AwsError::CredentialsUnavailable`] when either half of the
    /// key pair is empty.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Result<Self, AwsError> {
        let access_key_id = access_key_id.into();
        let secret_access_key = SecureSecret::new(secret_access_key);
        if access_key_id.is_empty() || secret_access_key.is_empty() {
            return Err(AwsError::credentials(
                "credential chain returned an empty access key or secret key",
            ));
        }

        register_secret(secret_access_key.expose());
        let session_token = session_token.filter(|t| !t.is_empty()).map(|t| {
            register_secret(t.as_str());
            SecureSecret::new(t)
        });

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token,
        })
    }

    /// The access key id (not secret; it appears in the credential scope).
    #[must_use]
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// The secret access key.
    #[must_use]
    pub fn secret_access_key(&self) -> &str {
        self.secret_access_key.expose()
    }

    /// The session token, for temporary credentials.
    #[must_use]
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_ref().map(SecureSecret::expose)
    }
}

/// Something that can hand out AWS credentials.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Produce credentials for signing.
    async fn credentials(&self) -> Result<AwsCredentials, AwsError>;
}

/// The AWS SDK default chain: environment variables, shared config and
/// credential files, web identity, ECS container and EC2 instance roles.
#[derive(Debug, Clone, Default)]
pub struct DefaultChainCredentials;

impl DefaultChainCredentials {
    /// Create a source backed by the SDK default chain.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CredentialSource for DefaultChainCredentials {
    async fn credentials(&self) -> Result<AwsCredentials, AwsError> {
        let chain = DefaultCredentialsChain::builder().build().await;
        let credentials = chain
            .provide_credentials()
            .await
            .map_err(|e| AwsError::credentials(e.to_string()))?;

        tracing::debug!(
            access_key_id = %credentials.access_key_id(),
            temporary = credentials.session_token().is_some(),
            "Loaded AWS credentials from default chain"
        );

        AwsCredentials::new(
            credentials.access_key_id(),
            credentials.secret_access_key(),
            credentials.session_token().map(str::to_string),
        )
    }
}

/// Fixed credentials, for callers that already hold a key pair.
#[derive(Debug, Clone)]
pub struct StaticCredentials(AwsCredentials);

impl StaticCredentials {
    /// Wrap a key pair.
    #[must_use]
    pub const fn new(credentials: AwsCredentials) -> Self {
        Self(credentials)
    }
}

#[async_trait]
impl CredentialSource for StaticCredentials {
    async fn credentials(&self) -> Result<AwsCredentials, AwsError> {
        Ok(self.0.clone())
    }
}
