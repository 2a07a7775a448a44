//! Login protocols that exchange a proof of identity for an access token.
//!
//! Three interchangeable methods are supported:
//! - `universal`: client id + client secret (shared secret)
//! - `oidc`: a JWT minted by the CI runner (federated token)
//! - `aws-iam`: a signed `sts:GetCallerIdentity` request (cloud identity)
//!
//! Each [`AuthMethod`] variant carries only the fields its protocol needs;
//! the constructors reject missing fields before anything touches the
//! network.

use crate::oidc::{GitHubActionsIdTokenProvider, IdTokenProvider};
use crate::{AuthError, InfisicalClient};
use keyrelay_aws::CloudIdentitySigner;
use keyrelay_secrets::{Credential, SecureSecret};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument};

/// Login endpoint for universal (client credential) auth.
pub const UNIVERSAL_AUTH_LOGIN_PATH: &str = "/api/v1/auth/universal-auth/login";
/// Login endpoint for OIDC auth.
pub const OIDC_AUTH_LOGIN_PATH: &str = "/api/v1/auth/oidc-auth/login";
/// Login endpoint for AWS IAM auth.
pub const AWS_AUTH_LOGIN_PATH: &str = "/api/v1/auth/aws-auth/login";

/// The method selector tags accepted from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethodKind {
    /// `universal`
    Universal,
    /// `oidc`
    Oidc,
    /// `aws-iam`
    AwsIam,
}

impl AuthMethodKind {
    /// The configuration tag for this method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Universal => "universal",
            Self::Oidc => "oidc",
            Self::AwsIam => "aws-iam",
        }
    }
}

impl fmt::Display for AuthMethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethodKind {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "universal" => Ok(Self::Universal),
            "oidc" => Ok(Self::Oidc),
            "aws-iam" => Ok(Self::AwsIam),
            other => Err(AuthError::UnsupportedMethod {
                method: other.to_string(),
            }),
        }
    }
}

/// Loosely-typed login inputs as they arrive from configuration.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Method selector tag
    pub method: String,
    /// Universal auth client id
    pub client_id: Option<String>,
    /// Universal auth client secret
    pub client_secret: Option<SecureSecret>,
    /// Machine identity id for OIDC and AWS IAM auth
    pub identity_id: Option<String>,
    /// Audience requested for the OIDC token
    pub oidc_audience: Option<String>,
}

/// A fully-specified login method.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// Universal auth with a client id and secret.
    SharedSecret {
        /// Client id
        client_id: String,
        /// Client secret
        client_secret: SecureSecret,
    },
    /// OIDC auth with a token minted by the execution environment.
    FederatedToken {
        /// Machine identity id
        identity_id: String,
        /// Audience for the minted token
        audience: Option<String>,
    },
    /// AWS IAM auth with a signed STS request.
    CloudIdentity {
        /// Machine identity id
        identity_id: String,
    },
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

impl AuthMethod {
    /// Universal auth.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingCredentials`] if either value is blank.
    pub fn shared_secret(
        client_id: impl Into<String>,
        client_secret: SecureSecret,
    ) -> Result<Self, AuthError> {
        let client_id = client_id.into();
        if client_id.trim().is_empty() || client_secret.is_blank() {
            return Err(AuthError::MissingCredentials);
        }
        Ok(Self::SharedSecret {
            client_id,
            client_secret,
        })
    }

    /// OIDC auth.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingIdentity`] if the identity id is blank.
    pub fn federated_token(
        identity_id: impl Into<String>,
        audience: Option<String>,
    ) -> Result<Self, AuthError> {
        let identity_id = identity_id.into();
        if identity_id.trim().is_empty() {
            return Err(AuthError::MissingIdentity {
                method: AuthMethodKind::Oidc.as_str(),
            });
        }
        Ok(Self::FederatedToken {
            identity_id,
            audience: audience.filter(|a| !a.is_empty()),
        })
    }

    /// AWS IAM auth.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingIdentity`] if the identity id is blank.
    pub fn cloud_identity(identity_id: impl Into<String>) -> Result<Self, AuthError> {
        let identity_id = identity_id.into();
        if identity_id.trim().is_empty() {
            return Err(AuthError::MissingIdentity {
                method: AuthMethodKind::AwsIam.as_str(),
            });
        }
        Ok(Self::CloudIdentity { identity_id })
    }

    /// Select and validate a method from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnsupportedMethod`] for an unknown tag, or the
    /// missing-field error of the selected method.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        match config.method.parse::<AuthMethodKind>()? {
            AuthMethodKind::Universal => {
                let client_id = non_blank(config.client_id.as_deref())
                    .ok_or(AuthError::MissingCredentials)?;
                let client_secret = config
                    .client_secret
                    .clone()
                    .ok_or(AuthError::MissingCredentials)?;
                Self::shared_secret(client_id, client_secret)
            }
            AuthMethodKind::Oidc => Self::federated_token(
                non_blank(config.identity_id.as_deref()).unwrap_or_default(),
                config.oidc_audience.clone(),
            ),
            AuthMethodKind::AwsIam => {
                Self::cloud_identity(non_blank(config.identity_id.as_deref()).unwrap_or_default())
            }
        }
    }

    /// Which protocol this is.
    #[must_use]
    pub const fn kind(&self) -> AuthMethodKind {
        match self {
            Self::SharedSecret { .. } => AuthMethodKind::Universal,
            Self::FederatedToken { .. } => AuthMethodKind::Oidc,
            Self::CloudIdentity { .. } => AuthMethodKind::AwsIam,
        }
    }

    /// Login endpoint path for this protocol.
    #[must_use]
    pub const fn login_path(&self) -> &'static str {
        match self {
            Self::SharedSecret { .. } => UNIVERSAL_AUTH_LOGIN_PATH,
            Self::FederatedToken { .. } => OIDC_AUTH_LOGIN_PATH,
            Self::CloudIdentity { .. } => AWS_AUTH_LOGIN_PATH,
        }
    }

    /// Re-check required fields; variants can be built directly.
    fn validate(&self) -> Result<(), AuthError> {
        match self {
            Self::SharedSecret {
                client_id,
                client_secret,
            } if client_id.trim().is_empty() || client_secret.is_blank() => {
                Err(AuthError::MissingCredentials)
            }
            Self::FederatedToken { identity_id, .. } | Self::CloudIdentity { identity_id }
                if identity_id.trim().is_empty() =>
            {
                Err(AuthError::MissingIdentity {
                    method: self.kind().as_str(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Obtains bearer credentials using one of the login protocols.
#[derive(Clone)]
pub struct CredentialAcquirer {
    client: InfisicalClient,
    id_tokens: Arc<dyn IdTokenProvider>,
    cloud_signer: CloudIdentitySigner,
}

impl fmt::Debug for CredentialAcquirer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialAcquirer")
            .field("client", &self.client)
            .field("cloud_signer", &self.cloud_signer)
            .finish_non_exhaustive()
    }
}

impl CredentialAcquirer {
    /// Create an acquirer from explicit collaborators.
    #[must_use]
    pub fn new(
        client: InfisicalClient,
        id_tokens: Arc<dyn IdTokenProvider>,
        cloud_signer: CloudIdentitySigner,
    ) -> Self {
        Self {
            client,
            id_tokens,
            cloud_signer,
        }
    }

    /// Acquirer using the GitHub Actions token endpoint and the ambient AWS
    /// environment.
    #[must_use]
    pub fn from_env(client: InfisicalClient) -> Self {
        Self::new(
            client,
            Arc::new(GitHubActionsIdTokenProvider::from_env()),
            CloudIdentitySigner::from_env(),
        )
    }

    /// Exchange a proof of identity for an access token.
    ///
    /// Exactly one login request is made; nothing is retried.
    ///
    /// # Errors
    ///
    /// Returns the missing-field [`AuthError`] variants without any network
    /// call, [`AuthError::IdentityToken`], [`AuthError::RegionUnavailable`] or
    /// [`AuthError::CredentialsUnavailable`] when the environment cannot
    /// provide a proof, and [`AuthError::RemoteRejected`] when the login
    /// endpoint fails.
    #[instrument(skip_all, fields(method = %method.kind()))]
    pub async fn acquire(&self, method: &AuthMethod) -> Result<Credential, AuthError> {
        method.validate()?;

        let credential = match method {
            AuthMethod::SharedSecret {
                client_id,
                client_secret,
            } => {
                self.client
                    .login(
                        method.login_path(),
                        &[
                            ("clientId", client_id.as_str()),
                            ("clientSecret", client_secret.expose()),
                        ],
                    )
                    .await?
            }
            AuthMethod::FederatedToken {
                identity_id,
                audience,
            } => {
                let jwt = self.id_tokens.id_token(audience.as_deref()).await?;
                self.client
                    .login(
                        method.login_path(),
                        &[("identityId", identity_id.as_str()), ("jwt", jwt.expose())],
                    )
                    .await?
            }
            AuthMethod::CloudIdentity { identity_id } => {
                let payload = self.cloud_signer.sign_login(identity_id).await?;
                self.client
                    .login(method.login_path(), &payload.form_fields())
                    .await?
            }
        };

        info!("Obtained access token");
        Ok(credential)
    }
}
