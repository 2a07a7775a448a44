//! Infisical login protocols and secret retrieval
//!
//! [`CredentialAcquirer`] turns an [`AuthMethod`] into a bearer
//! [`Credential`](keyrelay_secrets::Credential); [`SecretResolver`] uses that
//! credential to fetch a [`SecretPath`] and merge its imports.

pub mod auth;
mod client;
mod error;
pub mod oidc;
pub mod secrets;

pub use auth::{AuthConfig, AuthMethod, AuthMethodKind, CredentialAcquirer};
pub use client::{DEFAULT_DOMAIN, InfisicalClient};
pub use error::{AuthError, ClientError, FetchError};
pub use oidc::{GitHubActionsIdTokenProvider, IdTokenProvider};
pub use secrets::{SecretPath, SecretResolver};
