//! AWS integration for keyrelay
//!
//! Builds the proof-of-identity used by AWS IAM login without ever sending
//! long-lived key material to the secret service:
//! - [`region`]: region discovery (`AWS_REGION`, then instance metadata)
//! - [`credentials`]: short-lived credentials from the SDK default chain
//! - [`sigv4`]: Signature Version 4 request signing
//! - [`identity`]: the signed `sts:GetCallerIdentity` login payload

pub mod credentials;
mod error;
pub mod identity;
pub mod region;
pub mod sigv4;

pub use credentials::{AwsCredentials, CredentialSource, DefaultChainCredentials, StaticCredentials};
pub use error::AwsError;
pub use identity::{CloudIdentitySigner, IamLoginPayload};
pub use region::RegionResolver;
