//! Secret values and resolution results for keyrelay
//!
//! Shared domain types used by the credential and secret-fetch crates:
//!
//! - [`Credential`]: the bearer token returned by a login endpoint
//! - [`SecretEntry`]: one key/value pair from the secrets API
//! - [`ResolvedSecrets`]: the flattened mapping after merging imports
//! - [`redaction`]: the process-wide registry of values masked from logs
//! - [`dotenv`]: the `KEY='value'` file shape

pub mod dotenv;
pub mod redaction;
mod resolved;
mod types;

pub use resolved::ResolvedSecrets;
pub use types::{Credential, SecretEntry, SecureSecret};

use thiserror::Error;

/// Errors raised while handling secret files.
#[derive(Debug, Error)]
pub enum SecretError {
    /// A line in a `KEY='value'` file could not be parsed
    #[error("Malformed secrets file: line {line} is not a KEY='value' pair")]
    MalformedLine {
        /// 1-based line number
        line: usize,
    },
}
