//! Step failures rendered as miette diagnostics.

use crate::workflow;
use keyrelay_infisical::{AuthError, ClientError, FetchError};
use keyrelay_secrets::redaction::redact;
use miette::{Diagnostic, Report};
use std::io::{self, Write};
use thiserror::Error;

/// Invalid inputs
pub const EXIT_CONFIG: u8 = 2;
/// Login, fetch or export failed
pub const EXIT_FAILURE: u8 = 1;

/// Everything that can fail the step.
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// Inputs are missing or malformed
    #[error("{message}")]
    #[diagnostic(code(keyrelay::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },

    /// No access token could be obtained
    #[error("{message}")]
    #[diagnostic(code(keyrelay::auth))]
    Auth {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },

    /// Secrets could not be fetched
    #[error("{message}")]
    #[diagnostic(code(keyrelay::fetch))]
    Fetch {
        /// The error message
        message: String,
    },

    /// Secrets could not be exported
    #[error("{message}")]
    #[diagnostic(
        code(keyrelay::export),
        help("Check that the output path exists and is writable")
    )]
    Export {
        /// The error message
        message: String,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new export error
    #[must_use]
    pub fn export(message: impl Into<String>) -> Self {
        Self::Export {
            message: message.into(),
        }
    }
}

impl From<AuthError> for CliError {
    fn from(err: AuthError) -> Self {
        let help = match &err {
            AuthError::MissingCredentials => {
                Some("Set the client-id and client-secret inputs".to_string())
            }
            AuthError::MissingIdentity { .. } => Some("Set the identity-id input".to_string()),
            AuthError::UnsupportedMethod { .. } => {
                Some("Supported methods are: universal, oidc, aws-iam".to_string())
            }
            AuthError::IdentityToken { .. } => Some(
                "Grant the job `permissions: id-token: write` so the runner can mint OIDC tokens"
                    .to_string(),
            ),
            AuthError::RegionUnavailable { .. } => {
                Some("Set AWS_REGION or run on an instance with metadata access".to_string())
            }
            _ => None,
        };
        let message = err.to_string();
        match err {
            AuthError::MissingCredentials
            | AuthError::MissingIdentity { .. }
            | AuthError::UnsupportedMethod { .. } => Self::Config { message, help },
            _ => Self::Auth { message, help },
        }
    }
}

impl From<FetchError> for CliError {
    fn from(err: FetchError) -> Self {
        Self::Fetch {
            message: err.to_string(),
        }
    }
}

impl From<ClientError> for CliError {
    fn from(err: ClientError) -> Self {
        Self::config(err.to_string())
    }
}

/// Map an error to the process exit code.
#[must_use]
pub const fn exit_code_for(err: &CliError) -> u8 {
    match err {
        CliError::Config { .. } => EXIT_CONFIG,
        CliError::Auth { .. } | CliError::Fetch { .. } | CliError::Export { .. } => EXIT_FAILURE,
    }
}

/// Fail the step: emit `::error::` for the runner and a diagnostic on stderr.
pub fn render_error(err: &CliError) {
    let message = redact(&err.to_string());
    let _ = workflow::error(&mut io::stdout().lock(), &message);

    let report = redact(&format!("{:?}", Report::new(err.clone())));
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "{report}");
    let _ = stderr.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_inputs_are_config_errors() {
        let err = CliError::from(AuthError::MissingCredentials);
        assert!(matches!(err, CliError::Config { help: Some(_), .. }));
        assert_eq!(exit_code_for(&err), EXIT_CONFIG);

        let err = CliError::from(AuthError::UnsupportedMethod {
            method: "ldap".to_string(),
        });
        assert_eq!(err.to_string(), "Invalid authentication method: ldap");
        assert_eq!(exit_code_for(&err), EXIT_CONFIG);
    }

    #[test]
    fn test_remote_failures_exit_with_failure() {
        let err = CliError::from(AuthError::RemoteRejected {
            status: Some(401),
            message: "bad secret".to_string(),
        });
        assert!(matches!(err, CliError::Auth { .. }));
        assert_eq!(exit_code_for(&err), EXIT_FAILURE);

        let err = CliError::from(FetchError::Rejected {
            status: 404,
            message: "Folder not found".to_string(),
        });
        assert!(err.to_string().contains("Folder not found"));
        assert_eq!(exit_code_for(&err), EXIT_FAILURE);
    }

    #[test]
    fn test_identity_token_error_has_permission_help() {
        let err = CliError::from(AuthError::IdentityToken {
            message: "missing env".to_string(),
        });
        match err {
            CliError::Auth { help: Some(help), .. } => assert!(help.contains("id-token")),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
