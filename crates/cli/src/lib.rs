//! keyrelay pipeline step
//!
//! Runs once per CI job: read the step inputs, log in to Infisical with the
//! selected method, fetch the secrets at one project/environment/path and
//! export them as job environment variables or as a file.

pub mod cli;
pub mod errors;
pub mod export;
pub mod headers;
pub mod tracing;
pub mod workflow;

pub use cli::Cli;
pub use errors::{CliError, exit_code_for, render_error};

use export::ExportType;
use keyrelay_infisical::{AuthMethod, CredentialAcquirer, InfisicalClient, SecretResolver};

/// Run the step to completion.
///
/// Inputs are validated before any request is sent. Exactly one login and
/// one fetch are made; nothing is retried.
///
/// # Errors
///
/// Returns [`CliError::Config`] for invalid inputs, [`CliError::Auth`] when
/// no access token could be obtained, [`CliError::Fetch`] when the secrets
/// request fails and [`CliError::Export`] when the output cannot be written.
pub async fn run(cli: &Cli) -> Result<(), CliError> {
    let export_type: ExportType = cli.export_type.parse()?;
    let target = cli.secret_path()?;
    let headers = headers::parse_extra_headers(cli.extra_headers.as_deref().unwrap_or_default())?;
    let method = AuthMethod::from_config(&cli.auth_config())?;

    let client = InfisicalClient::new(&cli.domain, &headers)?;
    let credential = CredentialAcquirer::from_env(client.clone())
        .acquire(&method)
        .await?;
    let secrets = SecretResolver::new(client)
        .resolve(&target, &credential)
        .await?;
    secrets.register_for_redaction();

    export::export(&secrets, export_type, &cli.file_output_path)
}
