//! Step inputs: command-line flags backed by `INPUT_*` variables.

use crate::CliError;
use crate::tracing::{LogLevel, TracingConfig, TracingFormat};
use clap::error::ErrorKind;
use clap::{ArgAction, Parser};
use std::ffi::OsString;
use keyrelay_infisical::{AuthConfig, DEFAULT_DOMAIN, SecretPath};
use keyrelay_secrets::SecureSecret;

/// Parse a boolean input using the GitHub Actions spelling rules.
///
/// # Errors
///
/// Returns a message for anything outside `true|True|TRUE|false|False|FALSE`.
pub fn parse_action_bool(value: &str) -> Result<bool, String> {
    match value {
        "true" | "True" | "TRUE" => Ok(true),
        "false" | "False" | "FALSE" => Ok(false),
        other => Err(format!(
            "'{other}' is not a boolean; use one of true, True, TRUE, false, False, FALSE"
        )),
    }
}

/// Log in to Infisical and export a project's secrets to the CI job.
///
/// Every option can also be given through the matching `INPUT_*` variable
/// the GitHub Actions runner sets for step inputs.
#[derive(Parser, Debug)]
#[command(name = "keyrelay")]
#[command(about = "Fetch Infisical secrets and export them to the CI job")]
#[command(version)]
pub struct Cli {
    /// Auth method: universal, oidc or aws-iam.
    #[arg(long, env = "INPUT_METHOD", default_value = "universal")]
    pub method: String,

    /// Universal auth client id.
    #[arg(long, env = "INPUT_CLIENT-ID")]
    pub client_id: Option<String>,

    /// Universal auth client secret.
    #[arg(long, env = "INPUT_CLIENT-SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Machine identity id for oidc and aws-iam auth.
    #[arg(long, env = "INPUT_IDENTITY-ID")]
    pub identity_id: Option<String>,

    /// Audience requested for the OIDC token.
    #[arg(long, env = "INPUT_OIDC-AUDIENCE")]
    pub oidc_audience: Option<String>,

    /// Infisical instance URL.
    #[arg(long, env = "INPUT_DOMAIN", default_value = DEFAULT_DOMAIN)]
    pub domain: String,

    /// Environment slug to fetch from.
    #[arg(long, env = "INPUT_ENV-SLUG")]
    pub env_slug: Option<String>,

    /// Project slug to fetch from.
    #[arg(long, env = "INPUT_PROJECT-SLUG")]
    pub project_slug: Option<String>,

    /// Folder path inside the project.
    #[arg(long, env = "INPUT_SECRET-PATH", default_value = "/")]
    pub secret_path: String,

    /// Where to put the secrets: env or file.
    #[arg(long, env = "INPUT_EXPORT-TYPE", default_value = "env")]
    pub export_type: String,

    /// File path, relative to the workspace, for the file export.
    #[arg(long, env = "INPUT_FILE-OUTPUT-PATH", default_value = "/.env")]
    pub file_output_path: String,

    /// Include secrets imported into the path.
    #[arg(
        long,
        env = "INPUT_INCLUDE-IMPORTS",
        default_value = "true",
        value_parser = parse_action_bool,
        action = ArgAction::Set
    )]
    pub include_imports: bool,

    /// Include secrets from sub-folders.
    #[arg(
        long,
        env = "INPUT_RECURSIVE",
        default_value = "false",
        value_parser = parse_action_bool,
        action = ArgAction::Set
    )]
    pub recursive: bool,

    /// Extra request headers, one `Name: value` per line.
    #[arg(long, env = "INPUT_EXTRA-HEADERS")]
    pub extra_headers: Option<String>,

    /// Logging verbosity when RUST_LOG is unset.
    #[arg(long, env = "KEYRELAY_LOG_LEVEL", default_value = "info", value_enum)]
    pub log_level: LogLevel,

    /// Log output format.
    #[arg(long, env = "KEYRELAY_LOG_FORMAT", default_value = "compact", value_enum)]
    pub log_format: TracingFormat,
}

/// Trimmed input value; whitespace-only counts as not supplied.
fn input(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required(value: Option<&str>, name: &str) -> Result<String, CliError> {
    input(value).ok_or_else(|| {
        CliError::config_with_help(
            format!("Input required and not supplied: {name}"),
            format!("Set the {name} input on the step"),
        )
    })
}

/// Parse step inputs from `args` and the `INPUT_*` environment.
///
/// Help and version requests print and exit the process.
///
/// # Errors
///
/// Returns [`CliError::Config`] for any input clap rejects, such as a
/// boolean outside the accepted spellings.
pub fn parse_from<I, T>(args: I) -> Result<Cli, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(args).map_err(|e| match e.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => e.exit(),
        _ => CliError::config(e.to_string().trim_end()),
    })
}

impl Cli {
    /// Login inputs, trimmed the way the runner toolkit reads them.
    #[must_use]
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            method: self.method.trim().to_string(),
            client_id: input(self.client_id.as_deref()),
            client_secret: input(self.client_secret.as_deref()).map(SecureSecret::new),
            identity_id: input(self.identity_id.as_deref()),
            oidc_audience: input(self.oidc_audience.as_deref()),
        }
    }

    /// The folder to fetch.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] when the project or environment slug is
    /// missing.
    pub fn secret_path(&self) -> Result<SecretPath, CliError> {
        let project = required(self.project_slug.as_deref(), "project-slug")?;
        let environment = required(self.env_slug.as_deref(), "env-slug")?;
        Ok(SecretPath::new(project, environment)
            .with_path(self.secret_path.clone())
            .with_imports(self.include_imports)
            .with_recursive(self.recursive))
    }

    /// Logging setup.
    #[must_use]
    pub fn tracing_config(&self) -> TracingConfig {
        TracingConfig {
            format: self.log_format,
            level: self.log_level.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT_VARS: [&str; 14] = [
        "INPUT_METHOD",
        "INPUT_CLIENT-ID",
        "INPUT_CLIENT-SECRET",
        "INPUT_IDENTITY-ID",
        "INPUT_OIDC-AUDIENCE",
        "INPUT_DOMAIN",
        "INPUT_ENV-SLUG",
        "INPUT_PROJECT-SLUG",
        "INPUT_SECRET-PATH",
        "INPUT_EXPORT-TYPE",
        "INPUT_FILE-OUTPUT-PATH",
        "INPUT_INCLUDE-IMPORTS",
        "INPUT_RECURSIVE",
        "INPUT_EXTRA-HEADERS",
    ];

    fn without_inputs<R>(f: impl FnOnce() -> R) -> R {
        let unset: Vec<(&str, Option<&str>)> = INPUT_VARS.iter().map(|v| (*v, None)).collect();
        temp_env::with_vars(unset, f)
    }

    #[test]
    fn test_action_bool_spellings() {
        for value in ["true", "True", "TRUE"] {
            assert_eq!(parse_action_bool(value), Ok(true));
        }
        for value in ["false", "False", "FALSE"] {
            assert_eq!(parse_action_bool(value), Ok(false));
        }
        assert!(parse_action_bool("yes").is_err());
        assert!(parse_action_bool("tRuE").is_err());
        assert!(parse_action_bool("").is_err());
    }

    #[test]
    fn test_cli_default_values() {
        without_inputs(|| {
            let cli = Cli::try_parse_from(["keyrelay"]).unwrap();
            assert_eq!(cli.method, "universal");
            assert_eq!(cli.domain, DEFAULT_DOMAIN);
            assert_eq!(cli.secret_path, "/");
            assert_eq!(cli.export_type, "env");
            assert_eq!(cli.file_output_path, "/.env");
            assert!(cli.include_imports);
            assert!(!cli.recursive);
            assert!(cli.extra_headers.is_none());
        });
    }

    #[test]
    fn test_cli_reads_action_inputs() {
        temp_env::with_vars(
            [
                ("INPUT_METHOD", Some("oidc")),
                ("INPUT_IDENTITY-ID", Some("identity-42")),
                ("INPUT_ENV-SLUG", Some("prod")),
                ("INPUT_PROJECT-SLUG", Some("shop")),
                ("INPUT_SECRET-PATH", Some("/payments")),
                ("INPUT_INCLUDE-IMPORTS", Some("FALSE")),
                ("INPUT_RECURSIVE", Some("True")),
            ],
            || {
                let cli = Cli::try_parse_from(["keyrelay"]).unwrap();
                let config = cli.auth_config();
                assert_eq!(config.method, "oidc");
                assert_eq!(config.identity_id.as_deref(), Some("identity-42"));

                let target = cli.secret_path().unwrap();
                assert_eq!(target.project, "shop");
                assert_eq!(target.environment, "prod");
                assert_eq!(target.path, "/payments");
                assert!(!target.include_imports);
                assert!(target.recursive);
            },
        );
    }

    #[test]
    fn test_cli_rejects_invalid_boolean() {
        without_inputs(|| {
            let err = parse_from(["keyrelay", "--recursive", "yes"]).unwrap_err();
            assert!(matches!(err, CliError::Config { .. }));
            assert!(err.to_string().contains("'yes'"));
        });
    }

    #[test]
    fn test_empty_boolean_input_is_config_error() {
        let mut vars: Vec<(&str, Option<&str>)> = INPUT_VARS
            .iter()
            .filter(|v| **v != "INPUT_RECURSIVE")
            .map(|v| (*v, None))
            .collect();
        vars.push(("INPUT_RECURSIVE", Some("")));
        temp_env::with_vars(vars, || {
            let err = parse_from(["keyrelay"]).unwrap_err();
            assert!(matches!(err, CliError::Config { .. }));
            assert_eq!(crate::exit_code_for(&err), crate::errors::EXIT_CONFIG);
        });
    }

    #[test]
    fn test_inputs_are_trimmed() {
        without_inputs(|| {
            let cli = parse_from([
                "keyrelay",
                "--method",
                " universal ",
                "--client-id",
                "  cid\n",
                "--client-secret",
                "   ",
                "--project-slug",
                " shop ",
                "--env-slug",
                "dev\n",
            ])
            .unwrap();
            let config = cli.auth_config();
            assert_eq!(config.method, "universal");
            assert_eq!(config.client_id.as_deref(), Some("cid"));
            assert!(config.client_secret.is_none());

            let target = cli.secret_path().unwrap();
            assert_eq!(target.project, "shop");
            assert_eq!(target.environment, "dev");
        });
    }

    #[test]
    fn test_missing_slugs_are_config_errors() {
        without_inputs(|| {
            let cli = Cli::try_parse_from(["keyrelay", "--env-slug", "dev"]).unwrap();
            let err = cli.secret_path().unwrap_err();
            assert!(matches!(err, CliError::Config { .. }));
            assert!(err.to_string().contains("project-slug"));
        });
    }

    #[test]
    fn test_flags_without_action_inputs() {
        without_inputs(|| {
            let cli = Cli::try_parse_from([
                "keyrelay",
                "--client-id",
                "cid",
                "--client-secret",
                "csecret",
                "--log-level",
                "debug",
                "--log-format",
                "json",
            ])
            .unwrap();
            let config = cli.auth_config();
            assert_eq!(config.client_id.as_deref(), Some("cid"));
            assert_eq!(
                config.client_secret.as_ref().map(SecureSecret::expose),
                Some("csecret")
            );
            let tracing = cli.tracing_config();
            assert_eq!(tracing.format, TracingFormat::Json);
            assert_eq!(tracing.level, crate::tracing::Level::DEBUG);
        });
    }
}
