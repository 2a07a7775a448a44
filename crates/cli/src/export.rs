//! Delivery of resolved secrets to the rest of the job.

use crate::{CliError, workflow};
use keyrelay_secrets::ResolvedSecrets;
use keyrelay_secrets::dotenv;
use keyrelay_secrets::redaction::register_secret;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, error, info};

/// Root prepended to the file output path.
pub const GITHUB_WORKSPACE_VAR: &str = "GITHUB_WORKSPACE";

/// How secrets leave the step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportType {
    /// Environment variables for later steps
    Env,
    /// A `KEY='value'` file in the workspace
    File,
}

impl FromStr for ExportType {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "env" => Ok(Self::Env),
            "file" => Ok(Self::File),
            other => Err(CliError::config_with_help(
                format!("Invalid export type: {other}"),
                "Use `env` or `file`",
            )),
        }
    }
}

/// Mask every value and export it as an environment variable.
///
/// With an environment file (`GITHUB_ENV`) each variable is appended as a
/// heredoc block; otherwise the `::set-env` command is written to `out`.
///
/// # Errors
///
/// Returns [`CliError::Export`] if a command or the environment file cannot
/// be written.
pub fn export_env(
    secrets: &ResolvedSecrets,
    out: &mut impl Write,
    env_file: Option<&Path>,
) -> Result<(), CliError> {
    for (key, value) in secrets.iter() {
        register_secret(value);
        workflow::add_mask(out, value)
            .map_err(|e| CliError::export(format!("Failed to mask {key}: {e}")))?;

        let exported = match env_file {
            Some(path) => workflow::append_env_file(path, key, value),
            None => workflow::set_env(out, key, value),
        };
        exported.map_err(|e| CliError::export(format!("Failed to export {key}: {e}")))?;
    }

    info!("Injected secrets as environment variables");
    Ok(())
}

/// Where the file export writes: the workspace root followed verbatim by
/// the configured path.
#[must_use]
pub fn file_output_path(workspace: Option<&str>, relative: &str) -> PathBuf {
    PathBuf::from(format!("{}{relative}", workspace.unwrap_or(".")))
}

/// Write the secrets as `KEY='value'` lines.
///
/// # Errors
///
/// Returns [`CliError::Export`] if the file cannot be written; the failure is
/// logged first.
pub fn export_file(secrets: &ResolvedSecrets, path: &Path) -> Result<(), CliError> {
    info!(path = %path.display(), "Exporting secrets to file");
    if let Err(e) = std::fs::write(path, dotenv::render(secrets)) {
        error!("Error writing file: {e}");
        return Err(CliError::export(format!(
            "Failed to write {}: {e}",
            path.display()
        )));
    }
    info!("Successfully exported secrets to file");
    Ok(())
}

/// Export using the runner's environment (`GITHUB_ENV`, `GITHUB_WORKSPACE`).
///
/// # Errors
///
/// See [`export_env`] and [`export_file`].
pub fn export(
    secrets: &ResolvedSecrets,
    export_type: ExportType,
    relative_file_path: &str,
) -> Result<(), CliError> {
    debug!(keys = ?secrets.keys().collect::<Vec<_>>(), "Exporting secrets");

    match export_type {
        ExportType::Env => {
            let env_file = std::env::var_os(workflow::GITHUB_ENV_VAR)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from);
            export_env(secrets, &mut std::io::stdout().lock(), env_file.as_deref())
        }
        ExportType::File => {
            let workspace = std::env::var(GITHUB_WORKSPACE_VAR).ok();
            let path = file_output_path(workspace.as_deref(), relative_file_path);
            export_file(secrets, &path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResolvedSecrets {
        [
            ("DATABASE_URL", "postgres://export-test-db"),
            ("API_TOKEN", "export-test-token\nsecond-line"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn parses_export_types() {
        assert_eq!("env".parse::<ExportType>().unwrap(), ExportType::Env);
        assert_eq!("file".parse::<ExportType>().unwrap(), ExportType::File);
        let err = "yaml".parse::<ExportType>().unwrap_err();
        assert!(matches!(err, CliError::Config { .. }));
    }

    #[test]
    fn env_export_masks_then_sets() {
        let mut out = Vec::new();
        export_env(&sample(), &mut out, None).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert_eq!(
            out.lines().collect::<Vec<_>>(),
            vec![
                "::add-mask::postgres://export-test-db",
                "::set-env name=DATABASE_URL::postgres://export-test-db",
                "::add-mask::export-test-token",
                "::add-mask::second-line",
                "::set-env name=API_TOKEN::export-test-token%0Asecond-line",
            ]
        );
    }

    #[test]
    fn env_export_prefers_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let env_file = dir.path().join("github_env");
        let mut out = Vec::new();
        export_env(&sample(), &mut out, Some(&env_file)).unwrap();

        let commands = String::from_utf8(out).unwrap();
        assert!(!commands.contains("::set-env"));
        assert_eq!(commands.matches("::add-mask::").count(), 3);

        let content = std::fs::read_to_string(&env_file).unwrap();
        assert!(content.starts_with("DATABASE_URL<<ghadelimiter_"));
        assert!(content.contains("\nexport-test-token\nsecond-line\nghadelimiter_"));
    }

    #[test]
    fn file_path_appends_verbatim() {
        assert_eq!(
            file_output_path(Some("/home/runner/work/app"), "/.env"),
            PathBuf::from("/home/runner/work/app/.env")
        );
        assert_eq!(file_output_path(None, "/config/.env"), PathBuf::from("./config/.env"));
    }

    #[test]
    fn file_export_writes_quoted_lines_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        let secrets: ResolvedSecrets = [("B", "2"), ("A", "x=y")].into_iter().collect();
        export_file(&secrets, &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "B='2'\nA='x=y'");
    }

    #[test]
    fn file_export_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join(".env");
        let err = export_file(&sample(), &path).unwrap_err();
        assert!(matches!(err, CliError::Export { .. }));
    }

    #[test]
    fn export_uses_workspace_for_file() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = dir.path().to_str().unwrap().to_string();
        temp_env::with_var(GITHUB_WORKSPACE_VAR, Some(&workspace), || {
            export(&sample(), ExportType::File, "/secrets.env").unwrap();
        });
        let content = std::fs::read_to_string(dir.path().join("secrets.env")).unwrap();
        assert!(content.starts_with("DATABASE_URL='postgres://export-test-db'\n"));
    }
}
