//! `KEY='value'` file shape used by the file export.

use crate::{ResolvedSecrets, SecretError};

/// Render secrets as `KEY='value'` lines joined by `\n` (no trailing newline).
///
/// Values are written verbatim between single quotes; nothing is escaped.
#[must_use]
pub fn render(secrets: &ResolvedSecrets) -> String {
    secrets
        .iter()
        .map(|(key, value)| format!("{key}='{value}'"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse `KEY='value'` lines back into secrets.
///
/// Each line is split on its first `=`; one pair of surrounding single quotes
/// is stripped from the value. Blank lines are skipped.
///
/// # Errors
///
/// Returns [`SecretError::MalformedLine`] for a non-blank line without `=`
/// or with an empty key.
pub fn parse(content: &str) -> Result<ResolvedSecrets, SecretError> {
    let mut secrets = ResolvedSecrets::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(SecretError::MalformedLine { line: index + 1 });
        };
        if key.is_empty() {
            return Err(SecretError::MalformedLine { line: index + 1 });
        }

        let value = value
            .strip_prefix('\'')
            .and_then(|v| v.strip_suffix('\''))
            .unwrap_or(value);
        secrets.insert(key, value);
    }
    Ok(secrets)
}
