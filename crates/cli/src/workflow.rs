//! GitHub Actions workflow commands and environment files.
//!
//! Commands are lines of the form `::name key=value::data` written to
//! stdout; the runner intercepts them. Persistent environment variables are
//! appended to the file named by `GITHUB_ENV` using heredoc blocks.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use uuid::Uuid;

/// File the runner reads exported variables from.
pub const GITHUB_ENV_VAR: &str = "GITHUB_ENV";

fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn escape_property(value: &str) -> String {
    escape_data(value).replace(':', "%3A").replace(',', "%2C")
}

/// Ask the runner to mask `value` in job logs.
///
/// The runner matches masks line by line, so a multi-line value gets one
/// `::add-mask::` per non-empty line.
///
/// # Errors
///
/// Returns any write error from `out`.
pub fn add_mask(out: &mut impl Write, value: &str) -> io::Result<()> {
    for line in value.lines().map(str::trim_end).filter(|l| !l.is_empty()) {
        writeln!(out, "::add-mask::{}", escape_data(line))?;
    }
    Ok(())
}

/// Legacy `::set-env` command, used when no environment file is available.
///
/// # Errors
///
/// Returns any write error from `out`.
pub fn set_env(out: &mut impl Write, name: &str, value: &str) -> io::Result<()> {
    writeln!(
        out,
        "::set-env name={}::{}",
        escape_property(name),
        escape_data(value)
    )
}

/// Fail the step with `message`.
///
/// # Errors
///
/// Returns any write error from `out`.
pub fn error(out: &mut impl Write, message: &str) -> io::Result<()> {
    writeln!(out, "::error::{}", escape_data(message))
}

/// Random heredoc delimiter for one environment-file entry.
#[must_use]
pub fn delimiter() -> String {
    format!("ghadelimiter_{}", Uuid::new_v4())
}

/// Format a `NAME<<delim` heredoc block.
///
/// # Errors
///
/// Returns [`io::ErrorKind::InvalidInput`] if the name or value contains the
/// delimiter, which would let the value terminate the block early.
pub fn env_file_entry(name: &str, value: &str, delimiter: &str) -> io::Result<String> {
    if name.contains(delimiter) || value.contains(delimiter) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("'{name}' must not contain the delimiter {delimiter}"),
        ));
    }
    Ok(format!("{name}<<{delimiter}\n{value}\n{delimiter}\n"))
}

/// Append one variable to the environment file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or written.
pub fn append_env_file(path: &Path, name: &str, value: &str) -> io::Result<()> {
    let entry = env_file_entry(name, value, &delimiter())?;
    let mut file = OpenOptions::new().append(true).create(true).open(path)?;
    file.write_all(entry.as_bytes())
}
