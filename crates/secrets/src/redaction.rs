//! Process-wide redaction of sensitive values.
//!
//! Credentials and resolved secret values are registered here as soon as they
//! exist. The CLI's log writer runs every formatted line through [`redact`],
//! so a value that leaks into a log message or an error string is masked
//! before it reaches stderr.

use std::sync::{LazyLock, RwLock};

/// Minimum value length to redact (shorter values cause false positives)
pub const MIN_SECRET_LENGTH: usize = 4;

/// Placeholder written in place of a redacted value
pub const REDACTED_PLACEHOLDER: &str = "***";

/// Registered values, kept longest first so a value that contains another
/// one is masked whole.
#[derive(Default)]
struct Masks {
    values: Vec<String>,
}

impl Masks {
    fn add(&mut self, value: String) {
        if value.len() < MIN_SECRET_LENGTH {
            return;
        }
        let position = self
            .values
            .partition_point(|existing| existing.len() > value.len());
        let duplicate = self.values[position..]
            .iter()
            .take_while(|existing| existing.len() == value.len())
            .any(|existing| *existing == value);
        if !duplicate {
            self.values.insert(position, value);
        }
    }

    fn apply(&self, input: &str) -> String {
        self.values
            .iter()
            .fold(input.to_string(), |text, value| {
                text.replace(value.as_str(), REDACTED_PLACEHOLDER)
            })
    }
}

static MASKS: LazyLock<RwLock<Masks>> = LazyLock::new(|| RwLock::new(Masks::default()));

/// Register a value for redaction.
///
/// Values shorter than [`MIN_SECRET_LENGTH`] are ignored.
pub fn register_secret(secret: impl Into<String>) {
    register_secrets([secret]);
}

/// Register several values under one lock.
pub fn register_secrets(secrets: impl IntoIterator<Item = impl Into<String>>) {
    if let Ok(mut masks) = MASKS.write() {
        for secret in secrets {
            masks.add(secret.into());
        }
    }
}

/// Replace every registered value in `input` with [`REDACTED_PLACEHOLDER`].
#[must_use]
pub fn redact(input: &str) -> String {
    match MASKS.read() {
        Ok(masks) => masks.apply(input),
        Err(_) => input.to_string(),
    }
}
