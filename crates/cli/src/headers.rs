//! Parsing of the multi-line `extra-headers` input.

use crate::CliError;
use indexmap::IndexMap;

/// Parse `Name: value` lines into default request headers.
///
/// Names are trimmed and lower-cased. Blank lines are skipped and a repeated
/// name has its values joined with `", "`.
///
/// # Errors
///
/// Returns [`CliError::Config`] for a non-blank line without a `:` or with an
/// empty name.
pub fn parse_extra_headers(raw: &str) -> Result<IndexMap<String, String>, CliError> {
    let mut headers: IndexMap<String, String> = IndexMap::new();

    for (index, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            return Err(CliError::config_with_help(
                format!("Invalid extra header on line {}: missing ':'", index + 1),
                "Write one header per line as `Name: value`",
            ));
        };
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            return Err(CliError::config(format!(
                "Invalid extra header on line {}: empty header name",
                index + 1
            )));
        }
        let value = value.trim();

        headers
            .entry(name)
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_has_no_headers() {
        assert!(parse_extra_headers("").unwrap().is_empty());
        assert!(parse_extra_headers("\n  \n").unwrap().is_empty());
    }

    #[test]
    fn normalises_names_and_values() {
        let headers = parse_extra_headers("  X-Tenant :  acme  \nCF-Access-Client-Id: abc").unwrap();
        assert_eq!(headers["x-tenant"], "acme");
        assert_eq!(headers["cf-access-client-id"], "abc");
    }

    #[test]
    fn joins_repeated_names() {
        let headers = parse_extra_headers("Accept: a\n\naccept: b").unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["accept"], "a, b");
    }

    #[test]
    fn value_may_contain_colons() {
        let headers = parse_extra_headers("X-Upstream: https://proxy:8443").unwrap();
        assert_eq!(headers["x-upstream"], "https://proxy:8443");
    }

    #[test]
    fn line_without_separator_is_rejected() {
        let err = parse_extra_headers("X-Good: 1\nnot a header").unwrap_err();
        assert!(matches!(err, CliError::Config { .. }));
        assert!(err.to_string().contains("line 2"));
    }
}
