//! Flattened secrets ready for export

use crate::SecretEntry;
use indexmap::IndexMap;

/// Resolved secrets ready for injection.
///
/// Keys keep the order in which they were first inserted: the primary list
/// first, then any key introduced by an import in traversal order.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ResolvedSecrets {
    values: IndexMap<String, String>,
}

impl ResolvedSecrets {
    /// Create empty resolved secrets
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a path's own secrets with its import chain.
    ///
    /// Directly-owned secrets are seeded first; a duplicate key inside that
    /// list keeps its last value. The import chain is then walked from the
    /// last import to the first, and an imported key is only written when no
    /// earlier source already defined it. Net precedence, strongest first:
    /// own secrets, then the import at the highest index, down to index 0.
    #[must_use]
    pub fn merge<I>(primary: &[SecretEntry], imports: &[I]) -> Self
    where
        I: AsRef<[SecretEntry]>,
    {
        let mut values = IndexMap::with_capacity(primary.len());
        for entry in primary {
            values.insert(entry.key.clone(), entry.value.clone());
        }

        for imported in imports.iter().rev() {
            for entry in imported.as_ref() {
                values
                    .entry(entry.key.clone())
                    .or_insert_with(|| entry.value.clone());
            }
        }

        tracing::debug!(
            own = primary.len(),
            imports = imports.len(),
            resolved = values.len(),
            "Merged secrets with imports"
        );

        Self { values }
    }

    /// Insert a value, replacing any previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Check if any secrets were resolved
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of resolved secrets
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Get a resolved secret value by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Iterate over secret names in resolution order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Iterate over `(name, value)` pairs in resolution order.
    ///
    /// This exposes every value; do not log the result.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Register every value with the redaction registry.
    pub fn register_for_redaction(&self) {
        crate::redaction::register_secrets(self.values.values().cloned());
    }
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("count", &self.values.len())
            .field("names", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<K, V> FromIterator<(K, V)> for ResolvedSecrets
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(&str, &str)]) -> Vec<SecretEntry> {
        pairs.iter().map(|(k, v)| SecretEntry::new(*k, *v)).collect()
    }

    #[test]
    fn test_resolved_secrets_new_is_empty() {
        let secrets = ResolvedSecrets::new();
        assert!(secrets.is_empty());
        assert_eq!(secrets.len(), 0);
    }

    #[test]
    fn higher_index_import_wins_over_lower() {
        let primary = entries(&[("a", "1"), ("b", "2")]);
        let imports = vec![
            entries(&[("b", "9"), ("c", "3")]),
            entries(&[("c", "7"), ("d", "4")]),
        ];

        let resolved = ResolvedSecrets::merge(&primary, &imports);

        let expected: ResolvedSecrets =
            [("a", "1"), ("b", "2"), ("c", "7"), ("d", "4")].into_iter().collect();
        assert_eq!(resolved, expected);
    }

    #[test]
    fn own_secrets_beat_every_import() {
        let primary = entries(&[("TOKEN", "own")]);
        let imports = vec![entries(&[("TOKEN", "first")]), entries(&[("TOKEN", "last")])];

        let resolved = ResolvedSecrets::merge(&primary, &imports);
        assert_eq!(resolved.get("TOKEN"), Some("own"));
        assert_eq!(resolved.len(), 1);
    }

    #[test]
    fn duplicate_primary_keys_keep_last_value() {
        let primary = entries(&[("DUP", "one"), ("DUP", "two")]);
        let resolved = ResolvedSecrets::merge::<Vec<SecretEntry>>(&primary, &[]);
        assert_eq!(resolved.get("DUP"), Some("two"));
        assert_eq!(resolved.len(), 1);
    }

    #[test]
    fn keys_are_case_sensitive() {
        let primary = entries(&[("key", "lower")]);
        let imports = vec![entries(&[("KEY", "upper")])];
        let resolved = ResolvedSecrets::merge(&primary, &imports);
        assert_eq!(resolved.get("key"), Some("lower"));
        assert_eq!(resolved.get("KEY"), Some("upper"));
    }

    #[test]
    fn order_follows_primary_then_reverse_imports() {
        let primary = entries(&[("z", "1")]);
        let imports = vec![entries(&[("early", "1")]), entries(&[("late", "1")])];
        let resolved = ResolvedSecrets::merge(&primary, &imports);
        let keys: Vec<_> = resolved.keys().collect();
        assert_eq!(keys, vec!["z", "late", "early"]);
    }

    #[test]
    fn merge_is_deterministic() {
        let primary = entries(&[("a", "1")]);
        let imports = vec![entries(&[("b", "2")]), entries(&[("b", "3")])];
        assert_eq!(
            ResolvedSecrets::merge(&primary, &imports),
            ResolvedSecrets::merge(&primary, &imports)
        );
    }

    #[test]
    fn debug_hides_values() {
        let resolved: ResolvedSecrets = [("API_KEY", "sk-live-abcdef")].into_iter().collect();
        let debug_output = format!("{resolved:?}");
        assert!(debug_output.contains("API_KEY"));
        assert!(!debug_output.contains("sk-live-abcdef"));
    }
}
