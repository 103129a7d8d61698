// src/models.rs

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

// --- PREFLIGHT ARGUMENTS ---

/// The global directives extracted from the raw command line before the
/// command parser runs.
///
/// Repeatable directives are plain `Vec`s: duplicates and CLI order are both kept.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PreflightArgs {
    /// The raw alias or site specification token, unmodified.
    pub alias: Option<String>,
    /// An explicit site root (`--root` / `-r`).
    pub selected_site: Option<String>,
    /// Explicit configuration files (`--config`).
    pub config_paths: Vec<String>,
    /// Extra alias search locations (`--alias-path`).
    pub alias_paths: Vec<String>,
    /// Extra command search locations (`--include`).
    pub command_paths: Vec<String>,
    /// `Some(true)` when `--local` was given.
    pub is_local: Option<bool>,
    /// Every token that was not consumed, in original order.
    pub args: Vec<String>,
}

impl PreflightArgs {
    /// Creates an empty value, ready to be filled by the preprocessor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether local mode was requested.
    pub fn is_local(&self) -> bool {
        self.is_local.unwrap_or(false)
    }

    /// The command name (the first residual argument after the program name).
    pub fn command(&self) -> Option<&str> {
        self.args.get(1).map(String::as_str)
    }
}

// --- SITE SPECIFICATION ---

/// A successfully resolved long-form site specification (`user@host/path#uri`).
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SiteSpec {
    /// Remote user, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Remote host, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Site root. Absent for host-only specs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    /// Multisite identifier; `default` when the spec names none.
    pub uri: String,
}

impl SiteSpec {
    /// Converts the spec into the uniform alias record shape, omitting absent fields.
    pub fn to_record(&self) -> AliasRecord {
        let mut record = AliasRecord::new();
        if let Some(user) = &self.user {
            record.insert("user", Value::String(user.clone()));
        }
        if let Some(host) = &self.host {
            record.insert("host", Value::String(host.clone()));
        }
        if let Some(root) = &self.root {
            record.insert("root", Value::String(root.clone()));
        }
        record.insert("uri", Value::String(self.uri.clone()));
        record
    }
}

// --- ALIAS RECORD ---

/// One resolvable target: an ordered key/value map with at least `root` and
/// usually `uri`, optionally `host`, `user` and arbitrary extra keys.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct AliasRecord {
    values: IndexMap<String, Value>,
}

impl AliasRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record from an already ordered map.
    pub fn from_map(values: IndexMap<String, Value>) -> Self {
        Self { values }
    }

    /// Sets `key`, keeping its original position if it was already present.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Raw access to one value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// A value as a string, if it is a scalar string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// The site root.
    pub fn root(&self) -> Option<&str> {
        self.get_str("root")
    }

    /// The multisite URI.
    pub fn uri(&self) -> Option<&str> {
        self.get_str("uri")
    }

    /// The remote host, if the alias points to another machine.
    pub fn host(&self) -> Option<&str> {
        self.get_str("host")
    }

    /// The remote user.
    pub fn user(&self) -> Option<&str> {
        self.get_str("user")
    }

    /// A record is remote when it names a host.
    pub fn is_remote(&self) -> bool {
        self.host().is_some_and(|h| !h.is_empty())
    }

    /// Returns a new record with `self` laid over `base`: keys from `self` win,
    /// keys only in `base` keep their position at the front.
    pub fn merged_over(&self, base: &Self) -> Self {
        let mut merged = base.values.clone();
        for (key, value) in &self.values {
            merged.insert(key.clone(), value.clone());
        }
        Self { values: merged }
    }

    /// Iterates over the entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the record has no keys at all.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> AliasRecord {
        let mut r = AliasRecord::new();
        for (k, v) in pairs {
            r.insert(*k, Value::String((*v).to_string()));
        }
        r
    }

    #[test]
    fn test_merged_over_environment_keys_win() {
        let base = record(&[("root", "/path/to/single"), ("uri", "default")]);
        let env = record(&[("root", "/alternate/path/to/single")]);

        let merged = env.merged_over(&base);

        assert_eq!(merged.root(), Some("/alternate/path/to/single"));
        assert_eq!(merged.uri(), Some("default"));
        let keys: Vec<_> = merged.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["root", "uri"]);
    }

    #[test]
    fn test_site_spec_to_record_omits_absent_fields() {
        let spec = SiteSpec {
            user: None,
            host: None,
            root: Some("/var/www".to_string()),
            uri: "default".to_string(),
        };
        let rec = spec.to_record();
        assert_eq!(rec.len(), 2);
        assert!(rec.get("user").is_none());
        assert!(!rec.is_remote());
        assert_eq!(rec.root(), Some("/var/www"));
    }

    #[test]
    fn test_preflight_args_command_skips_program_name() {
        let args = PreflightArgs {
            args: vec!["drush".to_string(), "status".to_string()],
            ..Default::default()
        };
        assert_eq!(args.command(), Some("status"));
        assert!(!args.is_local());
    }
}
