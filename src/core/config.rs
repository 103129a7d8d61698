//! # Layered Configuration
//!
//! A `Config` is a stack of `ConfigLayer`s, one per source file (plus one for the
//! environment snapshot). Every layer is flattened to dotted keys on load, so a
//! lookup is a walk from the highest-precedence layer down until one defines the
//! key. Nothing is merged eagerly: the layers stay intact so provenance can be
//! reported for every source that defined a key, not only the winner.
//!
//! ## Precedence
//!
//! Layers are ranked by their `ConfigContext` first and insertion order second:
//!
//! `Drush` < `Environment` < `System` < `User` < `Site` < `Cli`
//!
//! so adding the tool defaults last still leaves them at the bottom.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::Serialize;
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

lazy_static! {
    // `${some.dotted.key}`
    static ref INTERPOLATION_RE: Regex = Regex::new(r"\$\{([a-zA-Z0-9_.-]+)\}").unwrap();
}

/// Errors raised while loading configuration files. All of them are fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("Could not read config file '{path}': {source}")]
    Read {
        /// The offending file.
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid YAML.
    #[error("Error parsing YAML in '{path}': {source}")]
    YamlParse {
        /// The offending file.
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    /// The document parsed, but its top level is a list or a scalar.
    #[error("Config file '{path}' must contain a mapping at the top level.")]
    NotAMapping {
        /// The offending file.
        path: String,
    },
}

/// Where a layer came from. The declaration order is the precedence order.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ConfigContext {
    /// The tool's bundled defaults.
    Drush,
    /// Values derived from the process environment (`env.*`).
    Environment,
    /// `/etc/drush/drush.yml`.
    System,
    /// `~/.drush/drush.yml`.
    User,
    /// `<siteRoot>/drush/drush.yml`.
    Site,
    /// Files passed with `--config`.
    Cli,
}

impl ConfigContext {
    /// Short label used in diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            Self::Drush => "drush",
            Self::Environment => "environment",
            Self::System => "system",
            Self::User => "user",
            Self::Site => "site",
            Self::Cli => "cli",
        }
    }
}

/// One flattened source of configuration values.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigLayer {
    context: ConfigContext,
    source: Option<PathBuf>,
    values: IndexMap<String, Value>,
}

impl ConfigLayer {
    /// Builds a layer from already flattened values.
    pub fn new(
        context: ConfigContext,
        source: Option<PathBuf>,
        values: IndexMap<String, Value>,
    ) -> Self {
        Self {
            context,
            source,
            values,
        }
    }

    /// Parses YAML text into a layer. `source` is used for provenance and errors.
    pub fn from_yaml(
        context: ConfigContext,
        source: &Path,
        text: &str,
    ) -> Result<Self, ConfigError> {
        let document: Value =
            serde_yaml::from_str(text).map_err(|e| ConfigError::YamlParse {
                path: source.display().to_string(),
                source: e,
            })?;

        let values = match &document {
            Value::Null => IndexMap::new(),
            Value::Mapping(_) => flatten(&document),
            _ => {
                return Err(ConfigError::NotAMapping {
                    path: source.display().to_string(),
                });
            }
        };

        Ok(Self::new(context, Some(source.to_path_buf()), values))
    }

    /// The context this layer belongs to.
    pub fn context(&self) -> ConfigContext {
        self.context
    }

    /// The file this layer was read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// The flattened values.
    pub fn values(&self) -> &IndexMap<String, Value> {
        &self.values
    }
}

/// Flattens a YAML document into dotted keys.
///
/// Nested mappings become `parent.child` keys; sequences and scalars are
/// leaves. An empty mapping is kept as a leaf so `has()` still sees it.
pub fn flatten(value: &Value) -> IndexMap<String, Value> {
    let mut out = IndexMap::new();
    flatten_into(None, value, &mut out);
    out
}

fn flatten_into(prefix: Option<&str>, value: &Value, out: &mut IndexMap<String, Value>) {
    match value {
        Value::Mapping(map) if !map.is_empty() => {
            for (key, child) in map {
                let Some(key) = key_to_string(key) else {
                    log::warn!("Skipping config key of unsupported type: {:?}", key);
                    continue;
                };
                let full_key = match prefix {
                    Some(p) => format!("{}.{}", p, key),
                    None => key,
                };
                flatten_into(Some(&full_key), child, out);
            }
        }
        Value::Tagged(tagged) => flatten_into(prefix, &tagged.value, out),
        leaf => {
            if let Some(p) = prefix {
                out.insert(p.to_string(), leaf.clone());
            }
        }
    }
}

fn key_to_string(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// The merged, queryable configuration handed to the command dispatcher.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// Lowest precedence first.
    layers: Vec<ConfigLayer>,
}

impl Config {
    /// Builds a config from layers given in insertion order.
    pub fn new(mut layers: Vec<ConfigLayer>) -> Self {
        // Stable: insertion order is kept within a context.
        layers.sort_by_key(ConfigLayer::context);
        Self { layers }
    }

    /// The layers, lowest precedence first.
    pub fn layers(&self) -> &[ConfigLayer] {
        &self.layers
    }

    /// The winning value for a dotted key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.layers.iter().rev().find_map(|l| l.values.get(key))
    }

    /// Whether any layer defines `key`, either as a leaf or as a namespace.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some() || !self.section(key).is_empty()
    }

    /// The winning value as a string (numbers and booleans are rendered).
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(scalar_to_string)
    }

    /// A list of strings; a single scalar is read as a one-element list.
    pub fn get_string_list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(Value::Sequence(items)) => items.iter().filter_map(scalar_to_string).collect(),
            Some(other) => scalar_to_string(other).into_iter().collect(),
            None => Vec::new(),
        }
    }

    /// Every key under `prefix.`, relative to the prefix, with winning values.
    pub fn section(&self, prefix: &str) -> IndexMap<String, Value> {
        let dotted = format!("{}.", prefix);
        let mut out = IndexMap::new();
        for layer in &self.layers {
            for (key, value) in &layer.values {
                if let Some(rest) = key.strip_prefix(&dotted) {
                    out.insert(rest.to_string(), value.clone());
                }
            }
        }
        out
    }

    /// Every key with its winning value, in first-definition order.
    pub fn export(&self) -> IndexMap<String, Value> {
        let mut out = IndexMap::new();
        for layer in &self.layers {
            for (key, value) in &layer.values {
                out.insert(key.clone(), value.clone());
            }
        }
        out
    }

    /// Every defined key, in first-definition order.
    pub fn keys(&self) -> Vec<String> {
        self.export().into_keys().collect()
    }

    /// Provenance: `context label -> dotted key -> files`.
    ///
    /// Every file that defines a key is reported, not only the winner. Files
    /// are listed lowest precedence first, so the last one is what `get` sees
    /// within that context.
    pub fn sources(&self) -> IndexMap<String, IndexMap<String, Vec<PathBuf>>> {
        let mut out: IndexMap<String, IndexMap<String, Vec<PathBuf>>> = IndexMap::new();
        for layer in &self.layers {
            let Some(source) = &layer.source else {
                continue;
            };
            let entry = out.entry(layer.context.label().to_string()).or_default();
            for key in layer.values.keys() {
                entry.entry(key.clone()).or_default().push(source.clone());
            }
        }
        out
    }

    /// Every `(context, file)` pair that defines `key`, lowest precedence first.
    pub fn sources_for(&self, key: &str) -> Vec<(ConfigContext, &Path)> {
        self.layers
            .iter()
            .filter(|l| l.values.contains_key(key))
            .filter_map(|l| l.source.as_deref().map(|s| (l.context, s)))
            .collect()
    }

    /// Replaces `${dotted.key}` tokens with scalar config values.
    /// Unknown keys and non-scalar values leave the token as written.
    pub fn interpolate(&self, text: &str) -> String {
        INTERPOLATION_RE
            .replace_all(text, |caps: &Captures<'_>| {
                let key = caps.get(1).map_or("", |m| m.as_str());
                self.get_str(key).unwrap_or_else(|| {
                    caps.get(0).map_or_else(String::new, |m| m.as_str().to_string())
                })
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(context: ConfigContext, source: &str, yaml: &str) -> ConfigLayer {
        ConfigLayer::from_yaml(context, Path::new(source), yaml).unwrap()
    }

    #[test]
    fn test_flatten_nested_mappings() {
        let doc: Value = serde_yaml::from_str(
            r#"
            drush:
              paths:
                alias-path: ["/a", "/b"]
              empty: {}
            options:
              uri: example.com
            "#,
        )
        .unwrap();

        let flat = flatten(&doc);
        let keys: Vec<_> = flat.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["drush.paths.alias-path", "drush.empty", "options.uri"]);
        assert!(matches!(flat.get("drush.paths.alias-path"), Some(Value::Sequence(s)) if s.len() == 2));
    }

    #[test]
    fn test_later_context_wins_regardless_of_insertion_order() {
        let config = Config::new(vec![
            layer(ConfigContext::Site, "/site/drush.yml", "options:\n  uri: site\n"),
            layer(ConfigContext::Drush, "/tool/drush.yml", "options:\n  uri: tool\n  color: true\n"),
            layer(ConfigContext::User, "/home/drush.yml", "options:\n  uri: user\n"),
        ]);

        assert_eq!(config.get_str("options.uri").as_deref(), Some("site"));
        assert_eq!(config.get_str("options.color").as_deref(), Some("true"));
        assert!(config.has("options"));
        assert!(!config.has("nothing.here"));
    }

    #[test]
    fn test_within_a_context_later_layer_wins_and_both_are_reported() {
        // --- Setup ---
        let config = Config::new(vec![
            layer(ConfigContext::Cli, "/a.yml", "x: a\n"),
            layer(ConfigContext::Cli, "/b.yml", "x: b\n"),
        ]);

        // --- Execute ---
        let sources = config.sources();

        // --- Assert ---
        assert_eq!(config.get_str("x").as_deref(), Some("b"));
        assert_eq!(
            sources.get("cli").and_then(|m| m.get("x")),
            Some(&vec![PathBuf::from("/a.yml"), PathBuf::from("/b.yml")])
        );
    }

    #[test]
    fn test_sources_reports_every_defining_layer() {
        let config = Config::new(vec![
            layer(ConfigContext::User, "/home/drush.yml", "options:\n  uri: user\n"),
            layer(ConfigContext::Site, "/site/drush.yml", "options:\n  uri: site\n"),
        ]);

        let sources = config.sources();
        assert_eq!(
            sources.get("user").and_then(|m| m.get("options.uri")),
            Some(&vec![PathBuf::from("/home/drush.yml")])
        );
        assert_eq!(
            sources.get("site").and_then(|m| m.get("options.uri")),
            Some(&vec![PathBuf::from("/site/drush.yml")])
        );
        let contexts: Vec<_> = config
            .sources_for("options.uri")
            .into_iter()
            .map(|(c, _)| c)
            .collect();
        assert_eq!(contexts, vec![ConfigContext::User, ConfigContext::Site]);
    }

    #[test]
    fn test_environment_layer_has_no_provenance() {
        let mut values = IndexMap::new();
        values.insert("env.cwd".to_string(), Value::String("/work".to_string()));
        let config = Config::new(vec![ConfigLayer::new(ConfigContext::Environment, None, values)]);
        assert_eq!(config.get_str("env.cwd").as_deref(), Some("/work"));
        assert!(config.sources().is_empty());
    }

    #[test]
    fn test_section_and_string_list() {
        let config = Config::new(vec![
            layer(ConfigContext::Drush, "/d.yml", "drush:\n  paths:\n    alias-path: /one\n"),
            layer(
                ConfigContext::User,
                "/u.yml",
                "drush:\n  paths:\n    alias-path: [/two, /three]\n    include: /inc\n",
            ),
        ]);

        let section = config.section("drush.paths");
        assert_eq!(section.len(), 2);
        assert_eq!(
            config.get_string_list("drush.paths.alias-path"),
            vec!["/two".to_string(), "/three".to_string()]
        );
        assert_eq!(config.get_string_list("drush.paths.include"), vec!["/inc".to_string()]);
        assert!(config.get_string_list("missing").is_empty());
    }

    #[test]
    fn test_interpolate_known_and_unknown_tokens() {
        let mut values = IndexMap::new();
        values.insert("env.home".to_string(), Value::String("/home/tester".to_string()));
        let config = Config::new(vec![ConfigLayer::new(ConfigContext::Environment, None, values)]);

        assert_eq!(
            config.interpolate("${env.home}/.drush/sites"),
            "/home/tester/.drush/sites"
        );
        assert_eq!(config.interpolate("${env.nope}/x"), "${env.nope}/x");
    }

    #[test]
    fn test_non_mapping_document_is_rejected() {
        let result = ConfigLayer::from_yaml(ConfigContext::User, Path::new("/bad.yml"), "- a\n- b\n");
        assert!(matches!(result, Err(ConfigError::NotAMapping { .. })));

        let result = ConfigLayer::from_yaml(ConfigContext::User, Path::new("/bad.yml"), "a: [");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("/bad.yml"));
    }

    #[test]
    fn test_empty_document_is_an_empty_layer() {
        let layer = ConfigLayer::from_yaml(ConfigContext::Site, Path::new("/e.yml"), "").unwrap();
        assert!(layer.values().is_empty());
    }
}
