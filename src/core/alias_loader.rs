//! # Site Alias Loader
//!
//! Turns alias files into `AliasRecord`s. Two on-disk formats exist, and both
//! sit behind the `AliasFileParser` trait:
//!
//! - `<name>.site.yml`: YAML, either flat or keyed by environment.
//! - `<group>.aliases.drushrc.php` / `<name>.alias.drushrc.php`: legacy PHP arrays,
//!   handled by `core::legacy_aliases`.
//!
//! `AliasFileFormat::from_path` picks the parser from the file name.

use crate::{
    constants::{DEFAULT_ENVIRONMENT, SITE_ALIAS_SUFFIX},
    core::{
        alias_discovery::SiteAliasFileDiscovery,
        alias_name::SiteAliasName,
        legacy_aliases::{self, LegacyFileKind},
    },
    models::AliasRecord,
};
use indexmap::IndexMap;
use serde_yaml::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors raised while reading alias files. All of them are fatal.
#[derive(Error, Debug)]
pub enum AliasError {
    /// The file exists but could not be read.
    #[error("Could not read alias file '{path}': {source}")]
    Read {
        /// The offending file.
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The file content is not a valid alias definition.
    #[error("Error parsing alias file '{path}': {message}")]
    Parse {
        /// The offending file.
        path: String,
        /// Parser diagnostic.
        message: String,
    },
    /// The file name matches no known alias format.
    #[error("'{path}' is not an alias file.")]
    UnknownFormat {
        /// The offending file.
        path: String,
    },
}

/// What one alias file contributes.
#[derive(Debug, Clone, PartialEq)]
pub enum AliasFileContent {
    /// A `.site.yml` file with no environments.
    Flat(AliasRecord),
    /// A `.site.yml` file keyed by environment name, in declaration order.
    Environments(IndexMap<String, AliasRecord>),
    /// A legacy file: canonical alias name -> record.
    Legacy(IndexMap<String, AliasRecord>),
}

/// One alias file format.
pub trait AliasFileParser {
    /// Parses the already-read `text` of the file at `path`.
    fn load_file(&self, path: &Path, text: &str) -> Result<AliasFileContent, AliasError>;
}

/// The YAML `.site.yml` format.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlAliasFile;

impl AliasFileParser for YamlAliasFile {
    fn load_file(&self, path: &Path, text: &str) -> Result<AliasFileContent, AliasError> {
        let document: Value = serde_yaml::from_str(text).map_err(|e| AliasError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let map = match document {
            Value::Null => return Ok(AliasFileContent::Flat(AliasRecord::new())),
            Value::Mapping(map) => map,
            _ => {
                return Err(AliasError::Parse {
                    path: path.display().to_string(),
                    message: "top level must be a mapping".to_string(),
                });
            }
        };

        let env_keyed = !map.is_empty()
            && !map.contains_key("root")
            && map.values().all(Value::is_mapping);

        if !env_keyed {
            return Ok(AliasFileContent::Flat(record_from_mapping(map)));
        }

        let environments = map
            .into_iter()
            .filter_map(|(env, value)| {
                let env = yaml_key(&env)?;
                let Value::Mapping(inner) = value else {
                    return None;
                };
                Some((env, record_from_mapping(inner)))
            })
            .collect();
        Ok(AliasFileContent::Environments(environments))
    }
}

/// The legacy PHP array format.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyAliasFile;

impl AliasFileParser for LegacyAliasFile {
    fn load_file(&self, path: &Path, text: &str) -> Result<AliasFileContent, AliasError> {
        let kind = LegacyFileKind::from_path(path).ok_or_else(|| AliasError::UnknownFormat {
            path: path.display().to_string(),
        })?;
        let parsed = legacy_aliases::parse_legacy_aliases(&kind, text).map_err(|e| AliasError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        for skipped in &parsed.skipped {
            log::warn!(
                "{}:{}: skipping legacy alias statement ({})",
                path.display(),
                skipped.line,
                skipped.message
            );
        }
        Ok(AliasFileContent::Legacy(parsed.aliases))
    }
}

/// The formats an alias file can be in, selected by file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasFileFormat {
    /// `<name>.site.yml`
    SiteYaml,
    /// `*.aliases.drushrc.php` / `*.alias.drushrc.php`
    LegacyDrushrc,
}

impl AliasFileFormat {
    /// Classifies a path, or `None` when it is not an alias file.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(SITE_ALIAS_SUFFIX) {
            Some(Self::SiteYaml)
        } else if LegacyFileKind::from_path(path).is_some() {
            Some(Self::LegacyDrushrc)
        } else {
            None
        }
    }

    /// The parser for this format.
    pub fn parser(self) -> &'static dyn AliasFileParser {
        match self {
            Self::SiteYaml => &YamlAliasFile,
            Self::LegacyDrushrc => &LegacyAliasFile,
        }
    }
}

/// Reads and parses one alias file in whatever format its name says.
pub fn load_alias_file(path: &Path) -> Result<AliasFileContent, AliasError> {
    let format = AliasFileFormat::from_path(path).ok_or_else(|| AliasError::UnknownFormat {
        path: path.display().to_string(),
    })?;
    let text = fs::read_to_string(path).map_err(|e| AliasError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    log::trace!("Parsing {:?} alias file {}", format, path.display());
    format.parser().load_file(path, &text)
}

fn yaml_key(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn record_from_mapping(map: serde_yaml::Mapping) -> AliasRecord {
    let mut record = AliasRecord::new();
    for (key, value) in map {
        if let Some(key) = yaml_key(&key) {
            record.insert(key, value);
        }
    }
    record
}

/// Resolves alias names against the files a `SiteAliasFileDiscovery` finds.
///
/// Every call goes back to the filesystem; nothing is cached.
#[derive(Debug, Clone, Default)]
pub struct SiteAliasFileLoader {
    discovery: SiteAliasFileDiscovery,
}

impl SiteAliasFileLoader {
    /// Creates a loader over the given discovery.
    pub fn new(discovery: SiteAliasFileDiscovery) -> Self {
        Self { discovery }
    }

    /// The discovery in use.
    pub fn discovery(&self) -> &SiteAliasFileDiscovery {
        &self.discovery
    }

    /// Loads one alias. `Ok(None)` means the alias does not exist; only
    /// unreadable or corrupt files are errors.
    ///
    /// `@site.env` reads `site.site.yml` and selects `env` merged over
    /// `default`. A bare `@name` reads `name.site.yml` and returns its
    /// `default` environment, or the whole file when it is flat. A selected
    /// record without a `root` is not found.
    pub fn load(&self, name: &SiteAliasName) -> Result<Option<AliasRecord>, AliasError> {
        if !name.is_valid() {
            return Ok(None);
        }

        let (file_stem, requested_env) = match (name.sitename(), name.env()) {
            (Some(site), env) => (site, env),
            (None, Some(token)) => (token, None),
            (None, None) => return Ok(None),
        };

        let Some(path) = self.discovery.find_single_site_alias_file(file_stem) else {
            return Ok(None);
        };

        let record = match load_alias_file(&path)? {
            AliasFileContent::Flat(record) => match requested_env {
                None => Some(record),
                Some(env) if env == DEFAULT_ENVIRONMENT => Some(record),
                Some(env) => {
                    log::debug!("{} declares no environments, so not '{}'", path.display(), env);
                    None
                }
            },
            AliasFileContent::Environments(envs) => select_environment(&envs, requested_env),
            AliasFileContent::Legacy(aliases) => aliases.get(&name.to_string()).cloned(),
        };
        let record = record.filter(|r| has_root(&name.to_string(), r));

        log::debug!(
            "Alias '{}' {}",
            name,
            if record.is_some() { "resolved" } else { "not found" }
        );
        Ok(record)
    }

    /// Every alias reachable from the search locations, keyed by canonical name.
    ///
    /// New-format entries come first, as `@<group>.<site>.<env>` in discovery
    /// and then declaration order. Legacy entries follow; a legacy alias never
    /// replaces a new-format one with the same name.
    pub fn load_all(&self) -> Result<IndexMap<String, AliasRecord>, AliasError> {
        let mut all = IndexMap::new();
        let mut found = IndexMap::new();

        for file in self.discovery.find_all_single_alias_files() {
            let prefix = format!("@{}.{}", file.group, file.sitename);
            match load_alias_file(&file.path)? {
                AliasFileContent::Flat(record) => {
                    found.insert(format!("{}.{}", prefix, DEFAULT_ENVIRONMENT), record);
                }
                AliasFileContent::Environments(envs) => {
                    let base = envs.get(DEFAULT_ENVIRONMENT).cloned().unwrap_or_default();
                    let declared: Vec<_> = envs
                        .iter()
                        .filter(|(env, _)| env.as_str() != DEFAULT_ENVIRONMENT)
                        .collect();

                    if declared.is_empty() {
                        found.insert(format!("{}.{}", prefix, DEFAULT_ENVIRONMENT), base);
                    } else {
                        for (env, record) in declared {
                            found.insert(format!("{}.{}", prefix, env), record.merged_over(&base));
                        }
                    }
                }
                AliasFileContent::Legacy(aliases) => found.extend(aliases),
            }
        }
        all.extend(found.into_iter().filter(|(name, record)| has_root(name, record)));

        for path in self.discovery.find_all_legacy_alias_files() {
            if let AliasFileContent::Legacy(aliases) = load_alias_file(&path)? {
                for (name, record) in aliases {
                    if all.contains_key(&name) {
                        log::debug!("Legacy alias {} shadowed by a .site.yml alias", name);
                        continue;
                    }
                    if has_root(&name, &record) {
                        all.insert(name, record);
                    }
                }
            }
        }

        Ok(all)
    }
}

/// An alias only resolves when it names a `root`.
fn has_root(name: &str, record: &AliasRecord) -> bool {
    let ok = record.root().is_some_and(|r| !r.is_empty());
    if !ok {
        log::debug!("Alias '{}' has no root; treating it as not found", name);
    }
    ok
}

/// Picks an environment out of an environment-keyed file.
fn select_environment(
    envs: &IndexMap<String, AliasRecord>,
    requested: Option<&str>,
) -> Option<AliasRecord> {
    let default = envs.get(DEFAULT_ENVIRONMENT);
    match requested {
        Some(env) => match (envs.get(env), default) {
            (Some(record), Some(base)) => Some(record.merged_over(base)),
            (Some(record), None) => Some(record.clone()),
            (None, base) => base.cloned(),
        },
        None => default.cloned(),
    }
}
