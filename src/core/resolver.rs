//! # Preflight Resolver
//!
//! Runs the whole preflight phase for one invocation and hands back plain
//! data: the extracted directives, the merged configuration and the resolved
//! alias record. No global state is read or written; the caller supplies the
//! environment snapshot.
//!
//! ## Order
//!
//! 1. Preprocess argv.
//! 2. Environment values, tool defaults, system/user/`--config` files.
//! 3. Site config for `--root`.
//! 4. Resolve the alias token (`@name` through the alias files, anything else
//!    as a site specification rooted at `--root` or the working directory).
//! 5. Site config for a local alias root.

use crate::{
    constants::DEFAULT_URI,
    core::{
        alias_discovery::SiteAliasFileDiscovery,
        alias_loader::{AliasError, SiteAliasFileLoader},
        alias_name::SiteAliasName,
        config::{Config, ConfigError},
        config_locator::ConfigLocator,
        environment::Environment,
        paths,
        preflight::ArgsPreprocessor,
        site_spec::SiteSpecParser,
    },
    models::{AliasRecord, PreflightArgs},
};
use serde::Serialize;
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fatal preflight failures. Unknown aliases are not errors.
#[derive(Error, Debug)]
pub enum PreflightError {
    /// A configuration file could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// An alias file could not be loaded.
    #[error(transparent)]
    Alias(#[from] AliasError),
}

/// Everything the command dispatcher needs after preflight.
#[derive(Serialize, Debug, Clone)]
pub struct PreflightOutcome {
    /// The directives and residual args.
    pub preflight: PreflightArgs,
    /// The merged configuration.
    #[serde(skip)]
    pub config: Config,
    /// The resolved alias; `None` when there was no token or it matched nothing.
    pub alias: Option<AliasRecord>,
    /// The alias search locations in effect.
    pub alias_paths: Vec<PathBuf>,
    /// The local site root, from `--root` or a local alias.
    pub site_root: Option<PathBuf>,
}

impl PreflightOutcome {
    /// The raw alias token when one was given but nothing matched it.
    pub fn unresolved_alias(&self) -> Option<&str> {
        match (&self.preflight.alias, &self.alias) {
            (Some(token), None) => Some(token),
            _ => None,
        }
    }
}

/// Runs preflight over `argv` (program name first).
///
/// `tool_base` is the directory holding the tool's bundled `drush.yml`, if any.
pub fn run<S: AsRef<str>>(
    argv: &[S],
    environment: &Environment,
    tool_base: Option<&Path>,
) -> Result<PreflightOutcome, PreflightError> {
    let preflight = ArgsPreprocessor::new().parse_argv(argv);
    log::debug!("Preflight args: {:?}", preflight);

    let home = environment.home();
    let mut locator = ConfigLocator::new();
    locator.set_local(preflight.is_local());
    locator.add_environment(environment);
    if let Some(base) = tool_base {
        locator.add_drush_config(base)?;
    }

    let explicit_configs: Vec<PathBuf> = preflight
        .config_paths
        .iter()
        .map(|raw| absolutize(paths::expand_user_path(raw, home), environment.cwd()))
        .collect();
    let user_config = environment.user_config_path();
    locator.add_user_config(
        &explicit_configs,
        &environment.system_config_path(),
        user_config.as_deref(),
    )?;

    let mut site_root = preflight
        .selected_site
        .as_deref()
        .map(|raw| absolutize(paths::expand_user_path(raw, home), environment.cwd()));
    if let Some(root) = &site_root {
        locator.add_sitewide_config(root)?;
    }

    let alias = match preflight.alias.as_deref() {
        Some(token) => resolve_token(token, &locator, &preflight, environment, site_root.as_deref())?,
        None => None,
    };

    if let Some(record) = &alias
        && !record.is_remote()
        && let Some(root) = record.root()
    {
        let root = PathBuf::from(root);
        locator.add_sitewide_config(&root)?;
        site_root.get_or_insert(root);
    }

    let alias_paths = locator.get_site_alias_paths(&preflight.alias_paths, environment);
    Ok(PreflightOutcome {
        config: locator.config(),
        preflight,
        alias,
        alias_paths,
        site_root,
    })
}

fn resolve_token(
    token: &str,
    locator: &ConfigLocator,
    preflight: &PreflightArgs,
    environment: &Environment,
    site_root: Option<&Path>,
) -> Result<Option<AliasRecord>, AliasError> {
    if SiteAliasName::is_alias_name(token) {
        let name = SiteAliasName::parse(token);
        let mut discovery = SiteAliasFileDiscovery::new();
        for location in locator.get_site_alias_paths(&preflight.alias_paths, environment) {
            discovery.add_search_location(location);
        }

        let record = SiteAliasFileLoader::new(discovery).load(&name)?;
        if record.is_none() && name.is_self() && !name.has_env() {
            return Ok(site_root.map(self_record));
        }
        return Ok(record);
    }

    let default_root = site_root.unwrap_or(environment.cwd());
    let resolution = SiteSpecParser::new().parse(token, Some(default_root));
    log::debug!("Site specification '{}': {:?}", token, resolution);
    Ok(resolution.into_spec().map(|spec| spec.to_record()))
}

/// `@self` without an alias file: the selected root and the default site.
fn self_record(root: &Path) -> AliasRecord {
    let mut record = AliasRecord::new();
    record.insert("root", Value::String(root.display().to_string()));
    record.insert("uri", Value::String(DEFAULT_URI.to_string()));
    record
}

fn absolutize(path: PathBuf, cwd: &Path) -> PathBuf {
    if path.is_absolute() { path } else { cwd.join(path) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Workspace {
        dir: TempDir,
        site_root: PathBuf,
        environment: Environment,
    }

    fn write(path: &Path, text: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, text).unwrap();
    }

    fn workspace() -> Workspace {
        let dir = TempDir::new().unwrap();
        let site_root = dir.path().join("web");
        let home = dir.path().join("home");

        write(&dir.path().join("etc").join("drush.yml"), "origin: system\n");
        write(&home.join(".drush").join("drush.yml"), "origin: user\nuser-only: here\n");
        write(&site_root.join("drush").join("drush.yml"), "origin: site\n");
        write(
            &site_root.join("drush").join("sites").join("single.site.yml"),
            "default:\n  root: /path/to/single\nalternate:\n  root: /alternate/path/to/single\n",
        );
        fs::create_dir_all(site_root.join("sites").join("multi")).unwrap();

        let environment = Environment::new(dir.path(), Some(home))
            .with_system_config_dir(dir.path().join("etc"));
        Workspace {
            dir,
            site_root,
            environment,
        }
    }

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_alias_resolved_through_site_alias_directory() {
        // --- Setup ---
        let ws = workspace();
        let root = ws.site_root.display().to_string();
        let args = argv(&["drush", "@single.alternate", "--root", &root, "status"]);

        // --- Execute ---
        let outcome = run(&args, &ws.environment, None).unwrap();

        // --- Assert ---
        assert_eq!(outcome.preflight.args, vec!["drush", "status"]);
        assert_eq!(
            outcome.alias.as_ref().and_then(AliasRecord::root),
            Some("/alternate/path/to/single")
        );
        assert_eq!(outcome.config.get_str("origin"), Some("site".to_string()));
        assert_eq!(outcome.config.get_str("user-only"), Some("here".to_string()));
        assert!(outcome.alias_paths.contains(&ws.site_root.join("drush").join("sites")));
        assert_eq!(outcome.site_root, Some(ws.site_root.clone()));
        assert!(outcome.unresolved_alias().is_none());
    }

    #[test]
    fn test_local_mode_and_explicit_config() {
        let ws = workspace();
        let explicit = ws.dir.path().join("extra.yml");
        write(&explicit, "origin: cli\n");
        let config_arg = format!("--config={}", explicit.display());
        let args = argv(&["drush", "--local", &config_arg, "status"]);

        let outcome = run(&args, &ws.environment, None).unwrap();

        assert_eq!(outcome.config.get_str("origin"), Some("cli".to_string()));
        assert!(!outcome.config.has("user-only"));
        assert!(outcome.config.has("env.cwd"));
    }

    #[test]
    fn test_site_spec_with_multisite_uri() {
        let ws = workspace();
        let root = ws.site_root.display().to_string();
        let args = argv(&["drush", "#multi", "-r", &root, "status"]);

        let outcome = run(&args, &ws.environment, None).unwrap();

        let alias = outcome.alias.unwrap();
        assert_eq!(alias.root(), Some(root.as_str()));
        assert_eq!(alias.uri(), Some("multi"));
    }

    #[test]
    fn test_remote_spec_does_not_add_site_root() {
        let ws = workspace();
        let args = argv(&["drush", "user@server/path#uri", "status"]);

        let outcome = run(&args, &ws.environment, None).unwrap();

        let alias = outcome.alias.unwrap();
        assert_eq!(alias.host(), Some("server"));
        assert!(outcome.site_root.is_none());
    }

    #[test]
    fn test_unknown_alias_is_not_an_error() {
        let ws = workspace();
        let args = argv(&["drush", "@nowhere", "status"]);

        let outcome = run(&args, &ws.environment, None).unwrap();

        assert!(outcome.alias.is_none());
        assert_eq!(outcome.unresolved_alias(), Some("@nowhere"));
    }

    #[test]
    fn test_self_alias_uses_selected_root() {
        let ws = workspace();
        let root = ws.site_root.display().to_string();
        let args = argv(&["drush", "@self", "--root", &root, "status"]);

        let outcome = run(&args, &ws.environment, None).unwrap();

        let alias = outcome.alias.unwrap();
        assert_eq!(alias.root(), Some(root.as_str()));
        assert_eq!(alias.uri(), Some("default"));
    }

    #[test]
    fn test_tool_defaults_are_lowest() {
        let ws = workspace();
        let tool = ws.dir.path().join("tool");
        write(&tool.join("drush.yml"), "origin: drush\ntool-only: 1\n");
        let args = argv(&["drush", "status"]);

        let outcome = run(&args, &ws.environment, Some(&tool)).unwrap();

        assert_eq!(outcome.config.get_str("origin"), Some("user".to_string()));
        assert_eq!(outcome.config.get_str("tool-only"), Some("1".to_string()));
    }

    #[test]
    fn test_broken_config_is_fatal() {
        let ws = workspace();
        write(&ws.site_root.join("drush").join("drush.yml"), "- not\n- a mapping\n");
        let root = ws.site_root.display().to_string();
        let args = argv(&["drush", "--root", &root, "status"]);

        let err = run(&args, &ws.environment, None).unwrap_err();
        assert!(matches!(err, PreflightError::Config(ConfigError::NotAMapping { .. })));
    }
}
