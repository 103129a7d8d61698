// src/core/config_locator.rs

use crate::{
    constants::{ALIAS_PATH_CONFIG_KEY, CONFIG_FILENAME, SITE_ALIAS_DIR, SITE_CONFIG_DIR},
    core::{
        config::{Config, ConfigContext, ConfigError, ConfigLayer},
        environment::Environment,
        paths,
    },
};
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Collects configuration sources and produces the merged `Config`.
///
/// Files are read when they are added, so `config()` never touches the
/// filesystem and always returns the same value for the same locator.
#[derive(Debug, Clone, Default)]
pub struct ConfigLocator {
    is_local: bool,
    layers: Vec<ConfigLayer>,
    site_roots: Vec<PathBuf>,
}

impl ConfigLocator {
    /// Creates an empty locator (not in local mode).
    pub fn new() -> Self {
        Self::default()
    }

    /// In local mode, later `add_user_config` calls skip the system and user
    /// files. Explicit `--config` paths, site and tool config are unaffected.
    pub fn set_local(&mut self, is_local: bool) -> &mut Self {
        self.is_local = is_local;
        self
    }

    /// Whether local mode is on.
    pub fn is_local(&self) -> bool {
        self.is_local
    }

    /// Injects the process snapshot under the reserved `env.*` namespace.
    pub fn add_environment(&mut self, environment: &Environment) -> &mut Self {
        let values = environment
            .export_config_data()
            .into_iter()
            .map(|(key, value)| (format!("env.{}", key), value))
            .collect();
        self.layers
            .push(ConfigLayer::new(ConfigContext::Environment, None, values));
        self
    }

    /// Adds the system file, the user file and then each explicit `--config`
    /// path, in increasing precedence. Missing files are skipped; an explicit
    /// path that does not exist is reported with a warning.
    pub fn add_user_config(
        &mut self,
        explicit_paths: &[PathBuf],
        system_config_path: &Path,
        user_config_path: Option<&Path>,
    ) -> Result<(), ConfigError> {
        if self.is_local {
            log::debug!("Local mode: skipping system and user configuration");
        } else {
            self.add_config_file(ConfigContext::System, system_config_path)?;
            if let Some(user) = user_config_path {
                self.add_config_file(ConfigContext::User, user)?;
            }
        }

        for path in explicit_paths {
            if path.as_os_str().is_empty() {
                continue;
            }
            if !self.add_config_file(ConfigContext::Cli, path)? {
                log::warn!("Config file '{}' does not exist; ignoring it", path.display());
            }
        }
        Ok(())
    }

    /// Adds `<site_root>/drush/drush.yml` and remembers the root for alias lookup.
    pub fn add_sitewide_config(&mut self, site_root: &Path) -> Result<(), ConfigError> {
        let key = paths::dedup_key(site_root);
        if self.site_roots.iter().any(|r| paths::dedup_key(r) == key) {
            return Ok(());
        }
        self.site_roots.push(site_root.to_path_buf());

        let file = site_root.join(SITE_CONFIG_DIR).join(CONFIG_FILENAME);
        self.add_config_file(ConfigContext::Site, &file)?;
        Ok(())
    }

    /// Adds the tool's bundled `<tool_base>/drush.yml` as the lowest layer.
    pub fn add_drush_config(&mut self, tool_base: &Path) -> Result<(), ConfigError> {
        self.add_config_file(ConfigContext::Drush, &tool_base.join(CONFIG_FILENAME))?;
        Ok(())
    }

    /// Ordered, de-duplicated alias search locations: explicit `--alias-path`
    /// values, then `drush.paths.alias-path` from config, then
    /// `<site_root>/drush/sites` for every site root added so far.
    pub fn get_site_alias_paths(
        &self,
        explicit_alias_paths: &[String],
        environment: &Environment,
    ) -> Vec<PathBuf> {
        let config = self.config();
        let home = environment.home();

        let explicit = explicit_alias_paths
            .iter()
            .map(|raw| paths::expand_user_path(raw, home));
        let configured = config
            .get_string_list(ALIAS_PATH_CONFIG_KEY)
            .into_iter()
            .map(|raw| paths::expand_user_path(&config.interpolate(&raw), home));
        let site_local = self
            .site_roots
            .iter()
            .map(|root| root.join(SITE_CONFIG_DIR).join(SITE_ALIAS_DIR));

        paths::dedup_preserving_order(explicit.chain(configured).chain(site_local))
    }

    /// The files that contributed a layer, lowest precedence first.
    pub fn collect_sources(&self) -> Vec<PathBuf> {
        self.config()
            .layers()
            .iter()
            .filter_map(|l| l.source().map(Path::to_path_buf))
            .collect()
    }

    /// The site roots added with `add_sitewide_config`.
    pub fn site_roots(&self) -> &[PathBuf] {
        &self.site_roots
    }

    /// The merged configuration.
    pub fn config(&self) -> Config {
        Config::new(self.layers.clone())
    }

    /// Provenance of every file-backed key, see `Config::sources`.
    pub fn sources(&self) -> IndexMap<String, IndexMap<String, Vec<PathBuf>>> {
        self.config().sources()
    }

    /// Loads one file into a layer. `Ok(false)` when there is nothing to load.
    /// A directory stands for the `drush.yml` inside it.
    fn add_config_file(&mut self, context: ConfigContext, path: &Path) -> Result<bool, ConfigError> {
        let file = if path.is_dir() {
            path.join(CONFIG_FILENAME)
        } else {
            path.to_path_buf()
        };

        if !file.is_file() {
            log::trace!("No {} config at {}", context.label(), file.display());
            return Ok(false);
        }

        let text = fs::read_to_string(&file).map_err(|e| ConfigError::Read {
            path: file.display().to_string(),
            source: e,
        })?;
        let layer = ConfigLayer::from_yaml(context, &file, &text)?;
        log::debug!(
            "Loaded {} config from {} ({} keys)",
            context.label(),
            file.display(),
            layer.values().len()
        );
        self.layers.push(layer);
        Ok(true)
    }
}
