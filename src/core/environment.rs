// src/core/environment.rs

use crate::constants::{CONFIG_FILENAME, SYSTEM_CONFIG_DIR, USER_CONFIG_DIR};
use indexmap::IndexMap;
use serde_yaml::Value;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while taking the process snapshot.
#[derive(Error, Debug)]
pub enum EnvironmentError {
    /// The current working directory could not be read.
    #[error("Could not determine the current working directory: {0}")]
    CurrentDir(#[source] std::io::Error),
}

/// A snapshot of the process environment taken once, before anything else runs.
///
/// Nothing downstream reads `std::env` directly; everything goes through
/// this value so resolution can be exercised with a fabricated environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    cwd: PathBuf,
    home: Option<PathBuf>,
    user: Option<String>,
    tmp: PathBuf,
    system_config_dir: PathBuf,
}

impl Environment {
    /// Captures the running process.
    pub fn from_process() -> Result<Self, EnvironmentError> {
        let cwd = env::current_dir().map_err(EnvironmentError::CurrentDir)?;
        let user = env::var("USER")
            .or_else(|_| env::var("USERNAME"))
            .ok()
            .filter(|u| !u.is_empty());

        Ok(Self {
            cwd,
            home: dirs::home_dir(),
            user,
            tmp: env::temp_dir(),
            system_config_dir: PathBuf::from(SYSTEM_CONFIG_DIR),
        })
    }

    /// A fixed environment, mostly for tests and embedding.
    pub fn new(cwd: impl Into<PathBuf>, home: Option<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            home,
            user: None,
            tmp: env::temp_dir(),
            system_config_dir: PathBuf::from(SYSTEM_CONFIG_DIR),
        }
    }

    /// Overrides the system configuration directory (defaults to `/etc/drush`).
    pub fn with_system_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.system_config_dir = dir.into();
        self
    }

    /// Sets the user name reported under `env.user`.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Working directory at startup.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Home directory, when one can be determined.
    pub fn home(&self) -> Option<&Path> {
        self.home.as_deref()
    }

    /// `/etc/drush/drush.yml`.
    pub fn system_config_path(&self) -> PathBuf {
        self.system_config_dir.join(CONFIG_FILENAME)
    }

    /// `$HOME/.drush/drush.yml`, if there is a home directory.
    pub fn user_config_path(&self) -> Option<PathBuf> {
        self.home
            .as_ref()
            .map(|h| h.join(USER_CONFIG_DIR).join(CONFIG_FILENAME))
    }

    /// The values injected into the reserved `env.*` config namespace,
    /// keyed without the `env.` prefix.
    pub fn export_config_data(&self) -> IndexMap<String, Value> {
        let path_value = |p: &Path| Value::String(p.display().to_string());

        let mut data = IndexMap::new();
        data.insert("cwd".to_string(), path_value(&self.cwd));
        if let Some(home) = &self.home {
            data.insert("home".to_string(), path_value(home));
        }
        if let Some(user) = &self.user {
            data.insert("user".to_string(), Value::String(user.clone()));
        }
        data.insert("tmp".to_string(), path_value(&self.tmp));
        data.insert("is-windows".to_string(), Value::Bool(cfg!(target_os = "windows")));
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conventional_config_paths() {
        let env = Environment::new("/work", Some(PathBuf::from("/home/tester")));
        assert_eq!(env.system_config_path(), PathBuf::from("/etc/drush/drush.yml"));
        assert_eq!(
            env.user_config_path(),
            Some(PathBuf::from("/home/tester/.drush/drush.yml"))
        );
    }

    #[test]
    fn test_no_home_means_no_user_config() {
        let env = Environment::new("/work", None);
        assert!(env.user_config_path().is_none());
        assert!(!env.export_config_data().contains_key("home"));
    }

    #[test]
    fn test_export_config_data() {
        let env = Environment::new("/work", Some(PathBuf::from("/home/tester"))).with_user("tester");
        let data = env.export_config_data();
        assert_eq!(data.get("cwd").and_then(Value::as_str), Some("/work"));
        assert_eq!(data.get("home").and_then(Value::as_str), Some("/home/tester"));
        assert_eq!(data.get("user").and_then(Value::as_str), Some("tester"));
        assert!(data.contains_key("is-windows"));
    }

    #[test]
    fn test_from_process_reads_cwd() {
        let env = Environment::from_process().unwrap();
        assert_eq!(env.cwd(), std::env::current_dir().unwrap());
    }
}
