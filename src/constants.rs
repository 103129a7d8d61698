// src/constants.rs

/// The name of every layered configuration file (system, user, site and tool defaults).
pub const CONFIG_FILENAME: &str = "drush.yml";

/// Suffix of a new-format, single-site alias file (`<name>.site.yml`).
pub const SITE_ALIAS_SUFFIX: &str = ".site.yml";

/// Suffix of a legacy group alias file (`<group>.aliases.drushrc.php`).
pub const LEGACY_GROUP_ALIAS_SUFFIX: &str = ".aliases.drushrc.php";

/// Suffix of a legacy single alias file (`<name>.alias.drushrc.php`).
pub const LEGACY_SINGLE_ALIAS_SUFFIX: &str = ".alias.drushrc.php";

/// System-wide configuration directory.
pub const SYSTEM_CONFIG_DIR: &str = "/etc/drush";

/// Per-user configuration directory, relative to the home directory.
pub const USER_CONFIG_DIR: &str = ".drush";

/// Directory under a site root that holds site-local configuration.
pub const SITE_CONFIG_DIR: &str = "drush";

/// Directory under `SITE_CONFIG_DIR` that holds site-local alias files.
pub const SITE_ALIAS_DIR: &str = "sites";

/// Directory under a Drupal root that holds one subdirectory per multisite.
pub const MULTISITE_DIR: &str = "sites";

/// The environment name that acts as the merge base inside an alias file.
pub const DEFAULT_ENVIRONMENT: &str = "default";

/// The URI used when a site specification does not name one.
pub const DEFAULT_URI: &str = "default";

/// The site name that refers to the current site.
pub const SELF_SITENAME: &str = "self";

/// Config key listing additional alias search locations.
pub const ALIAS_PATH_CONFIG_KEY: &str = "drush.paths.alias-path";

/// How deep `load_all` looks below a search location (the location itself is depth 0).
pub const ALIAS_SCAN_DEPTH: usize = 2;
