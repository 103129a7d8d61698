// src/core/mod.rs

pub mod alias_discovery;
pub mod alias_loader;
pub mod alias_name;
pub mod config;
pub mod config_locator;
pub mod environment;
pub mod legacy_aliases;
pub mod paths;
pub mod preflight;
pub mod resolver;
pub mod site_spec;
