// src/cli/handlers/mod.rs

// One module per diagnostic command run on the residual args.

pub mod commons;
pub mod config_get;
pub mod config_sources;
pub mod site_alias;
pub mod status;
