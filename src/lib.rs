//! Preflight for Drush-style admin tools: pulls the alias or site
//! specification and the global directives out of argv, locates and merges
//! `drush.yml` layers, and resolves the alias to a site record before any
//! command runs.

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
