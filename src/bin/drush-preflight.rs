// src/bin/drush-preflight.rs

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use colored::*;
use drush_preflight::{
    cli::{Cli, handlers},
    core::{
        environment::Environment,
        resolver::{self, PreflightOutcome},
    },
};
use std::env;
use std::path::Path;

// --- Command Definition and Registry ---

/// A diagnostic command, its aliases, and its handler.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(Vec<String>, &PreflightOutcome) -> Result<()>,
}

/// Every command the binary knows. Add an entry here to add a command.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "config:get",
        aliases: &["cget"],
        handler: handlers::config_get::handle,
    },
    CommandDefinition {
        name: "config:sources",
        aliases: &[],
        handler: handlers::config_sources::handle,
    },
    CommandDefinition {
        name: "site:alias",
        aliases: &["sa"],
        handler: handlers::site_alias::handle,
    },
    CommandDefinition {
        name: "status",
        aliases: &["st"],
        handler: handlers::status::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// Sets up logging, runs preflight, dispatches the residual command and
/// reports any error in one place.
fn main() {
    env_logger::init();

    if let Err(e) = run_cli() {
        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let argv: Vec<String> = env::args().collect();
    let environment = Environment::from_process()?;

    // A `drush.yml` next to the executable holds the bundled defaults.
    let exe = env::current_exe().context("Could not locate the running executable")?;
    let tool_base = exe.parent().map(Path::to_path_buf);

    let outcome = resolver::run(&argv, &environment, tool_base.as_deref())?;
    log::debug!("Preflight outcome: {:?}", outcome);

    let cli = Cli::parse_from(&outcome.preflight.args);
    let Some(command_name) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match find_command(&command_name) {
        Some(command) => (command.handler)(cli.args, &outcome),
        None => bail!(
            "Unknown command '{}'. Run 'drush-preflight --help' to list commands.",
            command_name
        ),
    }
}
