// src/cli/handlers/status.rs

use crate::{
    cli::handlers::commons::{self, OutputFormat},
    core::resolver::PreflightOutcome,
};
use anyhow::Result;
use clap::Parser;
use colored::*;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Shows the resolved site, alias and configuration files."
)]
struct StatusArgs {
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Serialize, Debug)]
struct StatusReport<'a> {
    alias: Option<&'a str>,
    resolved: bool,
    site_root: Option<&'a PathBuf>,
    uri: Option<&'a str>,
    host: Option<&'a str>,
    user: Option<&'a str>,
    local: bool,
    config_files: Vec<PathBuf>,
    alias_paths: &'a [PathBuf],
    command_paths: &'a [String],
}

/// The main handler for the `status` command.
pub fn handle(args: Vec<String>, outcome: &PreflightOutcome) -> Result<()> {
    let status_args = StatusArgs::try_parse_from(&args)?;
    let report = build_report(outcome);

    match status_args.format {
        OutputFormat::Json => commons::print_json(&report),
        OutputFormat::Text => {
            print_report(&report);
            Ok(())
        }
    }
}

fn build_report(outcome: &PreflightOutcome) -> StatusReport<'_> {
    let alias = outcome.alias.as_ref();
    StatusReport {
        alias: outcome.preflight.alias.as_deref(),
        resolved: alias.is_some(),
        site_root: outcome.site_root.as_ref(),
        uri: alias.and_then(|a| a.uri()),
        host: alias.and_then(|a| a.host()),
        user: alias.and_then(|a| a.user()),
        local: outcome.preflight.is_local(),
        config_files: outcome
            .config
            .layers()
            .iter()
            .filter_map(|l| l.source().map(|p| p.to_path_buf()))
            .collect(),
        alias_paths: &outcome.alias_paths,
        command_paths: &outcome.preflight.command_paths,
    }
}

fn print_report(report: &StatusReport<'_>) {
    let none = || "-".dimmed().to_string();

    println!("\n--- {} ---", "Preflight status".yellow());

    let alias_line = match (report.alias, report.resolved) {
        (Some(token), true) => token.green().to_string(),
        (Some(token), false) => format!("{} {}", token.red(), "(not found)".dimmed()),
        (None, _) => none(),
    };
    println!("  {:<14} {}", "Alias".blue(), alias_line);
    println!(
        "  {:<14} {}",
        "Site root".blue(),
        report
            .site_root
            .map_or_else(none, |p| p.display().to_string())
    );
    println!("  {:<14} {}", "URI".blue(), report.uri.map_or_else(none, str::to_string));
    if let Some(host) = report.host {
        let target = match report.user {
            Some(user) => format!("{}@{}", user, host),
            None => host.to_string(),
        };
        println!("  {:<14} {}", "Remote".blue(), target);
    }
    if report.local {
        println!("  {:<14} {}", "Mode".blue(), "local".cyan());
    }

    print_list("Config files", report.config_files.iter().map(|p| p.display().to_string()));
    print_list("Alias paths", report.alias_paths.iter().map(|p| p.display().to_string()));
    print_list("Include paths", report.command_paths.iter().cloned());
}

fn print_list(label: &str, items: impl Iterator<Item = String>) {
    let items: Vec<String> = items.collect();
    if items.is_empty() {
        return;
    }
    println!("\n  {}:", label.blue());
    for item in items {
        println!("    - {}", item);
    }
}
