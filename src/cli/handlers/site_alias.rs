// src/cli/handlers/site_alias.rs

use crate::{
    cli::handlers::commons::{self, OutputFormat},
    core::{
        alias_discovery::SiteAliasFileDiscovery, alias_loader::SiteAliasFileLoader,
        alias_name::SiteAliasName, resolver::PreflightOutcome,
    },
    models::AliasRecord,
};
use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use indexmap::IndexMap;

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Lists every known alias, or shows one."
)]
struct SiteAliasArgs {
    /// An alias name (`@site.env`, `@env`) or a full `@group.site.env` key.
    name: Option<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// The main handler for the `site:alias` command.
///
/// With a name, shows that alias. Without one, shows the alias given before
/// the command, or lists every alias in the search locations.
pub fn handle(args: Vec<String>, outcome: &PreflightOutcome) -> Result<()> {
    let sa_args = SiteAliasArgs::try_parse_from(&args)?;

    let loader = loader_for(outcome);
    let aliases: IndexMap<String, AliasRecord> = match (&sa_args.name, &outcome.preflight.alias) {
        (Some(name), _) => {
            let record = find_alias(&loader, name)?;
            IndexMap::from([(name.clone(), record)])
        }
        (None, Some(token)) => match &outcome.alias {
            Some(record) => IndexMap::from([(token.clone(), record.clone())]),
            None => bail!("No such alias or site: {}", token),
        },
        (None, None) => loader
            .load_all()
            .context("Failed to list site aliases")?,
    };

    match sa_args.format {
        OutputFormat::Json => commons::print_json(&aliases),
        OutputFormat::Text => {
            if aliases.is_empty() {
                println!("{}", "No site aliases found.".dimmed());
                for location in loader.discovery().search_locations() {
                    log::debug!("Searched {}", location.display());
                }
            }
            for (name, record) in &aliases {
                commons::print_record(name, record);
            }
            Ok(())
        }
    }
}

fn loader_for(outcome: &PreflightOutcome) -> SiteAliasFileLoader {
    let mut discovery = SiteAliasFileDiscovery::new();
    for location in &outcome.alias_paths {
        discovery.add_search_location(location);
    }
    SiteAliasFileLoader::new(discovery)
}

/// Resolves a short name first, then falls back to the canonical keys of `load_all`.
fn find_alias(loader: &SiteAliasFileLoader, name: &str) -> Result<AliasRecord> {
    let parsed = SiteAliasName::parse(name);
    if let Some(record) = loader.load(&parsed)? {
        return Ok(record);
    }

    let all = loader.load_all()?;
    match all.get(name) {
        Some(record) => Ok(record.clone()),
        None => bail!("No such alias: {}", name),
    }
}
