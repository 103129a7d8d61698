// src/cli/handlers/config_sources.rs

use crate::{
    cli::handlers::commons::{self, OutputFormat},
    core::resolver::PreflightOutcome,
};
use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use indexmap::IndexMap;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Shows which configuration file defined each key."
)]
struct ConfigSourcesArgs {
    /// Only report keys under this dotted prefix.
    #[arg(long)]
    prefix: Option<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// The main handler for the `config:sources` command.
pub fn handle(args: Vec<String>, outcome: &PreflightOutcome) -> Result<()> {
    let sources_args = ConfigSourcesArgs::try_parse_from(&args)?;
    let sources = filter_by_prefix(outcome.config.sources(), sources_args.prefix.as_deref());

    match sources_args.format {
        OutputFormat::Json => commons::print_json(&sources),
        OutputFormat::Text => {
            if sources.is_empty() {
                println!("{}", "No configuration files were loaded.".dimmed());
            }
            for (context, keys) in &sources {
                println!("\n--- {} ---", context.yellow());
                for (key, files) in keys {
                    let files: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();
                    println!("  {:<32} {}", key.cyan(), files.join(" < ").dimmed());
                }
            }
            Ok(())
        }
    }
}

fn filter_by_prefix(
    sources: IndexMap<String, IndexMap<String, Vec<PathBuf>>>,
    prefix: Option<&str>,
) -> IndexMap<String, IndexMap<String, Vec<PathBuf>>> {
    let Some(prefix) = prefix else {
        return sources;
    };
    let dotted = format!("{}.", prefix);

    sources
        .into_iter()
        .map(|(context, keys)| {
            let keys: IndexMap<_, _> = keys
                .into_iter()
                .filter(|(key, _)| key == prefix || key.starts_with(&dotted))
                .collect();
            (context, keys)
        })
        .filter(|(_, keys)| !keys.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_by_prefix_drops_empty_contexts() {
        // --- Setup ---
        let mut sources = IndexMap::new();
        sources.insert(
            "user".to_string(),
            IndexMap::from([
                ("drush.paths.alias-path".to_string(), vec![PathBuf::from("/u.yml")]),
                ("drushy".to_string(), vec![PathBuf::from("/u.yml")]),
            ]),
        );
        sources.insert(
            "site".to_string(),
            IndexMap::from([("options.uri".to_string(), vec![PathBuf::from("/s.yml")])]),
        );

        // --- Execute ---
        let filtered = filter_by_prefix(sources, Some("drush"));

        // --- Assert ---
        assert_eq!(filtered.len(), 1);
        let user = filtered.get("user").unwrap();
        assert_eq!(user.keys().collect::<Vec<_>>(), vec!["drush.paths.alias-path"]);
    }
}
