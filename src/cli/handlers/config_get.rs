// src/cli/handlers/config_get.rs

use crate::{
    cli::handlers::commons::{self, OutputFormat},
    core::resolver::PreflightOutcome,
};
use anyhow::{Result, bail};
use clap::Parser;
use colored::Colorize;

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Prints one configuration value, or every value under a namespace."
)]
struct ConfigGetArgs {
    /// Dotted key, e.g. `options.uri` or `drush.paths`.
    key: String,

    /// Also list the files that define the key, lowest precedence first.
    #[arg(long)]
    sources: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// The main handler for the `config:get` command.
pub fn handle(args: Vec<String>, outcome: &PreflightOutcome) -> Result<()> {
    let get_args = ConfigGetArgs::try_parse_from(&args)?;
    let config = &outcome.config;
    let key = get_args.key.as_str();

    if !config.has(key) {
        bail!("Config key '{}' not found.", key);
    }

    match (get_args.format, config.get(key)) {
        (OutputFormat::Json, Some(value)) => commons::print_json(value)?,
        (OutputFormat::Json, None) => commons::print_json(&config.section(key))?,
        (OutputFormat::Text, Some(value)) => println!("{}", commons::render_value(value)),
        (OutputFormat::Text, None) => {
            for (sub_key, value) in config.section(key) {
                println!("{}.{}: {}", key, sub_key.cyan(), commons::render_value(&value));
            }
        }
    }

    if get_args.sources {
        let sources = config.sources_for(key);
        if sources.is_empty() {
            println!("{}", "(not defined in any file)".dimmed());
        }
        for (context, path) in sources {
            println!("  {:<12} {}", context.label().blue(), path.display());
        }
    }
    Ok(())
}
