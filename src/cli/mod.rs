use clap::Parser;

pub mod handlers;

const HELP_TEMPLATE: &str = "\
<title>drush-preflight</title> {version}
Resolves site aliases, site specifications and layered configuration
before a command runs.

<title>USAGE:</title>
  drush-preflight <hl>[@alias | user@host/path#uri]</hl> <dim>[global options]</dim> <cmd><command></cmd> <dim>[options]</dim>

<title>GLOBAL OPTIONS:</title> <dim>(accepted anywhere on the line)</dim>
  <hl>-r, --root <path></hl>       Drupal root of the site to use
  <hl>--config <path></hl>         Extra drush.yml file or directory <dim>(repeatable)</dim>
  <hl>--alias-path <path></hl>     Extra alias search location <dim>(repeatable)</dim>
  <hl>--include <path></hl>        Extra command search location <dim>(repeatable)</dim>
  <hl>--local</hl>                 Ignore system and user configuration

<title>COMMANDS:</title>
  <cmd>status</cmd>, <cmd>st</cmd>              Show the resolved site and configuration files
  <cmd>site:alias</cmd>, <cmd>sa</cmd>          List aliases, or show one
  <cmd>config:get</cmd>, <cmd>cget</cmd>        Print one configuration value
  <cmd>config:sources</cmd>          Show which file defined each key

Every command accepts <hl>--format text|json</hl>. Set <hl>RUST_LOG=debug</hl> to trace resolution.
";

/// Markup tags used in `HELP_TEMPLATE` and the SGR codes they stand for.
const HELP_STYLES: &[(&str, &str)] = &[
    ("title", "1;33"),
    ("hl", "1;36"),
    ("cmd", "36"),
    ("dim", "2"),
];

/// Replaces the markup tags in `template`. Tags are stripped when `colors`
/// is false.
fn render_help(template: &str, colors: bool) -> String {
    HELP_STYLES.iter().fold(template.to_string(), |text, (tag, sgr)| {
        let (open, close) = if colors {
            (format!("\x1b[{}m", sgr), "\x1b[0m")
        } else {
            (String::new(), "")
        };
        text.replace(&format!("<{}>", tag), &open)
            .replace(&format!("</{}>", tag), close)
    })
}

fn build_help_string() -> &'static str {
    let colors = colored::control::SHOULD_COLORIZE.should_colorize();
    // clap keeps the template for the life of the process.
    Box::leak(render_help(HELP_TEMPLATE, colors).into_boxed_str())
}

/// The residual command line after preflight has consumed its directives.
#[derive(Parser, Debug)]
#[command(
    name = "drush-preflight",
    version,
    about,
    help_template = { build_help_string() },
)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// The command to run.
    #[arg()]
    pub command: Option<String>,

    /// Everything after the command, handed to its handler untouched.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
