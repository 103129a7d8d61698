// src/core/preflight.rs

use crate::{
    core::{alias_name::SiteAliasName, site_spec::SiteSpecParser},
    models::PreflightArgs,
};

/// Describes one global directive the preprocessor owns.
struct DirectiveDefinition {
    name: &'static str,
    short: Option<&'static str>,
    takes_value: bool,
    apply: fn(&mut PreflightArgs, String),
}

/// Every directive recognised before the command parser runs.
/// Anything not listed here passes through to `args` untouched.
static DIRECTIVE_REGISTRY: &[DirectiveDefinition] = &[
    DirectiveDefinition {
        name: "root",
        short: Some("r"),
        takes_value: true,
        apply: |out, value| out.selected_site = Some(value),
    },
    DirectiveDefinition {
        name: "config",
        short: None,
        takes_value: true,
        apply: |out, value| out.config_paths.push(value),
    },
    DirectiveDefinition {
        name: "alias-path",
        short: None,
        takes_value: true,
        apply: |out, value| out.alias_paths.push(value),
    },
    DirectiveDefinition {
        name: "include",
        short: None,
        takes_value: true,
        apply: |out, value| out.command_paths.push(value),
    },
    DirectiveDefinition {
        name: "local",
        short: None,
        takes_value: false,
        apply: |out, _| out.is_local = Some(true),
    },
];

/// Token that ends directive scanning.
const END_OF_OPTIONS: &str = "--";

/// A directive occurrence found in a single token.
struct DirectiveMatch<'a> {
    definition: &'static DirectiveDefinition,
    /// The value attached with `=`, if any.
    inline_value: Option<&'a str>,
}

fn match_directive(token: &str) -> Option<DirectiveMatch<'_>> {
    let (name, is_long) = if let Some(name) = token.strip_prefix("--") {
        (name, true)
    } else if let Some(name) = token.strip_prefix('-') {
        (name, false)
    } else {
        return None;
    };

    let (name, inline_value) = match name.split_once('=') {
        Some((n, v)) => (n, Some(v)),
        None => (name, None),
    };

    let definition = DIRECTIVE_REGISTRY.iter().find(|d| {
        if is_long {
            d.name == name
        } else {
            d.short == Some(name)
        }
    })?;

    // Flags never carry a value; `--local=x` is left for the command parser.
    if !definition.takes_value && inline_value.is_some() {
        return None;
    }

    Some(DirectiveMatch {
        definition,
        inline_value,
    })
}

/// Scans raw argv for global directives and the alias / site-spec token,
/// without a full argument parsing library.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArgsPreprocessor;

impl ArgsPreprocessor {
    /// Creates a preprocessor.
    pub fn new() -> Self {
        Self
    }

    /// Does this token name a site: `@alias`, `#uri` or `user@host/path#uri`?
    ///
    /// Only tokens that match the alias or site-spec grammar count. A `#uri`
    /// part is limited to letters, digits, `_` and `-`, so `#foo!` or
    /// `#example.com` is not a site and is left for the command as an
    /// ordinary argument.
    pub fn is_alias_or_site_spec(token: &str) -> bool {
        SiteAliasName::is_alias_name(token) || SiteSpecParser::valid_site_spec(token)
    }

    /// Fills `out` from `argv`.
    ///
    /// # Logic:
    /// - `argv[0]` is the program name. It is never consumed and stays at the
    ///   front of `args`.
    /// - `argv[1]` is taken as the alias when it looks like one. No other
    ///   position is eligible, so `rsync @from @to` keeps both aliases.
    /// - Registered directives are consumed in both `--name value` and
    ///   `--name=value` form. A value-taking directive with no value left is
    ///   passed through.
    /// - `--` stops scanning; it and everything after it pass through.
    /// - Everything else lands in `args`, in original order.
    pub fn parse<S: AsRef<str>>(&self, argv: &[S], out: &mut PreflightArgs) {
        let mut tokens = argv.iter().map(AsRef::as_ref).enumerate();

        if let Some((_, program)) = tokens.next() {
            out.args.push(program.to_string());
        }

        while let Some((position, token)) = tokens.next() {
            if position == 1 && Self::is_alias_or_site_spec(token) {
                log::trace!("Consumed '{}' as the site alias", token);
                out.alias = Some(token.to_string());
                continue;
            }

            if token == END_OF_OPTIONS {
                out.args.push(token.to_string());
                out.args.extend(tokens.by_ref().map(|(_, t)| t.to_string()));
                break;
            }

            let Some(found) = match_directive(token) else {
                out.args.push(token.to_string());
                continue;
            };

            let definition = found.definition;
            if !definition.takes_value {
                log::trace!("Consumed flag '{}'", token);
                (definition.apply)(out, String::new());
                continue;
            }

            let value = match found.inline_value {
                Some(inline) => Some(inline.to_string()),
                None => tokens.next().map(|(_, next)| next.to_string()),
            };

            match value {
                Some(value) => {
                    log::trace!("Consumed directive '{}' = '{}'", definition.name, value);
                    (definition.apply)(out, value);
                }
                None => {
                    log::debug!(
                        "Directive '{}' has no value; passing it through",
                        token
                    );
                    out.args.push(token.to_string());
                }
            }
        }
    }

    /// Convenience wrapper returning a fresh `PreflightArgs`.
    pub fn parse_argv<S: AsRef<str>>(&self, argv: &[S]) -> PreflightArgs {
        let mut out = PreflightArgs::new();
        self.parse(argv, &mut out);
        out
    }
}
