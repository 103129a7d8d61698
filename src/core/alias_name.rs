// src/core/alias_name.rs

use crate::constants::SELF_SITENAME;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

lazy_static! {
    // `@site.env` or `@name`. Exactly one optional dot, no empty halves.
    static ref ALIAS_NAME_RE: Regex =
        Regex::new(r"^@([a-zA-Z0-9_-]+)(?:\.([a-zA-Z0-9_-]+))?$").unwrap();
}

/// The parsed identity of a short alias token (`@site.env`, `@env`).
///
/// Parsing never fails: a token outside the grammar produces a name where
/// both `has_sitename()` and `has_env()` are false.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteAliasName {
    sitename: Option<String>,
    env: Option<String>,
}

impl SiteAliasName {
    /// Parses an alias token.
    ///
    /// # Logic:
    /// - `@site.env` sets both parts.
    /// - `@name` is read as an environment on the implicit `self` site, so
    ///   `@simple` prints as `@self.simple`. The literal `@self` is the one
    ///   exception and names the current site itself.
    /// - Anything else yields an empty name.
    pub fn parse(token: &str) -> Self {
        let Some(caps) = ALIAS_NAME_RE.captures(token) else {
            log::trace!("'{}' is not an alias name", token);
            return Self::default();
        };

        let first = caps.get(1).map(|m| m.as_str().to_string());
        match caps.get(2) {
            Some(env) => Self {
                sitename: first,
                env: Some(env.as_str().to_string()),
            },
            None if first.as_deref() == Some(SELF_SITENAME) => Self {
                sitename: first,
                env: None,
            },
            None => Self {
                sitename: None,
                env: first,
            },
        }
    }

    /// Cheap check used by the preprocessor: does the token use alias syntax at all?
    pub fn is_alias_name(token: &str) -> bool {
        token.starts_with('@')
    }

    /// Whether an explicit site name was given.
    pub fn has_sitename(&self) -> bool {
        self.sitename.is_some()
    }

    /// Whether an environment name was given (or implied by `@name`).
    pub fn has_env(&self) -> bool {
        self.env.is_some()
    }

    /// The site name, if any.
    pub fn sitename(&self) -> Option<&str> {
        self.sitename.as_deref()
    }

    /// The environment name, if any.
    pub fn env(&self) -> Option<&str> {
        self.env.as_deref()
    }

    /// True when the token matched the grammar.
    pub fn is_valid(&self) -> bool {
        self.has_sitename() || self.has_env()
    }

    /// Whether this name refers to the current site.
    pub fn is_self(&self) -> bool {
        self.sitename.as_deref() == Some(SELF_SITENAME)
    }
}

impl fmt::Display for SiteAliasName {
    /// Canonical form: `@<sitename|self>.<env>`, `@<sitename>` without an
    /// environment, and the empty string for an invalid name.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.sitename, &self.env) {
            (site, Some(env)) => write!(
                f,
                "@{}.{}",
                site.as_deref().unwrap_or(SELF_SITENAME),
                env
            ),
            (Some(site), None) => write!(f, "@{}", site),
            (None, None) => Ok(()),
        }
    }
}
