// src/core/site_spec.rs

use crate::{
    constants::{DEFAULT_URI, MULTISITE_DIR},
    models::SiteSpec,
};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::path::Path;

/// Which capture group feeds which field of a `SiteSpec`.
struct SpecPattern {
    re: Regex,
    user: Option<usize>,
    host: Option<usize>,
    root: Option<usize>,
    uri: Option<usize>,
}

impl SpecPattern {
    fn new(
        pattern: &str,
        user: Option<usize>,
        host: Option<usize>,
        root: Option<usize>,
        uri: Option<usize>,
    ) -> Self {
        Self {
            re: Regex::new(pattern).unwrap(),
            user,
            host,
            root,
            uri,
        }
    }
}

const PATH: &str = r"(/[^#]*)";
const USER: &str = r"([a-zA-Z0-9._-]+)";
const SERVER: &str = r"([a-zA-Z0-9._-]+)";
const URI: &str = r"([a-zA-Z0-9_-]+)";

lazy_static! {
    // Ordered: the first matching pattern decides the fields.
    static ref SPEC_PATTERNS: Vec<SpecPattern> = vec![
        // /path/to/drupal#uri
        SpecPattern::new(&format!("^{PATH}#{URI}$"), None, None, Some(1), Some(2)),
        // user@server/path/to/drupal#uri
        SpecPattern::new(&format!("^{USER}@{SERVER}{PATH}#{URI}$"), Some(1), Some(2), Some(3), Some(4)),
        // user@server/path/to/drupal
        SpecPattern::new(&format!("^{USER}@{SERVER}{PATH}$"), Some(1), Some(2), Some(3), None),
        // user@server#uri
        SpecPattern::new(&format!("^{USER}@{SERVER}#{URI}$"), Some(1), Some(2), None, Some(3)),
        // user@server
        SpecPattern::new(&format!("^{USER}@{SERVER}$"), Some(1), Some(2), None, None),
        // #uri
        SpecPattern::new(&format!("^#{URI}$"), None, None, None, Some(1)),
    ];
}

/// Decides whether a local root actually serves a multisite URI.
pub trait MultisiteProbe {
    /// Returns true when `root` exists and hosts the site identified by `uri`.
    fn serves_uri(&self, root: &Path, uri: &str) -> bool;
}

/// The default probe: `<root>/sites/<uri>` must be a directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilesystemProbe;

impl MultisiteProbe for FilesystemProbe {
    fn serves_uri(&self, root: &Path, uri: &str) -> bool {
        root.is_dir() && root.join(MULTISITE_DIR).join(uri).is_dir()
    }
}

impl<F> MultisiteProbe for F
where
    F: Fn(&Path, &str) -> bool,
{
    fn serves_uri(&self, root: &Path, uri: &str) -> bool {
        self(root, uri)
    }
}

/// The outcome of parsing a site specification.
///
/// `Malformed` and `Unresolved` are both "no site", but callers treat them
/// differently: a malformed token may be a plain argument, an unresolved one
/// was clearly meant as a site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecResolution {
    /// The token does not follow the site specification grammar.
    Malformed,
    /// Well-formed, but no local multisite serves it.
    Unresolved,
    /// A usable site.
    Resolved(SiteSpec),
}

impl SpecResolution {
    /// The resolved spec, if any.
    pub fn into_spec(self) -> Option<SiteSpec> {
        match self {
            Self::Resolved(spec) => Some(spec),
            Self::Malformed | Self::Unresolved => None,
        }
    }

    /// Whether the token failed the grammar.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed)
    }
}

/// Parses and validates long-form site specifications (`[user@]host[/path][#uri]`).
#[derive(Debug, Clone, Default)]
pub struct SiteSpecParser<P = FilesystemProbe> {
    probe: P,
}

impl SiteSpecParser<FilesystemProbe> {
    /// A parser that checks local multisites on the real filesystem.
    pub fn new() -> Self {
        Self {
            probe: FilesystemProbe,
        }
    }

    /// Syntax-only check. Never touches the filesystem.
    pub fn valid_site_spec(spec: &str) -> bool {
        SPEC_PATTERNS.iter().any(|p| p.re.is_match(spec))
    }
}

impl<P: MultisiteProbe> SiteSpecParser<P> {
    /// A parser using a caller-supplied multisite check.
    pub fn with_probe(probe: P) -> Self {
        Self { probe }
    }

    /// Parses `spec`, resolving `#uri`-only specs against `default_root`.
    ///
    /// Remote specs (those naming a host) are returned as parsed. Local specs
    /// are kept only when the probe confirms the root serves the URI.
    pub fn parse(&self, spec: &str, default_root: Option<&Path>) -> SpecResolution {
        let Some((pattern, caps)) = SPEC_PATTERNS
            .iter()
            .find_map(|p| p.re.captures(spec).map(|c| (p, c)))
        else {
            log::debug!("'{}' is not a valid site specification", spec);
            return SpecResolution::Malformed;
        };

        let group = |idx: Option<usize>, caps: &Captures<'_>| {
            idx.and_then(|i| caps.get(i)).map(|m| m.as_str().to_string())
        };

        let mut result = SiteSpec {
            user: group(pattern.user, &caps),
            host: group(pattern.host, &caps),
            root: group(pattern.root, &caps),
            uri: group(pattern.uri, &caps).unwrap_or_else(|| DEFAULT_URI.to_string()),
        };

        if result.host.is_some() {
            return SpecResolution::Resolved(result);
        }

        if result.root.is_none() {
            match default_root {
                Some(root) => result.root = Some(root.display().to_string()),
                None => {
                    log::debug!("'{}' needs a default root, but none is known", spec);
                    return SpecResolution::Unresolved;
                }
            }
        }

        let serves = result
            .root
            .as_deref()
            .is_some_and(|root| self.probe.serves_uri(Path::new(root), &result.uri));
        if serves {
            SpecResolution::Resolved(result)
        } else {
            log::debug!(
                "Root {:?} does not serve multisite '{}'",
                result.root,
                result.uri
            );
            SpecResolution::Unresolved
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn always(_: &Path, _: &str) -> bool {
        true
    }

    fn never(_: &Path, _: &str) -> bool {
        false
    }

    #[test]
    fn test_valid_site_specs() {
        for spec in [
            "/path/to/drupal#uri",
            "user@server/path/to/drupal#uri",
            "user@server/path/to/drupal",
            "user@server#uri",
            "#uri",
        ] {
            assert!(SiteSpecParser::valid_site_spec(spec), "{}", spec);
        }
    }

    #[test]
    fn test_invalid_site_specs() {
        for spec in [
            "uri",
            "@/#",
            "user@#uri",
            "@server/path/to/drupal#uri",
            "/path/to/drupal#",
            "/path/to/drupal#uri#",
            "/path/to/drupal##uri",
            "#uri!",
            "user@server/path/to/drupal#uri!",
            "user#server/path/to/drupal",
            "user@",
        ] {
            assert!(!SiteSpecParser::valid_site_spec(spec), "{}", spec);
        }
    }

    #[test]
    fn test_parse_remote_spec_with_uri() {
        let parser = SiteSpecParser::with_probe(never);
        let spec = parser
            .parse("user@server/path#somemultisite", Some(Path::new("/root")))
            .into_spec()
            .unwrap();
        assert_eq!(spec.user.as_deref(), Some("user"));
        assert_eq!(spec.host.as_deref(), Some("server"));
        assert_eq!(spec.root.as_deref(), Some("/path"));
        assert_eq!(spec.uri, "somemultisite");
    }

    #[test]
    fn test_parse_remote_spec_defaults_uri() {
        let parser = SiteSpecParser::with_probe(never);
        let spec = parser
            .parse("user@server/path", None)
            .into_spec()
            .unwrap();
        assert_eq!(spec.root.as_deref(), Some("/path"));
        assert_eq!(spec.uri, "default");
    }

    #[test]
    fn test_host_only_spec_has_no_root() {
        let parser = SiteSpecParser::with_probe(never);
        let spec = parser.parse("user@server", None).into_spec().unwrap();
        assert!(spec.root.is_none());
        assert_eq!(spec.uri, "default");
        assert!(spec.to_record().get("root").is_none());
    }

    #[test]
    fn test_malformed_is_distinct_from_unresolved() {
        let parser = SiteSpecParser::with_probe(never);
        assert_eq!(parser.parse("user@#uri", None), SpecResolution::Malformed);
        assert_eq!(
            parser.parse("#dev", Some(Path::new("/nowhere"))),
            SpecResolution::Unresolved
        );
        assert_eq!(parser.parse("#dev", None), SpecResolution::Unresolved);
    }

    #[test]
    fn test_uri_only_uses_default_root_when_probe_agrees() {
        let parser = SiteSpecParser::with_probe(always);
        let spec = parser
            .parse("#dev", Some(Path::new("/var/www/drupal")))
            .into_spec()
            .unwrap();
        assert_eq!(spec.root.as_deref(), Some("/var/www/drupal"));
        assert_eq!(spec.uri, "dev");
        assert!(spec.host.is_none());
    }

    #[test]
    fn test_filesystem_probe_checks_multisite_directory() {
        // --- Setup ---
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("sites").join("dev")).unwrap();
        let parser = SiteSpecParser::new();

        // --- Execute & Assert ---
        let resolved = parser.parse("#dev", Some(dir.path()));
        assert!(matches!(resolved, SpecResolution::Resolved(_)));

        let missing = parser.parse("#staging", Some(dir.path()));
        assert_eq!(missing, SpecResolution::Unresolved);

        let local = format!("{}#dev", dir.path().display());
        assert!(matches!(parser.parse(&local, None), SpecResolution::Resolved(_)));
    }
}
