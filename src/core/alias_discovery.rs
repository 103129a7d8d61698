// src/core/alias_discovery.rs

use crate::{
    constants::{
        ALIAS_SCAN_DEPTH, LEGACY_GROUP_ALIAS_SUFFIX, LEGACY_SINGLE_ALIAS_SUFFIX,
        SITE_ALIAS_SUFFIX,
    },
    core::paths,
};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A new-format alias file found by a scan, with the group it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredAliasFile {
    /// Full path of the `.site.yml` file.
    pub path: PathBuf,
    /// The subdirectory name when nested below a search location,
    /// otherwise the site name itself.
    pub group: String,
    /// The file name without `.site.yml`.
    pub sitename: String,
}

/// Finds alias definition files in an ordered list of search locations.
///
/// Locations are only ever added by the caller; nothing is inferred.
/// Locations that do not exist are skipped silently.
#[derive(Debug, Clone, Default)]
pub struct SiteAliasFileDiscovery {
    search_locations: Vec<PathBuf>,
}

impl SiteAliasFileDiscovery {
    /// Creates a discovery with no search locations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a search location. Earlier locations win ties.
    pub fn add_search_location(&mut self, location: impl Into<PathBuf>) -> &mut Self {
        self.search_locations.push(location.into());
        self
    }

    /// The search locations, in the order they are consulted.
    pub fn search_locations(&self) -> &[PathBuf] {
        &self.search_locations
    }

    /// Returns the first `<name>.site.yml` found at the top level of a search
    /// location, or `None` when no location has one.
    pub fn find_single_site_alias_file(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            log::debug!("'{}' cannot name an alias file", name);
            return None;
        }

        let file_name = format!("{}{}", name, SITE_ALIAS_SUFFIX);
        let found = self
            .search_locations
            .iter()
            .map(|dir| dir.join(&file_name))
            .find(|candidate| candidate.is_file());

        match &found {
            Some(path) => log::debug!("Alias '{}' found at {}", name, path.display()),
            None => log::debug!(
                "No '{}' in {} search location(s)",
                file_name,
                self.search_locations.len()
            ),
        }
        found
    }

    /// Every new-format alias file, in search-location order and sorted by
    /// path within a location. A file reachable from two locations is
    /// reported once, under the earlier one.
    pub fn find_all_single_alias_files(&self) -> Vec<DiscoveredAliasFile> {
        let mut found = Vec::new();
        for location in &self.search_locations {
            let mut in_location: Vec<DiscoveredAliasFile> =
                scan(location, |name| name.ends_with(SITE_ALIAS_SUFFIX))
                    .into_iter()
                    .filter_map(|path| describe_site_file(location, path))
                    .collect();
            in_location.sort_by(|a, b| a.path.cmp(&b.path));
            found.extend(in_location);
        }

        let mut seen = HashSet::new();
        found.retain(|f| seen.insert(paths::dedup_key(&f.path)));
        found
    }

    /// Every legacy alias file (`*.aliases.drushrc.php`, `*.alias.drushrc.php`)
    /// across all locations, de-duplicated by canonical path and sorted.
    pub fn find_all_legacy_alias_files(&self) -> Vec<PathBuf> {
        let mut by_canonical: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();
        for location in &self.search_locations {
            for path in scan(location, is_legacy_alias_file_name) {
                by_canonical.entry(paths::dedup_key(&path)).or_insert(path);
            }
        }
        by_canonical.into_values().collect()
    }
}

/// Whether a file name follows the legacy naming convention.
pub fn is_legacy_alias_file_name(name: &str) -> bool {
    name.ends_with(LEGACY_GROUP_ALIAS_SUFFIX) || name.ends_with(LEGACY_SINGLE_ALIAS_SUFFIX)
}

/// Lists regular files under `location` (up to `ALIAS_SCAN_DEPTH`) whose
/// name satisfies `accept`.
fn scan(location: &Path, accept: impl Fn(&str) -> bool) -> Vec<PathBuf> {
    if !location.is_dir() {
        log::debug!("Skipping missing search location {}", location.display());
        return Vec::new();
    }

    WalkDir::new(location)
        .min_depth(1)
        .max_depth(ALIAS_SCAN_DEPTH)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                log::warn!("Skipping unreadable entry under {}: {}", location.display(), err);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_str().is_some_and(&accept))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

fn describe_site_file(location: &Path, path: PathBuf) -> Option<DiscoveredAliasFile> {
    let file_name = path.file_name()?.to_str()?;
    let sitename = file_name.strip_suffix(SITE_ALIAS_SUFFIX)?.to_string();
    if sitename.is_empty() {
        return None;
    }

    let parent = path.parent()?;
    let group = if parent == location {
        sitename.clone()
    } else {
        parent.file_name()?.to_str()?.to_string()
    };

    Some(DiscoveredAliasFile {
        path,
        group,
        sitename,
    })
}
