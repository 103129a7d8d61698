// src/core/paths.rs

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Expands a leading `~` in a user-supplied path against `home`.
///
/// Environment variables are deliberately not expanded: values come from the
/// command line, where the shell has already done that.
pub fn expand_user_path(raw: &str, home: Option<&Path>) -> PathBuf {
    let expanded = shellexpand::tilde_with_context(raw, || {
        home.map(|h| h.to_string_lossy().into_owned())
    });
    PathBuf::from(expanded.into_owned())
}

/// The identity used to de-duplicate paths: the canonical path when the file
/// exists, otherwise the path as given.
pub fn dedup_key(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Removes later duplicates (by `dedup_key`) while keeping first-seen order.
pub fn dedup_preserving_order(paths: impl IntoIterator<Item = PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter(|p| seen.insert(dedup_key(p)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_expand_user_path_with_home() {
        let home = Path::new("/home/tester");
        assert_eq!(
            expand_user_path("~/.drush/sites", Some(home)),
            PathBuf::from("/home/tester/.drush/sites")
        );
        assert_eq!(
            expand_user_path("/etc/drush", Some(home)),
            PathBuf::from("/etc/drush")
        );
    }

    #[test]
    fn test_expand_user_path_without_home_keeps_tilde() {
        assert_eq!(expand_user_path("~/x", None), PathBuf::from("~/x"));
    }

    #[test]
    fn test_dedup_collapses_equivalent_existing_paths() {
        // --- Setup ---
        let dir = TempDir::new().unwrap();
        let sites = dir.path().join("sites");
        fs::create_dir(&sites).unwrap();
        let dotted = dir.path().join("sites").join(".");

        // --- Execute ---
        let result = dedup_preserving_order(vec![
            sites.clone(),
            PathBuf::from("/does/not/exist"),
            dotted,
            PathBuf::from("/does/not/exist"),
        ]);

        // --- Assert ---
        assert_eq!(result, vec![sites, PathBuf::from("/does/not/exist")]);
    }
}
