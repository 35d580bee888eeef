//! Recursive listing of an unpacked release archive.

use std::collections::BTreeSet;
use std::path::Path;

use glob::{MatchOptions, Pattern};
use walkdir::WalkDir;

use super::ArtifactError;

/// `*` never crosses a `/`; only `**` spans directories.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Every file and directory below an archive root, as `/`-separated paths
/// relative to that root.
///
/// Directories count as entries: `.xcframework` slices and `.dSYM` bundles
/// are directories, and rules match them by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryListing {
    entries: BTreeSet<String>,
}

impl DirectoryListing {
    /// Walk `root` recursively.
    ///
    /// # Errors
    ///
    /// [`ArtifactError::Scan`] if `root` or any entry below it cannot be read.
    pub fn scan(root: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let root = root.as_ref();
        let mut listing = Self::default();

        for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|source| ArtifactError::Scan {
                root: root.to_path_buf(),
                source,
            })?;
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let joined = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            listing.insert(&joined);
        }

        tracing::debug!("Listed {} entries under {}", listing.len(), root.display());
        Ok(listing)
    }

    /// Build a listing from relative paths, e.g. the output of `unzip -Z1`.
    ///
    /// Parent directories of every path are added implicitly.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut listing = Self::default();
        for path in paths {
            listing.insert(path.as_ref());
        }
        listing
    }

    fn insert(&mut self, path: &str) {
        let mut prefix = String::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);
            self.entries.insert(prefix.clone());
        }
    }

    /// Number of entries, at any depth.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the listing is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in lexical order.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Entries directly under the root.
    pub fn top_level_entries(&self) -> impl Iterator<Item = &str> {
        self.entries().filter(|e| !e.contains('/'))
    }

    /// Whether `path` is listed verbatim.
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains(path)
    }

    /// Whether any entry matches `pattern`.
    pub fn contains_match(&self, pattern: &Pattern) -> bool {
        self.entries().any(|e| pattern.matches_with(e, MATCH_OPTIONS))
    }

    /// Closed-world check: the root holds exactly `expected` entries.
    ///
    /// # Errors
    ///
    /// [`ArtifactError::ArtifactCountMismatch`] listing what was found.
    pub fn assert_entry_count(&self, expected: usize) -> Result<(), ArtifactError> {
        let entries: Vec<String> = self.top_level_entries().map(str::to_string).collect();
        if entries.len() == expected {
            return Ok(());
        }
        Err(ArtifactError::ArtifactCountMismatch {
            expected,
            found: entries.len(),
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_from_paths_adds_parents() {
        let listing = DirectoryListing::from_paths(["A.xcframework/ios-arm64/A.framework/A"]);
        let entries: Vec<_> = listing.entries().collect();
        assert_eq!(
            entries,
            [
                "A.xcframework",
                "A.xcframework/ios-arm64",
                "A.xcframework/ios-arm64/A.framework",
                "A.xcframework/ios-arm64/A.framework/A",
            ]
        );
        assert_eq!(listing.top_level_entries().collect::<Vec<_>>(), ["A.xcframework"]);
    }

    #[test]
    fn test_from_paths_normalizes_slashes() {
        let listing = DirectoryListing::from_paths(["/A//b/", "", "/"]);
        assert_eq!(listing.entries().collect::<Vec<_>>(), ["A", "A/b"]);
    }

    #[test]
    fn test_scan_matches_from_paths() {
        let dir = tempdir().unwrap();
        let slice = dir.path().join("A.xcframework/ios-arm64/dSYMs/A.framework.dSYM");
        fs::create_dir_all(&slice).unwrap();
        fs::write(dir.path().join("A.xcframework/Info.plist"), b"").unwrap();

        let scanned = DirectoryListing::scan(dir.path()).unwrap();
        let built = DirectoryListing::from_paths([
            "A.xcframework/Info.plist",
            "A.xcframework/ios-arm64/dSYMs/A.framework.dSYM",
        ]);
        assert_eq!(scanned, built);
    }

    #[test]
    fn test_scan_missing_root_fails() {
        let dir = tempdir().unwrap();
        let err = DirectoryListing::scan(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, ArtifactError::Scan { .. }));
    }

    #[test]
    fn test_star_does_not_cross_directories() {
        let listing = DirectoryListing::from_paths([
            "A.xcframework/ios-arm64/A.framework/Modules/A.swiftmodule/arm64.swiftinterface",
        ]);
        let shallow = Pattern::new("A.xcframework/ios-arm64/*.swiftinterface").unwrap();
        let deep = Pattern::new("A.xcframework/ios-arm64/**/arm64.swiftinterface").unwrap();
        assert!(!listing.contains_match(&shallow));
        assert!(listing.contains_match(&deep));
    }

    #[test]
    fn test_entry_count() {
        let listing = DirectoryListing::from_paths(["A.xcframework/x", "B.xcframework/y", "stray.txt"]);
        assert!(listing.assert_entry_count(3).is_ok());
        match listing.assert_entry_count(2).unwrap_err() {
            ArtifactError::ArtifactCountMismatch {
                expected,
                found,
                entries,
            } => {
                assert_eq!(expected, 2);
                assert_eq!(found, 3);
                assert_eq!(entries, ["A.xcframework", "B.xcframework", "stray.txt"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
