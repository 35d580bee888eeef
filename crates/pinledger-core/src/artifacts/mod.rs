//! Version-gated content rules for release archives.
//!
//! A release archive is a flat set of `.xcframework` bundles. Which bundles
//! must be present, and which files each must contain, depends on the
//! release being validated: artifacts appear in some release and may be
//! dropped in a later one. [`RuleTable::validate_archive`] checks both the
//! expected content and that nothing else is shipped.
//!
//! ```no_run
//! use pinledger_core::artifacts::{DirectoryListing, RuleTable};
//! use pinledger_schema::SemVer;
//!
//! let listing = DirectoryListing::scan("Carthage/Build")?;
//! let release = SemVer::parse("1.7.0")?;
//! let shipped = RuleTable::sdk().validate_archive(&listing, &release)?;
//! assert!(shipped.contains("CrashReporter.xcframework"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod listing;
mod sdk;

use std::collections::BTreeSet;
use std::path::PathBuf;

use glob::Pattern;
use pinledger_schema::SemVer;
use thiserror::Error;

pub use listing::DirectoryListing;

/// Errors raised while validating a release archive.
#[derive(Error, Debug)]
pub enum ArtifactError {
    /// An expected artifact, or a file inside it, is absent.
    #[error("{artifact}: no entry matches '{pattern}'")]
    MissingArtifactFile {
        /// Artifact bundle name, e.g. `Datadog.xcframework`.
        artifact: String,
        /// Pattern relative to the bundle, or the bundle name itself.
        pattern: String,
    },

    /// The archive root holds more or fewer entries than expected.
    #[error(
        "Expected {expected} artifacts but found {found}: {}",
        entries.join(", ")
    )]
    ArtifactCountMismatch {
        /// Number of artifacts the rule table expects for the release.
        expected: usize,
        /// Number of top-level entries actually present.
        found: usize,
        /// The top-level entries actually present.
        entries: Vec<String>,
    },

    /// A rule contains a malformed glob.
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending pattern, prefixed with its artifact name.
        pattern: String,
        /// Glob syntax error.
        #[source]
        source: glob::PatternError,
    },

    /// The archive directory could not be listed.
    #[error("Failed to scan {}: {source}", root.display())]
    Scan {
        /// Directory being listed.
        root: PathBuf,
        /// Underlying error.
        #[source]
        source: walkdir::Error,
    },
}

/// Patterns that apply from `since` onward, or always when `since` is `None`.
#[derive(Debug, Clone)]
struct PatternGroup {
    since: Option<SemVer>,
    patterns: Vec<String>,
}

/// Expected content of one artifact bundle.
///
/// The rule applies to releases in `[introduced_at, removed_at)`; an unset
/// bound is open. Patterns are globs relative to the bundle where `*` stays
/// within one path component and `**` spans any number of them.
#[derive(Debug, Clone)]
pub struct ArtifactRule {
    name: String,
    introduced_at: Option<SemVer>,
    removed_at: Option<SemVer>,
    groups: Vec<PatternGroup>,
}

impl ArtifactRule {
    /// A rule for the bundle `name` that applies to every release.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            introduced_at: None,
            removed_at: None,
            groups: Vec::new(),
        }
    }

    /// First release that ships this artifact.
    pub fn introduced_at(mut self, release: SemVer) -> Self {
        self.introduced_at = Some(release);
        self
    }

    /// First release that no longer ships this artifact.
    pub fn removed_at(mut self, release: SemVer) -> Self {
        self.removed_at = Some(release);
        self
    }

    /// Patterns required in every release the rule applies to.
    pub fn require<I, S>(self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group(None, patterns)
    }

    /// Patterns required from `release` onward.
    pub fn require_since<I, S>(self, release: SemVer, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group(Some(release), patterns)
    }

    fn group<I, S>(mut self, since: Option<SemVer>, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.push(PatternGroup {
            since,
            patterns: patterns.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Bundle name, e.g. `Datadog.xcframework`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `release` ships this artifact.
    pub fn applies_to(&self, release: &SemVer) -> bool {
        self.introduced_at.as_ref().is_none_or(|v| release >= v)
            && self.removed_at.as_ref().is_none_or(|v| release < v)
    }

    /// Patterns in effect for `release`, in declaration order.
    pub fn expected_patterns(&self, release: &SemVer) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .filter(move |g| g.since.as_ref().is_none_or(|v| release >= v))
            .flat_map(|g| g.patterns.iter().map(String::as_str))
    }

    /// Check that the bundle exists in `listing` and contains every pattern
    /// in effect for `release`.
    ///
    /// # Errors
    ///
    /// [`ArtifactError::MissingArtifactFile`] for the first unmatched pattern,
    /// or [`ArtifactError::InvalidPattern`].
    pub fn check(&self, listing: &DirectoryListing, release: &SemVer) -> Result<(), ArtifactError> {
        if !listing.contains(&self.name) {
            return Err(ArtifactError::MissingArtifactFile {
                artifact: self.name.clone(),
                pattern: self.name.clone(),
            });
        }

        let prefix = Pattern::escape(&self.name);
        for pattern in self.expected_patterns(release) {
            let full = format!("{prefix}/{pattern}");
            let compiled = Pattern::new(&full).map_err(|source| ArtifactError::InvalidPattern {
                pattern: full.clone(),
                source,
            })?;
            if !listing.contains_match(&compiled) {
                return Err(ArtifactError::MissingArtifactFile {
                    artifact: self.name.clone(),
                    pattern: pattern.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Ordered list of artifact rules.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<ArtifactRule>,
}

impl RuleTable {
    /// A table evaluated in the given order.
    pub fn new(rules: Vec<ArtifactRule>) -> Self {
        Self { rules }
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[ArtifactRule] {
        &self.rules
    }

    /// Names of the artifacts `release` is expected to ship.
    pub fn expected_artifacts(&self, release: &SemVer) -> BTreeSet<String> {
        self.rules
            .iter()
            .filter(|r| r.applies_to(release))
            .map(|r| r.name.clone())
            .collect()
    }

    /// Check every rule that applies to `release` and return the names of
    /// the validated artifacts.
    ///
    /// # Errors
    ///
    /// The first failing rule's error, in table order.
    pub fn validate(
        &self,
        listing: &DirectoryListing,
        release: &SemVer,
    ) -> Result<BTreeSet<String>, ArtifactError> {
        let mut validated = BTreeSet::new();
        for rule in &self.rules {
            if rule.applies_to(release) {
                rule.check(listing, release)?;
                tracing::info!("{} - OK", rule.name);
                validated.insert(rule.name.clone());
            } else {
                tracing::debug!("{} - SKIPPING for {release}", rule.name);
            }
        }
        Ok(validated)
    }

    /// [`validate`](Self::validate), then require that the archive root
    /// contains nothing but the validated artifacts.
    ///
    /// # Errors
    ///
    /// As [`validate`](Self::validate), plus
    /// [`ArtifactError::ArtifactCountMismatch`].
    pub fn validate_archive(
        &self,
        listing: &DirectoryListing,
        release: &SemVer,
    ) -> Result<BTreeSet<String>, ArtifactError> {
        let validated = self.validate(listing, release)?;
        listing.assert_entry_count(validated.len())?;
        tracing::info!("Archive content is correct for {release}");
        Ok(validated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> SemVer {
        SemVer::parse(s).unwrap()
    }

    fn windowed_table() -> RuleTable {
        RuleTable::new(vec![
            ArtifactRule::new("Core.xcframework").require(["ios-arm64", "ios-arm64/dSYMs/*.dSYM"]),
            ArtifactRule::new("Extra.xcframework")
                .introduced_at(v("1.7.0"))
                .removed_at(v("2.0.0"))
                .require(["ios-arm64"]),
        ])
    }

    fn listing(paths: &[&str]) -> DirectoryListing {
        DirectoryListing::from_paths(paths.iter().copied())
    }

    #[test]
    fn test_rule_window_is_half_open() {
        let table = windowed_table();
        let rule = &table.rules()[1];
        assert!(!rule.applies_to(&v("1.6.9")));
        assert!(!rule.applies_to(&v("1.7.0-rc1")));
        assert!(rule.applies_to(&v("1.7.0")));
        assert!(rule.applies_to(&v("1.99.0")));
        assert!(rule.applies_to(&v("2.0.0-beta1")));
        assert!(!rule.applies_to(&v("2.0.0")));
    }

    #[test]
    fn test_validate_skips_rules_outside_window() {
        let table = windowed_table();
        let core_only = listing(&["Core.xcframework/ios-arm64/dSYMs/Core.framework.dSYM"]);

        let validated = table.validate_archive(&core_only, &v("1.6.9")).unwrap();
        assert_eq!(validated.into_iter().collect::<Vec<_>>(), ["Core.xcframework"]);

        let err = table.validate(&core_only, &v("1.7.0")).unwrap_err();
        assert!(matches!(
            err,
            ArtifactError::MissingArtifactFile { ref artifact, ref pattern }
                if artifact == "Extra.xcframework" && pattern == "Extra.xcframework"
        ));

        let both = listing(&[
            "Core.xcframework/ios-arm64/dSYMs/Core.framework.dSYM",
            "Extra.xcframework/ios-arm64/Extra.framework/Extra",
        ]);
        assert_eq!(table.validate_archive(&both, &v("1.7.0")).unwrap().len(), 2);
        assert_eq!(
            table.expected_artifacts(&v("2.0.0")).into_iter().collect::<Vec<_>>(),
            ["Core.xcframework"]
        );
    }

    #[test]
    fn test_first_missing_pattern_is_reported() {
        let table = windowed_table();
        let err = table
            .validate(&listing(&["Core.xcframework/ios-arm64/Core.framework/Core"]), &v("1.0"))
            .unwrap_err();
        match err {
            ArtifactError::MissingArtifactFile { artifact, pattern } => {
                assert_eq!(artifact, "Core.xcframework");
                assert_eq!(pattern, "ios-arm64/dSYMs/*.dSYM");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_stray_entries_fail_closed_world_check() {
        let table = windowed_table();
        let archive = listing(&[
            "Core.xcframework/ios-arm64/dSYMs/Core.framework.dSYM",
            "Extra.xcframework/ios-arm64",
        ]);
        // Extra ships in 1.6.0 although no rule expects it there.
        assert!(table.validate(&archive, &v("1.6.0")).is_ok());
        let err = table.validate_archive(&archive, &v("1.6.0")).unwrap_err();
        match err {
            ArtifactError::ArtifactCountMismatch {
                expected,
                found,
                entries,
            } => {
                assert_eq!((expected, found), (1, 2));
                assert_eq!(entries, ["Core.xcframework", "Extra.xcframework"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_pattern_groups_gate_on_since() {
        let rule = ArtifactRule::new("A.xcframework")
            .require(["ios-arm64"])
            .require_since(v("1.10.0"), ["tvos-arm64"]);
        let ios_only = listing(&["A.xcframework/ios-arm64"]);

        assert!(rule.check(&ios_only, &v("1.9.0")).is_ok());
        assert_eq!(rule.expected_patterns(&v("1.10.0")).collect::<Vec<_>>(), ["ios-arm64", "tvos-arm64"]);
        assert!(matches!(
            rule.check(&ios_only, &v("1.10.0")),
            Err(ArtifactError::MissingArtifactFile { pattern, .. }) if pattern == "tvos-arm64"
        ));
    }

    #[test]
    fn test_invalid_pattern() {
        let rule = ArtifactRule::new("A.xcframework").require(["ios-[arm64"]);
        let err = rule
            .check(&listing(&["A.xcframework/ios-arm64"]), &v("1.0.0"))
            .unwrap_err();
        assert!(matches!(
            err,
            ArtifactError::InvalidPattern { ref pattern, .. } if pattern == "A.xcframework/ios-[arm64"
        ));
    }

    #[test]
    fn test_artifact_names_are_matched_literally() {
        let rule = ArtifactRule::new("A[1].xcframework").require(["ios-arm64"]);
        assert!(rule.check(&listing(&["A[1].xcframework/ios-arm64"]), &v("1.0")).is_ok());
    }
}
