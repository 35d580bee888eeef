//! XCFrameworks shipped in the SDK's release archive.

use pinledger_schema::{PreReleaseIdentifier, SemVer};

use super::{ArtifactRule, RuleTable};

/// `DatadogCrashReporting` and its `CrashReporter` dependency.
const CRASH_REPORTING_INTRODUCED: SemVer = SemVer::new(1, 7, 0);
/// First release that depends on Kronos.
const KRONOS_INTRODUCED: SemVer = SemVer::new(1, 5, 0);
/// Earliest 1.9.0 tag; no 1.9.0 pre-release ships Kronos either.
const KRONOS_REMOVED: SemVer = SemVer::new(1, 9, 0).with_pre_release(PreReleaseIdentifier::Alpha, 0);
/// First release with tvOS slices.
const TVOS_INTRODUCED: SemVer = SemVer::new(1, 10, 0);

impl RuleTable {
    /// Rules for the SDK's GitHub release archive.
    pub fn sdk() -> Self {
        Self::new(vec![
            ArtifactRule::new("Datadog.xcframework")
                .require([
                    "ios-arm64",
                    "ios-arm64/BCSymbolMaps/*.bcsymbolmap",
                    "ios-arm64/dSYMs/*.dSYM",
                    "ios-arm64/**/arm64.swiftinterface",
                    "ios-arm64/**/arm64-apple-ios.swiftinterface",
                    "ios-arm64_x86_64-simulator",
                    "ios-arm64_x86_64-simulator/dSYMs/*.dSYM",
                    "ios-arm64_x86_64-simulator/**/arm64.swiftinterface",
                    "ios-arm64_x86_64-simulator/**/arm64-apple-ios-simulator.swiftinterface",
                    "ios-arm64_x86_64-simulator/**/x86_64.swiftinterface",
                    "ios-arm64_x86_64-simulator/**/x86_64-apple-ios-simulator.swiftinterface",
                ])
                .require_since(TVOS_INTRODUCED, tvos_slices()),
            ArtifactRule::new("DatadogObjc.xcframework")
                .require([
                    "ios-arm64",
                    "ios-arm64/BCSymbolMaps/*.bcsymbolmap",
                    "ios-arm64/dSYMs/*.dSYM",
                    "ios-arm64/**/arm64.swiftinterface",
                    "ios-arm64/**/arm64-apple-ios.swiftinterface",
                    "ios-arm64_x86_64-simulator",
                    "ios-arm64_x86_64-simulator/**/arm64.swiftinterface",
                    "ios-arm64_x86_64-simulator/**/arm64-apple-ios-simulator.swiftinterface",
                    "ios-arm64_x86_64-simulator/**/x86_64.swiftinterface",
                    "ios-arm64_x86_64-simulator/**/x86_64-apple-ios-simulator.swiftinterface",
                ])
                .require_since(TVOS_INTRODUCED, tvos_slices()),
            ArtifactRule::new("DatadogCrashReporting.xcframework")
                .introduced_at(CRASH_REPORTING_INTRODUCED)
                .require([
                    "ios-arm64",
                    "ios-arm64/BCSymbolMaps/*.bcsymbolmap",
                    "ios-arm64/**/arm64.swiftinterface",
                    "ios-arm64/**/arm64-apple-ios.swiftinterface",
                    "ios-arm64_x86_64-simulator",
                    "ios-arm64_x86_64-simulator/dSYMs/*.dSYM",
                    "ios-arm64_x86_64-simulator/**/x86_64.swiftinterface",
                    "ios-arm64_x86_64-simulator/**/x86_64-apple-ios-simulator.swiftinterface",
                ])
                .require_since(TVOS_INTRODUCED, ["tvos-arm64", "tvos-arm64_x86_64-simulator"]),
            ArtifactRule::new("CrashReporter.xcframework")
                .introduced_at(CRASH_REPORTING_INTRODUCED)
                .require(["ios-arm64_arm64e_armv7_armv7s", "ios-arm64_i386_x86_64-simulator"])
                .require_since(TVOS_INTRODUCED, ["tvos-arm64", "tvos-arm64_x86_64-simulator"]),
            ArtifactRule::new("Kronos.xcframework")
                .introduced_at(KRONOS_INTRODUCED)
                .removed_at(KRONOS_REMOVED)
                .require([
                    "ios-arm64_armv7",
                    "ios-arm64_armv7/BCSymbolMaps/*.bcsymbolmap",
                    "ios-arm64_armv7/dSYMs/*.dSYM",
                    "ios-arm64_armv7/**/arm.swiftinterface",
                    "ios-arm64_armv7/**/arm64-apple-ios.swiftinterface",
                    "ios-arm64_armv7/**/arm64.swiftinterface",
                    "ios-arm64_armv7/**/armv7-apple-ios.swiftinterface",
                    "ios-arm64_armv7/**/armv7.swiftinterface",
                    "ios-arm64_i386_x86_64-simulator",
                    "ios-arm64_i386_x86_64-simulator/dSYMs/*.dSYM",
                    "ios-arm64_i386_x86_64-simulator/**/arm64-apple-ios-simulator.swiftinterface",
                    "ios-arm64_i386_x86_64-simulator/**/i386-apple-ios-simulator.swiftinterface",
                    "ios-arm64_i386_x86_64-simulator/**/x86_64-apple-ios-simulator.swiftinterface",
                    "ios-arm64_i386_x86_64-simulator/**/x86_64.swiftinterface",
                ]),
        ])
    }
}

fn tvos_slices() -> [&'static str; 8] {
    [
        "tvos-arm64",
        "tvos-arm64/**/arm64.swiftinterface",
        "tvos-arm64/**/arm64-apple-tvos.swiftinterface",
        "tvos-arm64_x86_64-simulator",
        "tvos-arm64_x86_64-simulator/**/arm64.swiftinterface",
        "tvos-arm64_x86_64-simulator/**/arm64-apple-tvos-simulator.swiftinterface",
        "tvos-arm64_x86_64-simulator/**/x86_64.swiftinterface",
        "tvos-arm64_x86_64-simulator/**/x86_64-apple-tvos-simulator.swiftinterface",
    ]
}

#[cfg(test)]
mod tests {
    use super::super::{ArtifactError, DirectoryListing};
    use super::*;

    fn v(s: &str) -> SemVer {
        SemVer::parse(s).unwrap()
    }

    /// Concrete paths satisfying every pattern the table expects for `release`.
    fn complete_archive(release: &SemVer) -> DirectoryListing {
        let table = RuleTable::sdk();
        let mut paths = Vec::new();
        for rule in table.rules().iter().filter(|r| r.applies_to(release)) {
            for pattern in rule.expected_patterns(release) {
                let concrete = pattern.replace("**", "Module.swiftmodule").replace('*', "Binary");
                paths.push(format!("{}/{concrete}", rule.name()));
            }
        }
        DirectoryListing::from_paths(paths)
    }

    fn names(release: &str) -> Vec<String> {
        RuleTable::sdk().expected_artifacts(&v(release)).into_iter().collect()
    }

    #[test]
    fn test_expected_artifacts_per_release() {
        assert_eq!(names("1.4.0"), ["Datadog.xcframework", "DatadogObjc.xcframework"]);
        assert_eq!(
            names("1.6.9"),
            ["Datadog.xcframework", "DatadogObjc.xcframework", "Kronos.xcframework"]
        );
        assert_eq!(names("1.7.0").len(), 5);
        assert!(names("1.8.99").contains(&"Kronos.xcframework".to_string()));
        assert!(!names("1.9.0").contains(&"Kronos.xcframework".to_string()));
        assert_eq!(names("1.9.0").len(), 4);
    }

    #[test]
    fn test_complete_archives_validate() {
        for release in ["1.4.0", "1.5.0", "1.7.0", "1.8.0", "1.9.0", "1.10.0", "2.0.0-rc1"] {
            let release = v(release);
            let archive = complete_archive(&release);
            let validated = RuleTable::sdk().validate_archive(&archive, &release).unwrap();
            assert_eq!(validated, RuleTable::sdk().expected_artifacts(&release));
        }
    }

    #[test]
    fn test_tvos_slices_required_from_1_10() {
        let archive = complete_archive(&v("1.9.0"));
        let err = RuleTable::sdk().validate(&archive, &v("1.10.0")).unwrap_err();
        match err {
            ArtifactError::MissingArtifactFile { artifact, pattern } => {
                assert_eq!(artifact, "Datadog.xcframework");
                assert_eq!(pattern, "tvos-arm64");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_kronos_dropped_in_1_9_pre_releases() {
        for release in ["1.9.0-alpha1", "1.9.0-beta2", "1.9.0-rc1", "1.9.1"] {
            assert!(
                !names(release).contains(&"Kronos.xcframework".to_string()),
                "{release} should not expect Kronos"
            );
        }
    }

    #[test]
    fn test_leftover_kronos_fails_after_removal() {
        let mut paths: Vec<String> = complete_archive(&v("1.9.0")).entries().map(str::to_string).collect();
        paths.push("Kronos.xcframework/ios-arm64_armv7".to_string());
        let archive = DirectoryListing::from_paths(paths);
        assert!(matches!(
            RuleTable::sdk().validate_archive(&archive, &v("1.9.0")),
            Err(ArtifactError::ArtifactCountMismatch { expected: 4, found: 5, .. })
        ));
    }
}
