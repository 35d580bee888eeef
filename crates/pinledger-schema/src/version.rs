//! Release versions as they appear in git tags.
//!
//! Accepted grammar: `MAJOR[.MINOR[.PATCH]][-<alpha|beta|rc><ITERATION>]`,
//! e.g. `1.7`, `1.7.1`, `2.0.0-beta3`. Missing components default to `0`.
//!
//! Unlike full SemVer, pre-releases are restricted to three ranked
//! identifiers and a numeric iteration, so `1.0.0-rc10` correctly sorts after
//! `1.0.0-rc9`.
//!
//! # Example
//!
//! ```
//! use pinledger_schema::SemVer;
//!
//! let rc = SemVer::parse("1.2.0-rc1").unwrap();
//! let release = SemVer::parse("1.2").unwrap();
//! assert!(rc.is_older_than(&release));
//! assert_eq!(release.to_string(), "1.2");
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error returned when a string is not a valid release version.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid version '{input}': {reason}")]
pub struct ParseError {
    /// The rejected input, verbatim.
    pub input: String,
    /// Why it was rejected.
    pub reason: &'static str,
}

impl ParseError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

/// Pre-release channel, ranked `Alpha < Beta < Rc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreReleaseIdentifier {
    /// `alpha`
    Alpha,
    /// `beta`
    Beta,
    /// `rc` (release candidate)
    Rc,
}

impl PreReleaseIdentifier {
    /// Tag spelling of the identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alpha => "alpha",
            Self::Beta => "beta",
            Self::Rc => "rc",
        }
    }

    /// Numeric rank used for ordering (alpha=1, beta=2, rc=3).
    pub fn rank(self) -> u8 {
        match self {
            Self::Alpha => 1,
            Self::Beta => 2,
            Self::Rc => 3,
        }
    }
}

impl FromStr for PreReleaseIdentifier {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alpha" => Ok(Self::Alpha),
            "beta" => Ok(Self::Beta),
            "rc" => Ok(Self::Rc),
            _ => Err(ParseError::new(s, "unknown pre-release identifier")),
        }
    }
}

impl fmt::Display for PreReleaseIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pre-release qualifier such as `rc2`.
///
/// Ordering compares the identifier rank first, then the iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PreRelease {
    /// Channel of the pre-release.
    pub identifier: PreReleaseIdentifier,
    /// Iteration within the channel (`3` in `beta3`).
    pub iteration: u64,
}

impl fmt::Display for PreRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.identifier, self.iteration)
    }
}

/// A parsed release version.
///
/// Two versions are equal only if all components match, including the
/// presence of a pre-release. A version without pre-release is newer than
/// the same version with one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SemVer {
    /// Major component.
    pub major: u64,
    /// Minor component (`0` when omitted).
    pub minor: u64,
    /// Patch component (`0` when omitted).
    pub patch: u64,
    /// Optional pre-release qualifier.
    pub pre_release: Option<PreRelease>,
}

fn grammar() -> &'static Regex {
    static GRAMMAR: OnceLock<Regex> = OnceLock::new();
    GRAMMAR.get_or_init(|| {
        Regex::new(r"^(\d+)(?:\.(\d+)(?:\.(\d+))?)?(?:-([A-Za-z]+)(\d+)?)?$")
            .expect("version grammar is a valid regex")
    })
}

impl SemVer {
    /// Build a release version without pre-release.
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre_release: None,
        }
    }

    /// Attach a pre-release qualifier.
    pub const fn with_pre_release(
        mut self,
        identifier: PreReleaseIdentifier,
        iteration: u64,
    ) -> Self {
        self.pre_release = Some(PreRelease {
            identifier,
            iteration,
        });
        self
    }

    /// Parse a version string such as `1.7`, `1.7.1` or `1.7.1-rc2`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] for empty input, non-numeric or overflowing
    /// components, unknown pre-release identifiers or a pre-release without
    /// an iteration number.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        if text.is_empty() {
            return Err(ParseError::new(text, "empty string"));
        }

        let caps = grammar().captures(text).ok_or_else(|| {
            ParseError::new(text, "expected MAJOR[.MINOR[.PATCH]][-<alpha|beta|rc><N>]")
        })?;

        let number = |idx: usize| -> Result<u64, ParseError> {
            caps.get(idx).map_or(Ok(0), |m| {
                m.as_str()
                    .parse::<u64>()
                    .map_err(|_| ParseError::new(text, "numeric component out of range"))
            })
        };

        let major = number(1)?;
        let minor = number(2)?;
        let patch = number(3)?;

        let pre_release = match caps.get(4) {
            None => None,
            Some(ident) => {
                let identifier = ident
                    .as_str()
                    .parse::<PreReleaseIdentifier>()
                    .map_err(|_| ParseError::new(text, "unknown pre-release identifier"))?;
                if caps.get(5).is_none() {
                    return Err(ParseError::new(text, "pre-release is missing its iteration"));
                }
                Some(PreRelease {
                    identifier,
                    iteration: number(5)?,
                })
            }
        };

        Ok(Self {
            major,
            minor,
            patch,
            pre_release,
        })
    }

    /// Whether this version carries a pre-release qualifier.
    pub fn is_pre_release(&self) -> bool {
        self.pre_release.is_some()
    }

    /// `self < other`
    pub fn is_older_than(&self, other: &Self) -> bool {
        self < other
    }

    /// `self <= other`
    pub fn is_older_than_or_equal(&self, other: &Self) -> bool {
        self <= other
    }

    /// `self > other`
    pub fn is_newer_than(&self, other: &Self) -> bool {
        self > other
    }

    /// `self >= other`
    pub fn is_newer_than_or_equal(&self, other: &Self) -> bool {
        self >= other
    }
}

impl Ord for SemVer {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| match (&self.pre_release, &other.pre_release) {
                (None, None) => Ordering::Equal,
                // A final release outranks any of its pre-releases.
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for SemVer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SemVer {
    /// Renders in git tag format: a zero patch is omitted (`1.4`) and the
    /// pre-release follows a single dash (`1.4.1-rc2`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if self.patch != 0 {
            write!(f, ".{}", self.patch)?;
        }
        if let Some(pre) = &self.pre_release {
            write!(f, "-{pre}")?;
        }
        Ok(())
    }
}

impl FromStr for SemVer {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for SemVer {
    type Error = ParseError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl Serialize for SemVer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SemVer {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
