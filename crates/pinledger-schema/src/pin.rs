//! Generation-agnostic view of a pinned dependency.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identity::PackageId;

/// Resolution state of a pin: which branch/version it tracks and the exact
/// revision it is locked to.
///
/// Generation 1 writes every field (using `null` for `None`); generations
/// 2 and 3 omit absent fields and never hold both `branch` and `version`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinState {
    /// Tracked branch, for branch-based pins.
    pub branch: Option<String>,
    /// Locked commit.
    pub revision: Option<String>,
    /// Tracked version, for version-based pins.
    pub version: Option<String>,
}

impl PinState {
    /// State of a pin that follows `branch`, locked at `revision`.
    pub fn on_branch(branch: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            branch: Some(branch.into()),
            revision: Some(revision.into()),
            version: None,
        }
    }

    /// State of a pin resolved to `version`, locked at `revision`.
    pub fn at_version(version: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            branch: None,
            revision: Some(revision.into()),
            version: Some(version.into()),
        }
    }

    /// State of a pin locked at `revision` only.
    pub fn at_revision(revision: impl Into<String>) -> Self {
        Self {
            branch: None,
            revision: Some(revision.into()),
            version: None,
        }
    }

    /// The same state with empty strings treated as absent.
    #[must_use]
    pub fn normalized(self) -> Self {
        let keep = |v: Option<String>| v.filter(|s| !s.is_empty());
        Self {
            branch: keep(self.branch),
            revision: keep(self.revision),
            version: keep(self.version),
        }
    }

    /// Whether both `branch` and `version` are set, which generations 2
    /// and 3 cannot represent.
    pub fn is_conflicting(&self) -> bool {
        self.branch.is_some() && self.version.is_some()
    }
}

impl fmt::Display for PinState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "null".to_string());
        write!(
            f,
            "branch: {}, revision: {}, version: {}",
            show(&self.branch),
            show(&self.revision),
            show(&self.version)
        )
    }
}

/// A dependency's recorded resolution, independent of the file generation
/// it was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pin {
    /// Lookup identity.
    pub identity: PackageId,
    /// Repository URL, as written in the file.
    pub location: String,
    /// Resolution state.
    pub state: PinState,
}
