//! Dependency identities across lock-file generations.
//!
//! Generation 1 files key pins by the package name declared in the
//! manifest (`"package": "DatadogSDK"`). Generations 2 and 3 key them by an
//! identity derived from the repository URL (`"identity": "dd-sdk-ios"`).
//! There is no canonical mapping between the two, so a [`PackageId`] carries
//! both keys and callers pick the comparison explicitly.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one dependency inside a lock file.
///
/// `location_identity` is always present. `legacy_name` is only set when the
/// id was read from, or is meant to match, a generation-1 file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageId {
    legacy_name: Option<String>,
    location_identity: String,
}

impl PackageId {
    /// An id carrying both keys, as produced by reading a generation-1 pin.
    pub fn new(legacy_name: impl Into<String>, repository_url: &str) -> Self {
        Self {
            legacy_name: Some(legacy_name.into()),
            location_identity: identity_from_location(repository_url),
        }
    }

    /// An id for a generation-1 package name.
    ///
    /// Without a repository URL the name doubles as the location identity.
    pub fn from_legacy_name(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            location_identity: name.clone(),
            legacy_name: Some(name),
        }
    }

    /// An id derived from a repository URL.
    ///
    /// Takes the last `/`-delimited segment and strips a trailing `.git`:
    /// `https://github.com/DataDog/dd-sdk-ios.git` becomes `dd-sdk-ios`.
    pub fn from_location(repository_url: &str) -> Self {
        Self {
            legacy_name: None,
            location_identity: identity_from_location(repository_url),
        }
    }

    /// An id for an identity slug exactly as stored in a generation-2/3 file.
    pub fn from_identity(identity: impl Into<String>) -> Self {
        Self {
            legacy_name: None,
            location_identity: identity.into(),
        }
    }

    /// Make this id also match generation-1 pins named `name`.
    pub fn with_legacy_name(mut self, name: impl Into<String>) -> Self {
        self.legacy_name = Some(name.into());
        self
    }

    /// The generation-1 package name, if known.
    pub fn legacy_name(&self) -> Option<&str> {
        self.legacy_name.as_deref()
    }

    /// The generation-2/3 identity slug.
    pub fn location_identity(&self) -> &str {
        &self.location_identity
    }

    /// Whether this id names the generation-1 pin `package`.
    ///
    /// Always `false` for ids without a legacy name: a location-derived
    /// identity is never silently compared against a package name.
    pub fn matches_legacy(&self, package: &str) -> bool {
        self.legacy_name.as_deref() == Some(package)
    }

    /// Whether this id names the generation-2/3 pin `identity`.
    pub fn matches_location(&self, identity: &str) -> bool {
        self.location_identity == identity
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.legacy_name {
            Some(name) if *name != self.location_identity => {
                write!(f, "{name} ({})", self.location_identity)
            }
            _ => f.write_str(&self.location_identity),
        }
    }
}

fn identity_from_location(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}
