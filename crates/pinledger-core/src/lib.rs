//! pinledger core
//!
//! - [`lockfile`]: read and rewrite `Package.resolved` across its three
//!   schema generations, keeping the on-disk formatting stable.
//! - [`artifacts`]: version-gated content rules for release archives.

pub mod artifacts;
pub mod lockfile;

pub use artifacts::{ArtifactError, ArtifactRule, DirectoryListing, RuleTable};
pub use lockfile::{Generation, LockFile, LockFileError, PinError, PinStore};
