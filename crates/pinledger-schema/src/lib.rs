//! Shared value types for pinledger.
//!
//! - [`SemVer`]: release versions with ranked pre-releases, parsed from git tags.
//! - [`PackageId`]: dependency identity spanning lock-file generations.
//! - [`Pin`] / [`PinState`]: a dependency's recorded resolution.
//!
//! Nothing in this crate touches the file system.

pub mod identity;
pub mod pin;
pub mod version;

// Re-exports
pub use identity::PackageId;
pub use pin::{Pin, PinState};
pub use version::{ParseError, PreRelease, PreReleaseIdentifier, SemVer};
