//! `Package.resolved` lock files.
//!
//! The lock file records the pinned revision of every dependency. Its schema
//! went through three incompatible generations; [`LockFile::open`] detects the
//! generation from the top-level `"version"` field once and dispatches every
//! later operation to the matching [`PinStore`] strategy.
//!
//! ```no_run
//! use pinledger_core::lockfile::LockFile;
//! use pinledger_schema::{PackageId, PinState};
//!
//! let mut file = LockFile::open("Package.resolved")?;
//! let sdk = PackageId::from_location("https://github.com/DataDog/dd-sdk-ios");
//! file.update_dependency(&sdk, PinState::on_branch("dogfooding", "4e93a8f1"))?;
//! file.save()?;
//! # Ok::<(), pinledger_core::lockfile::LockFileError>(())
//! ```

mod format;
pub mod v1;
pub mod v2;
pub mod v3;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use pinledger_schema::{PackageId, Pin, PinState};
use serde_json::Value;
use thiserror::Error;

use format::OrderedDocument;
pub use format::KeySeparator;
pub use v1::ContentV1;
pub use v2::ContentV2;
pub use v3::ContentV3;

/// Errors raised by a single pin operation, independent of the file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PinError {
    /// No pin with this identity exists.
    #[error("does not contain pin named \"{identity}\"")]
    NotFound {
        /// Identity that was looked up.
        identity: String,
    },

    /// A pin with this identity already exists.
    #[error("already contains pin named \"{identity}\"")]
    AlreadyPinned {
        /// Identity that was added.
        identity: String,
    },

    /// Generation 1 keys pins by package name, and the id has none.
    #[error("cannot add \"{identity}\" to a version 1 file without a legacy package name")]
    LegacyNameRequired {
        /// Location identity of the rejected id.
        identity: String,
    },

    /// Generations 2 and 3 cannot pin a branch and a version at once.
    #[error("pin \"{identity}\" cannot track both a branch and a version")]
    ConflictingState {
        /// Identity of the rejected pin.
        identity: String,
    },
}

/// Errors raised while loading, mutating or saving a lock file.
#[derive(Error, Debug)]
pub enum LockFileError {
    /// The file could not be read or written.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON, or its shape does not match its generation.
    #[error("{} is not a valid Package.resolved file: {source}", path.display())]
    MalformedFile {
        /// Offending file.
        path: PathBuf,
        /// Parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The top-level `"version"` is not a supported generation.
    #[error(
        "{} uses version {found} but only versions 1, 2 and 3 are supported",
        path.display()
    )]
    UnsupportedGeneration {
        /// Offending file.
        path: PathBuf,
        /// The `"version"` value as found in the file.
        found: String,
    },

    /// A pin operation failed.
    #[error("{} {source}", path.display())]
    Pin {
        /// File being modified.
        path: PathBuf,
        /// What went wrong.
        #[source]
        source: PinError,
    },

    /// The in-memory content could not be serialized.
    #[error("Serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Lock-file schema generation, as declared by the top-level `"version"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Generation {
    /// Pins keyed by package name; absent state fields written as `null`.
    V1,
    /// Pins keyed by location identity; absent state fields omitted.
    V2,
    /// Generation 2 plus a top-level `"originHash"`.
    V3,
}

impl Generation {
    /// The value of the top-level `"version"` field.
    pub fn number(self) -> u64 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
            Self::V3 => 3,
        }
    }

    /// Try to map a `"version"` value to a generation.
    pub fn from_number(n: u64) -> Option<Self> {
        match n {
            1 => Some(Self::V1),
            2 => Some(Self::V2),
            3 => Some(Self::V3),
            _ => None,
        }
    }

    /// Key/value separator the host toolchain uses for this generation.
    pub fn key_separator(self) -> KeySeparator {
        match self {
            Self::V1 => KeySeparator::Tight,
            Self::V2 | Self::V3 => KeySeparator::Spaced,
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "version {}", self.number())
    }
}

/// Before/after state of an updated pin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinChange {
    /// State before the update.
    pub old: PinState,
    /// State after the update.
    pub new: PinState,
}

impl PinChange {
    /// Whether the update left the pin untouched.
    pub fn is_noop(&self) -> bool {
        self.old == self.new
    }
}

/// Pin operations every generation implements.
///
/// Each generation stores pins in its own on-disk shape, so lookups, inserts
/// and the handling of absent state fields differ per implementation.
pub trait PinStore {
    /// Whether a pin for `id` exists.
    fn has_pin(&self, id: &PackageId) -> bool;

    /// Read the pin for `id`.
    fn read_pin(&self, id: &PackageId) -> Result<Pin, PinError>;

    /// Replace the resolution state of an existing pin.
    fn update_pin(&mut self, id: &PackageId, state: PinState) -> Result<PinChange, PinError>;

    /// Insert a new pin and return the index it was inserted at.
    fn add_pin(&mut self, id: &PackageId, location: &str, state: PinState)
    -> Result<usize, PinError>;

    /// Identities of all pins, in file order.
    fn read_all_identities(&self) -> Vec<PackageId>;
}

/// Index at which a new pin named `new` goes: before the first existing pin
/// that sorts after it (case-insensitively), else at the end.
///
/// Existing pins are never re-sorted; files with misplaced entries are
/// tolerated as-is.
pub(crate) fn insertion_index<'a>(existing: impl IntoIterator<Item = &'a str>, new: &str) -> usize {
    let new = new.to_lowercase();
    let mut count = 0;
    for (i, name) in existing.into_iter().enumerate() {
        if name.to_lowercase() > new {
            return i;
        }
        count = i + 1;
    }
    count
}

/// Parsed content of one lock file, one variant per generation.
#[derive(Debug, Clone)]
pub enum LockFileContent {
    /// Generation 1.
    V1(ContentV1),
    /// Generation 2.
    V2(ContentV2),
    /// Generation 3.
    V3(ContentV3),
}

impl LockFileContent {
    /// Detect the generation of `document`, parsed from `text`, and parse it.
    fn from_document(path: &Path, document: Value, text: &str) -> Result<Self, LockFileError> {
        let malformed = |source| LockFileError::MalformedFile {
            path: path.to_path_buf(),
            source,
        };

        let found = match document.get("version") {
            Some(v) => v.clone(),
            None => {
                return Err(malformed(<serde_json::Error as serde::de::Error>::missing_field(
                    "version",
                )));
            }
        };

        let generation = found
            .as_u64()
            .and_then(Generation::from_number)
            .ok_or_else(|| LockFileError::UnsupportedGeneration {
                path: path.to_path_buf(),
                found: found.to_string(),
            })?;

        let content = match generation {
            Generation::V1 => Self::V1(ContentV1::from_document(document).map_err(malformed)?),
            Generation::V2 => Self::V2(ContentV2::from_document(document).map_err(malformed)?),
            Generation::V3 => Self::V3(ContentV3::from_text(document, text).map_err(malformed)?),
        };
        Ok(content)
    }

    /// The generation of this content.
    pub fn generation(&self) -> Generation {
        match self {
            Self::V1(_) => Generation::V1,
            Self::V2(_) => Generation::V2,
            Self::V3(_) => Generation::V3,
        }
    }

    /// The strategy handling pin operations for this generation.
    pub fn store(&self) -> &dyn PinStore {
        match self {
            Self::V1(c) => c,
            Self::V2(c) => c,
            Self::V3(c) => c,
        }
    }

    /// Mutable access to the strategy.
    pub fn store_mut(&mut self) -> &mut dyn PinStore {
        match self {
            Self::V1(c) => c,
            Self::V2(c) => c,
            Self::V3(c) => c,
        }
    }

    /// The opaque `"originHash"` of a generation-3 file.
    pub fn origin_hash(&self) -> Option<&str> {
        match self {
            Self::V3(c) => c.origin_hash(),
            Self::V1(_) | Self::V2(_) => None,
        }
    }

    fn to_document(&self) -> Result<OrderedDocument, serde_json::Error> {
        match self {
            Self::V1(c) => c.to_document().map(OrderedDocument::sorted),
            Self::V2(c) => c.to_document().map(OrderedDocument::sorted),
            Self::V3(c) => c.to_document(),
        }
    }
}

/// A `Package.resolved` file opened from disk.
///
/// Reads and mutations happen in memory; only [`LockFile::save`] writes.
#[derive(Debug, Clone)]
pub struct LockFile {
    path: PathBuf,
    content: LockFileContent,
}

impl LockFile {
    /// Open and parse the lock file at `path`.
    ///
    /// # Errors
    ///
    /// [`LockFileError::Io`] if the file cannot be read,
    /// [`LockFileError::MalformedFile`] if it is not valid JSON or does not
    /// match its declared generation, and
    /// [`LockFileError::UnsupportedGeneration`] for an unknown `"version"`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LockFileError> {
        let path = path.as_ref();
        tracing::info!("Opening {}", path.display());
        let text = fs::read_to_string(path).map_err(|source| LockFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &text)
    }

    /// Parse lock-file `text` that [`LockFile::save`] will write to `path`.
    ///
    /// # Errors
    ///
    /// Same as [`LockFile::open`], minus I/O errors.
    pub fn parse(path: impl Into<PathBuf>, text: &str) -> Result<Self, LockFileError> {
        let path = path.into();
        let document: Value =
            serde_json::from_str(text).map_err(|source| LockFileError::MalformedFile {
                path: path.clone(),
                source,
            })?;
        let content = LockFileContent::from_document(&path, document, text)?;
        tracing::debug!("{} uses {}", path.display(), content.generation());
        Ok(Self { path, content })
    }

    /// Path this file was opened from and saves to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Detected schema generation.
    pub fn generation(&self) -> Generation {
        self.content.generation()
    }

    /// Parsed content.
    pub fn content(&self) -> &LockFileContent {
        &self.content
    }

    /// The opaque `"originHash"`, for generation-3 files that carry one.
    pub fn origin_hash(&self) -> Option<&str> {
        self.content.origin_hash()
    }

    fn pin_error(&self, source: PinError) -> LockFileError {
        LockFileError::Pin {
            path: self.path.clone(),
            source,
        }
    }

    /// Whether the file pins `id`.
    pub fn has_dependency(&self, id: &PackageId) -> bool {
        self.content.store().has_pin(id)
    }

    /// Read the pin for `id`.
    ///
    /// # Errors
    ///
    /// [`PinError::NotFound`] (wrapped in [`LockFileError::Pin`]) if absent.
    pub fn read_dependency(&self, id: &PackageId) -> Result<Pin, LockFileError> {
        tracing::debug!("Looking up \"{id}\" in {}", self.path.display());
        self.content.store().read_pin(id).map_err(|e| self.pin_error(e))
    }

    /// Identities of all pinned dependencies, in file order.
    pub fn read_dependency_ids(&self) -> Vec<PackageId> {
        self.content.store().read_all_identities()
    }

    /// Replace the branch/revision/version of an existing pin.
    ///
    /// # Errors
    ///
    /// [`PinError::NotFound`] if `id` is not pinned, or
    /// [`PinError::ConflictingState`] when a generation-2/3 state sets both
    /// branch and version.
    pub fn update_dependency(&mut self, id: &PackageId, state: PinState) -> Result<(), LockFileError> {
        let change = self
            .content
            .store_mut()
            .update_pin(id, state)
            .map_err(|e| self.pin_error(e))?;

        if change.is_noop() {
            tracing::info!("\"{id}\" is up-to-date in {}", self.path.display());
        } else {
            tracing::info!(
                old = %change.old,
                new = %change.new,
                "Updated \"{id}\" in {}",
                self.path.display()
            );
        }
        Ok(())
    }

    /// Add a pin for a dependency not yet in the file.
    ///
    /// # Errors
    ///
    /// [`PinError::AlreadyPinned`] if `id` is already pinned,
    /// [`PinError::LegacyNameRequired`] for a generation-1 file and an id
    /// without legacy name, or [`PinError::ConflictingState`].
    pub fn add_dependency(
        &mut self,
        id: &PackageId,
        location: &str,
        state: PinState,
    ) -> Result<(), LockFileError> {
        let shown = state.to_string();
        let index = self
            .content
            .store_mut()
            .add_pin(id, location, state)
            .map_err(|e| self.pin_error(e))?;
        tracing::info!(
            state = %shown,
            "Added \"{id}\" at index {index} in {}",
            self.path.display()
        );
        Ok(())
    }

    /// Update `id` if it is pinned, otherwise add it at `location`.
    ///
    /// # Errors
    ///
    /// Same as [`LockFile::update_dependency`] and [`LockFile::add_dependency`].
    pub fn set_dependency(
        &mut self,
        id: &PackageId,
        location: &str,
        state: PinState,
    ) -> Result<(), LockFileError> {
        if self.has_dependency(id) {
            self.update_dependency(id, state)
        } else {
            self.add_dependency(id, location, state)
        }
    }

    /// The exact text [`LockFile::save`] writes.
    ///
    /// # Errors
    ///
    /// [`LockFileError::Serialize`] if the content cannot be serialized.
    pub fn render(&self) -> Result<String, LockFileError> {
        let bytes = self.render_bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn render_bytes(&self) -> Result<Vec<u8>, LockFileError> {
        let document = self.content.to_document()?;
        Ok(format::render(&document, self.generation().key_separator())?)
    }

    /// Write the content back to [`LockFile::path`].
    ///
    /// The file is first written next to the target and then renamed over
    /// it, so readers never observe a partially written lock file. A
    /// symlinked path is resolved first and the link is left in place; the
    /// temporary file is removed again if the rename fails.
    ///
    /// # Errors
    ///
    /// [`LockFileError::Io`] if resolving, writing or renaming fails.
    pub fn save(&self) -> Result<(), LockFileError> {
        tracing::info!("Saving {}", self.path.display());
        let bytes = self.render_bytes()?;

        let io_err = |source| LockFileError::Io {
            path: self.path.clone(),
            source,
        };
        let target = match fs::symlink_metadata(&self.path) {
            Ok(meta) if meta.file_type().is_symlink() => fs::canonicalize(&self.path).map_err(io_err)?,
            _ => self.path.clone(),
        };
        let mut temp_name = target
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        temp_name.push(".tmp");
        let temp_path = target.with_file_name(temp_name);

        fs::write(&temp_path, &bytes).map_err(io_err)?;
        if let Err(source) = fs::rename(&temp_path, &target) {
            let _ = fs::remove_file(&temp_path);
            return Err(io_err(source));
        }
        Ok(())
    }
}
