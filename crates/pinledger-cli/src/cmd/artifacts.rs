//! Artifacts command

use std::path::Path;

use anyhow::{Context, Result};
use pinledger_core::{DirectoryListing, RuleTable};
use pinledger_schema::SemVer;

/// Validate an unpacked release archive for `tag`
pub fn validate(dir: &Path, tag: &str) -> Result<()> {
    let release = SemVer::parse(tag).context("Invalid release tag")?;
    tracing::info!("Validating {} against {release}", dir.display());

    let listing = DirectoryListing::scan(dir)?;
    for entry in listing.entries() {
        tracing::debug!("  - {entry}");
    }

    let validated = RuleTable::sdk()
        .validate_archive(&listing, &release)
        .with_context(|| format!("{} is not a valid {release} archive", dir.display()))?;

    for name in &validated {
        println!("{name}");
    }
    Ok(())
}
