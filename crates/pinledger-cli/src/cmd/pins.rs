//! Pins command

use std::path::Path;

use anyhow::{Context, Result, bail};
use pinledger_core::LockFile;
use pinledger_schema::{PackageId, PinState};

fn open(file: &Path) -> Result<LockFile> {
    LockFile::open(file).context("Failed to load lock file")
}

/// List every pin in file order
pub fn list(file: &Path) -> Result<()> {
    let lock = open(file)?;

    println!("{} ({})", file.display(), lock.generation());
    if let Some(hash) = lock.origin_hash() {
        println!("originHash {hash}");
    }

    let ids = lock.read_dependency_ids();
    if ids.is_empty() {
        println!("  No pins.");
        return Ok(());
    }
    for id in &ids {
        let pin = lock.read_dependency(id)?;
        println!("  {:<32} {}", id.to_string(), pin.state);
    }
    Ok(())
}

/// Show a single pin
pub fn show(file: &Path, name: &str) -> Result<()> {
    let lock = open(file)?;
    let pin = lock.read_dependency(&PackageId::from_legacy_name(name))?;

    let lw = 10;
    println!("{}", pin.identity);
    println!("  {:<lw$}{}", "location", pin.location);
    println!("  {:<lw$}{}", "branch", pin.state.branch.as_deref().unwrap_or("-"));
    println!("  {:<lw$}{}", "revision", pin.state.revision.as_deref().unwrap_or("-"));
    println!("  {:<lw$}{}", "version", pin.state.version.as_deref().unwrap_or("-"));
    Ok(())
}

/// Update a pin, or add it when `location` is given and it is missing
pub fn set(
    file: &Path,
    name: &str,
    location: Option<&str>,
    branch: Option<String>,
    revision: String,
    version: Option<String>,
) -> Result<()> {
    let mut lock = open(file)?;
    let id = PackageId::from_legacy_name(name);
    let state = PinState {
        branch,
        revision: Some(revision),
        version,
    };
    let shown = state.to_string();

    match location {
        Some(location) => lock.set_dependency(&id, location, state)?,
        None if lock.has_dependency(&id) => lock.update_dependency(&id, state)?,
        None => bail!(
            "'{name}' is not pinned in {}; pass --location to add it",
            file.display()
        ),
    }

    lock.save()?;
    println!("{name}: {shown}");
    Ok(())
}
