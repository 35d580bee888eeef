//! Version command

use std::cmp::Ordering;

use anyhow::{Context, Result};
use pinledger_schema::SemVer;

/// Print how `a` orders against `b`
pub fn compare(a: &str, b: &str) -> Result<()> {
    let left = SemVer::parse(a).context("Invalid left-hand version")?;
    let right = SemVer::parse(b).context("Invalid right-hand version")?;

    let symbol = match left.cmp(&right) {
        Ordering::Less => "<",
        Ordering::Equal => "=",
        Ordering::Greater => ">",
    };
    println!("{symbol}");
    Ok(())
}
