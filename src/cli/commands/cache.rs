//! Cache command implementation
//!
//! Inspects and clears the persisted build cache.

use anyhow::Result;

use crate::cli::commands::workspace::WorkspaceContext;
use crate::cli::output::status;

/// Execute the cache info command
pub async fn execute_info(context: &WorkspaceContext) -> Result<()> {
    println!("Cache file: {}", context.cache_path().display());
    if !context.config.cache_persist() {
        println!("{} Cache persistence is disabled", status::INFO);
        return Ok(());
    }

    let cache = context.load_cache()?;
    let entries = cache.entries();
    println!("Cached packages: {}", entries.len());
    for (package, digest) in entries {
        let short = digest.get(..12).unwrap_or(&digest);
        println!("  {package}  {short}");
    }

    Ok(())
}

/// Execute the cache clean command
///
/// Removes the entry for `package`, or every entry when `package` is `None`.
pub async fn execute_clean(context: &WorkspaceContext, package: Option<&str>) -> Result<()> {
    if !context.config.cache_persist() {
        println!("{} Cache persistence is disabled", status::INFO);
        return Ok(());
    }

    let cache = context.load_cache()?;
    match package {
        Some(package) => {
            if cache.invalidate(package) {
                println!("{} Removed cache entry for {package}", status::SUCCESS);
            } else {
                println!("{} No cache entry for {package}", status::INFO);
            }
        }
        None => {
            let removed = cache.stats().entries_cached;
            cache.clear();
            println!("{} Removed {removed} cached package(s)", status::SUCCESS);
        }
    }
    context.save_cache(&cache)?;

    Ok(())
}
