//! Identifier mapping commands.

use calsync_engine::MappingStore;

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Print the stored pairs, one `source -> destination` per line.
pub fn show(config: &ClientConfig) -> ClientResult<()> {
    // Read-only, so no lock: this works while a sync is running.
    let store = MappingStore::open(config.mapping_path(), false)?;
    let mapping = store.load()?;

    if mapping.is_empty() {
        println!("No mapped entries in {}.", store.path().display());
        return Ok(());
    }
    for (source, destination) in mapping.iter() {
        println!("{} -> {}", source, destination);
    }
    println!("{} pair(s)", mapping.len());
    Ok(())
}

/// Show the mapping file path.
pub fn path(config: &ClientConfig) -> ClientResult<()> {
    println!("mapping: {}", config.mapping_path().display());
    Ok(())
}
