//! Kind listing command.

use std::path::Path;

use anyhow::Result;

pub fn execute(config: Option<&Path>) -> Result<()> {
    let config = super::load_config(config)?;
    for kind in config.kind_registry().iter() {
        println!("{:<12} {}", kind.abbreviation, kind.manifest_kind);
    }
    Ok(())
}
