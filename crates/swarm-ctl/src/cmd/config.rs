//! Show where the config lives and what it resolves to.

use std::path::PathBuf;

use anyhow::{Context, Result};

use swarm_core::config::SwarmConfig;

pub fn cmd_config(explicit: &Option<PathBuf>) -> Result<()> {
    let (path, config) = match explicit {
        Some(path) => (path.clone(), SwarmConfig::load_from(path)?),
        None => {
            let path = SwarmConfig::write_default_if_missing()
                .context("failed to write default config")?;
            (path, SwarmConfig::load()?)
        }
    };

    println!("# {}", path.display());
    print!("{}", config.to_toml()?);
    Ok(())
}
