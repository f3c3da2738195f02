//! `calguard config` – show where the config lives and what is in effect.

use anyhow::{Context, Result};
use calguard_core::config::{self, CalguardConfig};

pub fn run_config(cfg: &CalguardConfig) -> Result<()> {
    let path = config::config_path()?;
    let rendered = toml::to_string_pretty(cfg).context("rendering config as TOML")?;
    println!("# {}", path.display());
    print!("{rendered}");
    Ok(())
}
