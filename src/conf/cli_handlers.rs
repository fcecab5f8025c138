// Copyright 2026 Masq Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::Path;

use anyhow::{Context, Result};

use crate::{
    conf::{cli::Cli, config::Config},
    core::disguise,
    defs,
};

pub fn load_config(cli: &Cli) -> Result<Config> {
    if let Some(config_path) = &cli.config {
        return Config::from_file(config_path).with_context(|| {
            format!(
                "Failed to load config from custom path: {}",
                config_path.display()
            )
        });
    }

    match Config::load_default() {
        Ok(config) => Ok(config),
        Err(e) => {
            let is_not_found = e
                .root_cause()
                .downcast_ref::<std::io::Error>()
                .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                .unwrap_or(false);

            if is_not_found {
                Ok(Config::default())
            } else {
                Err(e).context(format!(
                    "Failed to load default config from {}",
                    defs::CONFIG_FILE_DEFAULT
                ))
            }
        }
    }
}

pub fn handle_gen_config(output: &Path) -> Result<()> {
    Config::default()
        .save_to_file(output)
        .with_context(|| format!("Failed to save generated config to {}", output.display()))
}

pub fn handle_show_config(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;

    let json = serde_json::to_string(&config).context("Failed to serialize config to JSON")?;

    println!("{}", json);

    Ok(())
}

/// What the selector would see on this host right now: the live boring
/// pool first, then the effective static catalog.
pub fn handle_candidates(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;

    let fragments = disguise::effective_fragments(&config.extra_fragments);

    match disguise::live_pool(&fragments) {
        Ok(pool) if !pool.is_empty() => {
            println!("live boring processes ({}):", pool.len());
            for candidate in &pool {
                println!("  {}", candidate);
            }
        }
        Ok(_) => println!("live boring processes: none"),
        Err(e) => println!("live enumeration unavailable: {:#}", e),
    }

    let catalog = disguise::effective_catalog(&config.extra_catalog);

    println!("static catalog ({}):", catalog.len());
    for candidate in &catalog {
        println!("  {}", candidate);
    }

    Ok(())
}
