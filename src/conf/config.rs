// Copyright 2026 Masq Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::defs;

/// Operator-facing knobs. The compiled-in catalogs stay authoritative;
/// the `extra_*` entries extend them without replacing them.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub extra_catalog: Vec<Vec<String>>,
    #[serde(default)]
    pub extra_fragments: Vec<String>,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default)]
    pub verbose: bool,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).context("failed to read config file")?;

        let config: Config = toml::from_str(&content).context("failed to parse config file")?;

        Ok(config)
    }

    pub fn load_default() -> Result<Self> {
        Self::from_file(defs::CONFIG_FILE_DEFAULT)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("failed to serialize config")?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).context("failed to create config directory")?;
        }

        fs::write(path.as_ref(), content).context("failed to write config file")?;

        Ok(())
    }

    pub fn merge_with_cli(&mut self, verbose: bool, log_file: Option<PathBuf>) {
        if verbose {
            self.verbose = true;
        }

        if let Some(path) = log_file {
            self.log_file = Some(path);
        }
    }
}
