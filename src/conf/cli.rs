// Copyright 2026 Masq Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::defs;

#[derive(Parser, Debug)]
#[command(name = "masq", version, about = "Re-exec under a boring command line")]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    GenConfig {
        #[arg(short = 'o', long = "output", default_value = defs::CONFIG_FILE_DEFAULT)]
        output: PathBuf,
    },
    ShowConfig,
    Candidates,
}
