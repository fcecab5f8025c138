// Copyright 2026 Masq Developers
// SPDX-License-Identifier: GPL-3.0-or-later
mod conf;
mod core;
mod defs;
mod utils;

use std::env;

use anyhow::{Context, Result};
use clap::Parser;
use mimalloc::MiMalloc;

use crate::{
    conf::{
        cli::{Cli, Commands},
        cli_handlers,
        config::Config,
    },
    core::{
        channel::{self, InheritedChannel},
        disguise, reexec,
    },
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<()> {
    // The inherited descriptor is the only signal separating a disguised
    // re-exec child from a fresh top-level invocation. Probe before
    // anything argv-dependent runs: a child's visible argv is the disguise
    // and must never reach the flag parser.
    match InheritedChannel::at(defs::SIDE_CHANNEL_FD).receive_all() {
        Some(payload) => run_restored(&payload),
        None => run_original(),
    }
}

/// Parent branch: exactly one fork attempt, then exit. Any unrecoverable
/// failure logs a single diagnostic and terminates non-zero.
fn run_original() -> Result<()> {
    let cli = Cli::parse();

    if let Some(command) = &cli.command {
        match command {
            Commands::GenConfig { output } => cli_handlers::handle_gen_config(output)?,
            Commands::ShowConfig => cli_handlers::handle_show_config(&cli)?,
            Commands::Candidates => cli_handlers::handle_candidates(&cli)?,
        }

        return Ok(());
    }

    let mut config = cli_handlers::load_config(&cli)?;
    config.merge_with_cli(cli.verbose, cli.log_file.clone());

    let log_guard = utils::init_logging(config.verbose, cli.dry_run, config.log_file.as_deref())
        .context("Failed to initialize logging")?;

    let original: Vec<String> = env::args().collect();

    if cli.dry_run {
        return dry_run(&config, &original);
    }

    match reexec::fork_attempt(&config, &original) {
        Ok(released) => {
            tracing::debug!("parent exiting; pid {} carries on", released.pid);
            Ok(())
        }
        Err(e) => {
            tracing::error!("unable to fork: {:#}", e);
            // flush the file appender before the hard exit
            drop(log_guard);
            std::process::exit(1);
        }
    }
}

/// Diagnostic mode: report what a fork attempt would do, start nothing.
fn dry_run(config: &Config, original: &[String]) -> Result<()> {
    tracing::info!(":: DRY-RUN / DIAGNOSTIC MODE ::");

    let (exe, strategy) = reexec::resolve_executable()?;

    let catalog = disguise::effective_catalog(&config.extra_catalog);
    let fragments = disguise::effective_fragments(&config.extra_fragments);
    let chosen = disguise::select_disguise(&catalog, &fragments);

    tracing::info!(">> would exec {} (via {})", exe.display(), strategy);
    tracing::info!(">> visible command line: {}", chosen);
    tracing::info!(
        ">> side channel payload: {}",
        String::from_utf8_lossy(&channel::encode(original))
    );
    tracing::info!(">> nothing started.");

    Ok(())
}

/// Child branch: the payload is our true original invocation. Re-parse it
/// so the original flags govern logging, then carry on under the restored
/// identity. Identity restoration has no failure mode; a payload that no
/// longer parses is logged as-is.
fn run_restored(payload: &[u8]) -> Result<()> {
    let tokens = channel::decode(payload);
    let cli = Cli::try_parse_from(tokens.iter().map(String::as_str)).ok();

    let mut config = match &cli {
        Some(cli) => cli_handlers::load_config(cli).unwrap_or_default(),
        None => Config::default(),
    };
    if let Some(cli) = &cli {
        config.merge_with_cli(cli.verbose, cli.log_file.clone());
    }

    let _log_guard = utils::init_logging(config.verbose, false, config.log_file.as_deref())
        .context("Failed to initialize logging")?;

    tracing::info!(
        "restored original invocation: {}",
        String::from_utf8_lossy(payload)
    );
    tracing::debug!(
        "visible command line now: {}",
        env::args().collect::<Vec<_>>().join(" ")
    );

    // The tool's real workload would continue here, driven by `tokens`.
    Ok(())
}
