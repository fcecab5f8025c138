// Copyright 2026 Masq Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{
    env, fmt, fs, io,
    os::{
        fd::{AsRawFd, OwnedFd},
        unix::process::CommandExt,
    },
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use anyhow::{Context, Result, anyhow};

use crate::{
    conf::config::Config,
    core::{
        channel,
        disguise::{self, DisguiseCandidate},
    },
    defs,
};

/// Which fallback produced the executable path for this attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStrategy {
    SelfLink,
    InvokedPath,
}

impl fmt::Display for PathStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStrategy::SelfLink => write!(f, "/proc/self/exe"),
            PathStrategy::InvokedPath => write!(f, "argv[0]"),
        }
    }
}

fn resolve_self_link() -> io::Result<PathBuf> {
    fs::read_link("/proc/self/exe")
}

fn resolve_invoked_path() -> io::Result<PathBuf> {
    let argv0 = env::args_os()
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "argv[0] missing"))?;
    fs::canonicalize(argv0)
}

fn pick_strategy(
    self_link: io::Result<PathBuf>,
    invoked: impl FnOnce() -> io::Result<PathBuf>,
) -> Result<(PathBuf, PathStrategy)> {
    match self_link {
        Ok(path) => Ok((path, PathStrategy::SelfLink)),
        Err(primary) => {
            tracing::debug!("/proc/self/exe unavailable ({primary}), trying argv[0]");
            match invoked() {
                Ok(path) => Ok((path, PathStrategy::InvokedPath)),
                Err(secondary) => Err(anyhow!(
                    "cannot resolve own executable: /proc/self/exe: {primary}; argv[0]: {secondary}"
                )),
            }
        }
    }
}

/// Strategy A (self link), then strategy B (invoked path). Both failing is
/// fatal to the fork attempt; a start failure after resolution is not
/// retried with the other strategy.
pub fn resolve_executable() -> Result<(PathBuf, PathStrategy)> {
    pick_strategy(resolve_self_link(), resolve_invoked_path)
}

/// A released child. The pid feeds one log line; no handle is retained.
#[derive(Debug)]
pub struct Detached {
    pub pid: u32,
}

/// Start `exe` wearing `chosen` as its entire visible command line, with
/// the channel read end planted on the conventional descriptor index.
/// Fire-and-forget: the handle is dropped without reaping.
fn spawn_detached(exe: &Path, chosen: &DisguiseCandidate, read_end: OwnedFd) -> Result<Detached> {
    let mut cmd = Command::new(exe);
    cmd.arg0(chosen.argv0())
        .args(chosen.tail())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let raw = read_end.as_raw_fd();

    // SAFETY: dup2 is async-signal-safe and nothing here allocates between
    // fork and exec.
    unsafe {
        cmd.pre_exec(move || {
            // dup2 clears O_CLOEXEC on the target slot; the original
            // descriptor, still CLOEXEC, vanishes at exec.
            if libc::dup2(raw, defs::SIDE_CHANNEL_FD) == -1 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let child = cmd
        .spawn()
        .with_context(|| format!("failed to start disguised child at {}", exe.display()))?;

    let pid = child.id();
    // Explicit detach: no wait, no exit-status observation. The parent is
    // about to terminate and init inherits the child.
    drop(child);

    Ok(Detached { pid })
}

/// One complete fork attempt: resolve our own binary, pick a disguise,
/// preload the side channel, release the child. The write end is closed
/// before the child starts so its read-to-EOF can never block on us.
pub fn fork_attempt(config: &Config, original_argv: &[String]) -> Result<Detached> {
    let (exe, strategy) = resolve_executable()?;

    let catalog = disguise::effective_catalog(&config.extra_catalog);
    let fragments = disguise::effective_fragments(&config.extra_fragments);
    let chosen = disguise::select_disguise(&catalog, &fragments);

    tracing::debug!("re-exec target: {} (via {strategy})", exe.display());
    tracing::debug!("selected disguise: {chosen}");

    let (write_end, read_end) = channel::open_channel()?;
    channel::send(write_end, &channel::encode(original_argv))?;

    let released = spawn_detached(&exe, &chosen, read_end)?;

    tracing::info!("released disguised child, pid {}", released.pid);

    Ok(released)
}
