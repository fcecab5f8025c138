// Copyright 2026 Masq Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{
    fs::File,
    io::{Read, Write},
    os::fd::{FromRawFd, OwnedFd, RawFd},
};

use anyhow::{Context, Result};

/// Anonymous unidirectional pipe: (write end, read end).
///
/// Both ends carry O_CLOEXEC so the raw descriptor numbers never leak past
/// an exec; the controller re-arms the read end onto the conventional
/// index inside pre_exec.
pub fn open_channel() -> Result<(OwnedFd, OwnedFd)> {
    let mut fds = [0 as RawFd; 2];

    // SAFETY: fds outlives the call; pipe2 fills both slots on success.
    let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error()).context("pipe creation failed");
    }

    // SAFETY: on success both descriptors are open and owned by us alone.
    let read = unsafe { OwnedFd::from_raw_fd(fds[0]) };
    let write = unsafe { OwnedFd::from_raw_fd(fds[1]) };

    Ok((write, read))
}

/// Space-joined original argv. An argument containing a space is ambiguous
/// on the decode side; known format limitation, kept as-is.
pub fn encode(args: &[String]) -> Vec<u8> {
    args.join(" ").into_bytes()
}

pub fn decode(payload: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(payload)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Single write, then close. Short writes are not detected or retried; an
/// argv payload sits far below the pipe buffer.
pub fn send(write_end: OwnedFd, message: &[u8]) -> Result<()> {
    let mut file = File::from(write_end);
    let _ = file.write(message).context("side channel write failed")?;
    Ok(())
    // dropping the File closes the write end, releasing EOF to the reader
}

/// Read end the parent planted on a fixed descriptor index before exec.
///
/// The contract with the parent is the index itself; nothing is passed by
/// name or environment. Holding the index as a typed value keeps the
/// convention in one place.
#[derive(Debug, Clone, Copy)]
pub struct InheritedChannel {
    fd: RawFd,
}

impl InheritedChannel {
    pub const fn at(fd: RawFd) -> Self {
        Self { fd }
    }

    /// Drain the channel. `None` means the descriptor is absent, unreadable
    /// or empty: the signal that this process is the original top-level
    /// invocation rather than a re-exec child.
    pub fn receive_all(self) -> Option<Vec<u8>> {
        // F_GETFD answers "does this descriptor exist" without disturbing it.
        let rc = unsafe { libc::fcntl(self.fd, libc::F_GETFD) };
        if rc == -1 {
            return None;
        }

        // SAFETY: the descriptor exists and nothing else in this process
        // claims it; the File closes it after draining.
        let mut file = unsafe { File::from_raw_fd(self.fd) };

        let mut payload = Vec::new();
        match file.read_to_end(&mut payload) {
            Ok(n) if n > 0 => Some(payload),
            _ => None,
        }
    }
}
