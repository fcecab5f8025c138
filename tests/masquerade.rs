// Copyright 2026 Masq Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{
    fs,
    io::Write,
    os::{
        fd::{FromRawFd, RawFd},
        unix::process::CommandExt,
    },
    path::PathBuf,
    process::{Command, Stdio},
    thread,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

const BIN: &str = env!("CARGO_BIN_EXE_masq");

fn unique_path(tag: &str, ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!("masq-{}-{}-{}.{}", tag, std::process::id(), nanos, ext))
}

/// Simulates the parent's half of the convention: a pipe preloaded with
/// the original invocation, its read end planted on descriptor 3.
#[test]
fn restores_identity_from_the_inherited_descriptor() {
    let mut fds = [0 as RawFd; 2];
    assert_eq!(
        unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) },
        0,
        "pipe2 failed"
    );
    let (read_fd, write_fd) = (fds[0], fds[1]);

    let payload = format!("{} --verbose", BIN);
    let mut write_end = unsafe { fs::File::from_raw_fd(write_fd) };
    write_end.write_all(payload.as_bytes()).unwrap();
    drop(write_end);

    let mut cmd = Command::new(BIN);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    unsafe {
        cmd.pre_exec(move || {
            if libc::dup2(read_fd, 3) == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let output = cmd.output().unwrap();
    unsafe { libc::close(read_fd) };

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("restored original invocation"),
        "stderr: {stderr}"
    );
    assert!(stderr.contains("--verbose"), "stderr: {stderr}");
}

/// Without the descriptor the process must take the parent branch; with
/// --dry-run it reports the plan and starts nothing.
#[test]
fn dry_run_reports_the_plan_without_starting_anything() {
    let output = Command::new(BIN)
        .args(["--dry-run", "--verbose"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("DRY-RUN"), "stdout: {stdout}");
    assert!(stdout.contains("visible command line"), "stdout: {stdout}");
    assert!(stdout.contains("side channel payload"), "stdout: {stdout}");
    // the payload echoes the true argv of this invocation
    assert!(stdout.contains("--dry-run"), "stdout: {stdout}");
}

/// Full round trip through a real fork: the parent releases a disguised
/// child and exits; the child appends its restored invocation to the log.
#[test]
fn released_child_logs_the_restored_invocation() {
    let log_path = unique_path("fork", "log");

    let output = Command::new(BIN)
        .args(["--log-file", log_path.to_str().unwrap(), "--verbose"])
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("released disguised child"),
        "stderr: {stderr}"
    );

    // Fire-and-forget child; give it a moment to come up and log.
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut log = String::new();
    while Instant::now() < deadline {
        if let Ok(text) = fs::read_to_string(&log_path) {
            if text.contains("restored original invocation") {
                log = text;
                break;
            }
        }
        thread::sleep(Duration::from_millis(50));
    }

    assert!(
        log.contains("restored original invocation"),
        "log: {log}"
    );
    assert!(log.contains("--log-file"), "log: {log}");

    let _ = fs::remove_file(&log_path);
}

#[test]
fn candidates_lists_the_static_catalog() {
    let output = Command::new(BIN).arg("candidates").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("static catalog"), "stdout: {stdout}");
    assert!(stdout.contains("ssh-agent"), "stdout: {stdout}");
}

#[test]
fn gen_config_then_show_config_round_trips() {
    let config_path = unique_path("config", "toml");

    let generated = Command::new(BIN)
        .args(["gen-config", "-o", config_path.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(generated.status.success());
    assert!(config_path.exists());

    let shown = Command::new(BIN)
        .args(["-c", config_path.to_str().unwrap(), "show-config"])
        .output()
        .unwrap();
    assert!(shown.status.success());
    let stdout = String::from_utf8_lossy(&shown.stdout);
    assert!(stdout.contains("extra_catalog"), "stdout: {stdout}");

    let _ = fs::remove_file(&config_path);
}
