use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;
use std::process::Stdio;
use std::time::Duration;
use std::time::Instant;

use nix::sys::signal::kill;
use nix::sys::signal::Signal;
use nix::unistd::Pid;
use pretty_assertions::assert_eq;

fn shellby() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_shellby"));
    command
        .stdin(Stdio::null())
        .env_remove("RUST_LOG")
        .env_remove("FORCE_COLOR")
        .env_remove("CLICOLOR_FORCE");
    command
}

fn run(args: &[&str]) -> Output {
    shellby().args(args).output().unwrap()
}

fn text(bytes: &[u8]) -> &str {
    std::str::from_utf8(bytes).unwrap()
}

/// A fresh path for a command to write a pid to.
fn pid_file(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("shellby-{name}-{}.pid", std::process::id()));
    let _ = std::fs::remove_file(&path);
    path
}

/// Wait for a command to write a pid to `path`.
fn read_pid(path: &Path) -> i32 {
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(10) {
        if let Some(pid) = std::fs::read_to_string(path)
            .ok()
            .and_then(|contents| contents.trim().parse().ok())
        {
            return pid;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    panic!("No pid was written to {path:?}");
}

/// Is the process running? Zombies don't count.
fn is_running(pid: i32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.split_whitespace().next())
            .map_or(false, |state| state != "Z" && state != "X"),
        Err(_) => false,
    }
}

fn wait_until_stopped(pid: i32) -> bool {
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(5) {
        if !is_running(pid) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    false
}

#[test]
fn exit_code_is_the_commands() {
    assert_eq!(run(&["exit 0"]).status.code(), Some(0));
    assert_eq!(run(&["exit 5"]).status.code(), Some(5));
    assert_eq!(run(&["--no-check", "exit 5"]).status.code(), Some(5));
}

#[test]
fn killed_command_exits_with_128_plus_signal() {
    assert_eq!(run(&["kill -9 $$"]).status.code(), Some(137));
}

#[test]
fn no_display_replays_captured_output() {
    let out = run(&["--quiet", "--no-display", r"printf 'a\n\n'; echo oops >&2"]);
    assert_eq!(out.status.code(), Some(0));
    assert_eq!(text(&out.stdout), "a\n\n");
    assert_eq!(text(&out.stderr), "oops\n");

    // The replay comes after the sink has reported the exit.
    let out = run(&["--name", "job", "--no-display", "echo oops >&2; exit 2"]);
    assert_eq!(out.status.code(), Some(2));
    assert_eq!(text(&out.stdout), "");
    let stderr = text(&out.stderr);
    assert!(stderr.contains("job: exit with 2\n"), "{stderr}");
    assert!(stderr.ends_with("oops\n"), "{stderr}");
}

#[test]
fn displayed_lines_are_labeled() {
    let out = run(&["--name", "job", r"printf 'one\n\ntwo\n\n'"]);
    assert_eq!(out.status.code(), Some(0));
    assert_eq!(text(&out.stdout), "");
    let stderr = text(&out.stderr);
    assert!(
        stderr.contains("job> one\njob> \njob> two\njob[\u{2714}] \n"),
        "{stderr:?}"
    );
}

#[test]
fn timeout_kills_background_processes() {
    let path = pid_file("timeout");
    let script = format!(
        "sleep 30 & echo $! > {}; wait",
        shellby::quote(&path).unwrap()
    );

    let start = Instant::now();
    let out = run(&["--quiet", "--timeout", "1s", script.as_str()]);
    assert!(start.elapsed() < Duration::from_secs(10));
    assert!(!out.status.success());
    let stderr = text(&out.stderr);
    assert!(stderr.contains("Command timed out after 1s"), "{stderr}");

    let sleep_pid = read_pid(&path);
    assert!(wait_until_stopped(sleep_pid), "`sleep` is still running");
    let _ = std::fs::remove_file(&path);
}

#[test]
fn interrupt_kills_background_processes() {
    let path = pid_file("interrupt");
    let script = format!(
        "sleep 30 & echo $! > {}; wait",
        shellby::quote(&path).unwrap()
    );

    let mut child = shellby()
        .args(["--quiet", script.as_str()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    let sleep_pid = read_pid(&path);
    // Give `shellby` a moment to finish setting up its signal handler.
    std::thread::sleep(Duration::from_millis(200));

    kill(Pid::from_raw(child.id() as i32), Signal::SIGINT).unwrap();
    let status = child.wait().unwrap();
    assert_eq!(status.code(), Some(130));
    assert!(wait_until_stopped(sleep_pid), "`sleep` is still running");
    let _ = std::fs::remove_file(&path);
}
