//! Running a command in its own process group, so a cancelled run takes every process the command
//! started down with it.

use std::io;
use std::io::IsTerminal;
use std::os::fd::AsRawFd;
use std::os::fd::RawFd;
use std::process::ExitStatus;

use command_group::AsyncCommandGroup;
use command_group::AsyncGroupChild;
use nix::sys::signal::killpg;
use nix::sys::signal::pthread_sigmask;
use nix::sys::signal::SigSet;
use nix::sys::signal::SigmaskHow;
use nix::sys::signal::Signal;
use nix::unistd::Pid;
use tokio::process::Child;
use tokio::process::Command;

/// A spawned command leading its own process group.
///
/// If this is dropped before the command has been waited for (because the run was cancelled or
/// timed out), the whole group is killed with `SIGKILL`. Processes the command started in the
/// background are in the same group, so they go too.
pub struct ProcessGroup {
    child: AsyncGroupChild,
    pgid: Pid,
    foreground: Option<Foreground>,
    waited: bool,
}

impl ProcessGroup {
    /// Spawn the command as the leader of a new process group.
    ///
    /// If we're in the foreground of the terminal on our stdin, the new group is moved to the
    /// foreground until it exits, so the command can still read from the terminal (like a
    /// `sudo` password prompt) and receives `Ctrl-C`.
    pub fn spawn(command: &mut Command) -> io::Result<Self> {
        let mut child = command.group_spawn()?;
        let pid = child
            .inner()
            .id()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "Spawned process has no pid"))?;
        let pgid = Pid::from_raw(pid as i32);
        tracing::debug!(pgid = pgid.as_raw(), "Spawned process group");

        Ok(Self {
            child,
            pgid,
            foreground: Foreground::hand_to(pgid),
            waited: false,
        })
    }

    /// The group leader.
    pub fn inner(&mut self) -> &mut Child {
        self.child.inner()
    }

    /// Wait for the group leader to exit.
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        let status = self.child.inner().wait().await?;
        self.waited = true;
        self.foreground = None;
        Ok(status)
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        if self.waited {
            return;
        }
        // The leader hasn't been reaped, so its pid can't have been reused as a group id.
        match killpg(self.pgid, Signal::SIGKILL) {
            Ok(()) => tracing::debug!(pgid = self.pgid.as_raw(), "Killed process group"),
            Err(err) => {
                tracing::debug!(pgid = self.pgid.as_raw(), %err, "Failed to kill process group")
            }
        }
    }
}

/// Ownership of the terminal's foreground, handed to a child's process group. Dropping this
/// takes the foreground back.
struct Foreground {
    fd: RawFd,
    previous: Pid,
}

impl Foreground {
    fn hand_to(pgid: Pid) -> Option<Self> {
        let stdin = std::io::stdin();
        if !stdin.is_terminal() {
            return None;
        }
        let fd = stdin.as_raw_fd();
        let previous = nix::unistd::tcgetpgrp(fd).ok()?;
        if previous != nix::unistd::getpgrp() {
            // We're running in the background ourselves.
            return None;
        }

        match nix::unistd::tcsetpgrp(fd, pgid) {
            Ok(()) => Some(Self { fd, previous }),
            Err(err) => {
                tracing::debug!(%err, "Failed to move process group to the foreground");
                None
            }
        }
    }
}

impl Drop for Foreground {
    fn drop(&mut self) {
        // We're in the background now, and `tcsetpgrp` from the background raises `SIGTTOU`
        // unless it's blocked.
        let result =
            with_signal_blocked(Signal::SIGTTOU, || nix::unistd::tcsetpgrp(self.fd, self.previous));
        if let Err(err) = result {
            tracing::debug!(%err, "Failed to take back the terminal foreground");
        }
    }
}

fn with_signal_blocked<T>(
    signal: Signal,
    f: impl FnOnce() -> nix::Result<T>,
) -> nix::Result<T> {
    let mut old_signal_mask = SigSet::empty();
    pthread_sigmask(
        SigmaskHow::SIG_BLOCK,
        Some(&SigSet::from_iter(std::iter::once(signal))),
        Some(&mut old_signal_mask),
    )?;

    let result = f();

    pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&old_signal_mask), None)?;

    result
}

/// Is the process running? Zombies don't count.
#[cfg(test)]
pub(crate) fn is_running(pid: i32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.split_whitespace().next())
            .map_or(false, |state| state != "Z" && state != "X"),
        Err(_) => false,
    }
}

/// Wait up to five seconds for a process to stop running.
#[cfg(test)]
pub(crate) async fn wait_until_stopped(pid: i32) -> bool {
    for _ in 0..100 {
        if !is_running(pid) {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    false
}
