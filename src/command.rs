//! Shell commands: escaping, `sudo`/`cd` wrapping, and formatting.

use std::path::Path;
use std::process::Stdio;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use tap::Tap;

use crate::quote::quote_str;
use crate::quote::ShellArg;
use crate::Error;

/// The shell every command is run with.
pub const SHELL: &str = "bash";

/// A shell command, optionally run as another user or in another directory.
///
/// The [`Command::invocation`] is derived from the other fields every time it's requested, so it
/// always reflects the current user and directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    raw: String,
    user: Option<String>,
    directory: Option<Utf8PathBuf>,
}

impl Command {
    /// Construct a command from a string of shell code. The string is run as-is by `bash -c`.
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            user: None,
            directory: None,
        }
    }

    /// Construct a command from a list of arguments, each of which is quoted.
    pub fn from_args<I>(args: I) -> crate::Result<Self>
    where
        I: IntoIterator,
        I::Item: ShellArg,
    {
        Ok(Self::new(crate::join_arguments(args)?))
    }

    /// Run the command as the given user with `sudo --login`.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// `cd` to the given directory before running the command.
    pub fn with_directory(mut self, directory: impl Into<Utf8PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Like [`Command::with_directory`], but for paths which may not be UTF-8.
    pub fn try_with_directory(self, directory: impl AsRef<Path>) -> crate::Result<Self> {
        let directory = directory.as_ref();
        let directory = Utf8Path::from_path(directory).ok_or(Error::InvalidArgumentType {
            type_name: std::any::type_name::<Path>(),
        })?;
        Ok(self.with_directory(directory))
    }

    /// Set or clear the user to run the command as.
    pub fn set_user(&mut self, user: Option<String>) {
        self.user = user;
    }

    /// Set or clear the directory to run the command in.
    pub fn set_directory(&mut self, directory: Option<Utf8PathBuf>) {
        self.directory = directory;
    }

    /// The command text, as supplied by the caller.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The user to run the command as, if any.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// The directory to run the command in, if any.
    pub fn directory(&self) -> Option<&Utf8Path> {
        self.directory.as_deref()
    }

    /// Will the command run as `root`?
    ///
    /// Commands without a user run as the current user.
    pub fn is_privileged(&self) -> bool {
        match self.user() {
            Some(user) => user == "root",
            None => nix::unistd::Uid::effective().is_root(),
        }
    }

    /// The argument vector handed to the OS: `bash -c <inner>`, possibly prefixed with
    /// `sudo --user=<user> --login`.
    pub fn invocation(&self) -> Vec<String> {
        build_invocation(&self.raw, self.user(), self.directory())
    }

    /// Format the invocation as a single shell-quoted string, suitable for user output.
    pub fn display(&self) -> String {
        self.invocation()
            .iter()
            .map(|arg| quote_str(arg))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Construct a [`tokio::process::Command`] for this command.
    ///
    /// Stdout and stderr are always piped. Stdin is piped if `pipe_stdin` is set and inherited
    /// otherwise.
    pub fn to_tokio(&self, pipe_stdin: bool) -> tokio::process::Command {
        let mut invocation = self.invocation().into_iter();
        let program = invocation.next().unwrap_or_else(|| SHELL.to_owned());
        tokio::process::Command::new(program).tap_mut(|command| {
            command
                .args(invocation)
                .stdin(if pipe_stdin {
                    Stdio::piped()
                } else {
                    Stdio::inherit()
                })
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);
        })
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl From<&str> for Command {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Command {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

/// Build the argument vector for a command.
///
/// 1. With a `directory`, the command becomes `cd <directory> && (<command>)`.
/// 2. The result is run with `bash -c`.
/// 3. With a `user`, `sudo --user=<user> --login` is prepended.
pub fn build_invocation(
    raw: &str,
    user: Option<&str>,
    directory: Option<&Utf8Path>,
) -> Vec<String> {
    let inner = match directory {
        Some(directory) => format!("cd {} && ({raw})", quote_str(directory.as_str())),
        None => raw.to_owned(),
    };

    let mut invocation = Vec::with_capacity(6);
    if let Some(user) = user {
        invocation.extend([
            "sudo".to_owned(),
            format!("--user={user}"),
            "--login".to_owned(),
        ]);
    }
    invocation.extend([SHELL.to_owned(), "-c".to_owned(), inner]);
    invocation
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_plain_invocation() {
        assert_eq!(
            Command::new("echo hello").invocation(),
            vec!["bash", "-c", "echo hello"]
        );
    }

    #[test]
    fn test_empty_command() {
        assert_eq!(Command::new("").invocation(), vec!["bash", "-c", ""]);
    }

    #[test]
    fn test_user_invocation() {
        let command = Command::new("whoami").with_user("root");
        assert_eq!(
            command.invocation(),
            vec!["sudo", "--user=root", "--login", "bash", "-c", "whoami"]
        );
        assert!(command.is_privileged());
        assert!(!Command::new("whoami").with_user("puppy").is_privileged());
    }

    #[test]
    fn test_directory_invocation() {
        let command = Command::new("ls -la").with_directory("/tmp/my dir");
        assert_eq!(
            command.invocation(),
            vec!["bash", "-c", "cd '/tmp/my dir' && (ls -la)"]
        );
    }

    #[test]
    fn test_user_and_directory_invocation() {
        let command = Command::new("make")
            .with_directory("/srv/app")
            .with_user("deploy");
        assert_eq!(
            command.invocation(),
            vec![
                "sudo",
                "--user=deploy",
                "--login",
                "bash",
                "-c",
                "cd /srv/app && (make)"
            ]
        );
    }

    #[test]
    fn test_invocation_tracks_changes() {
        let mut command = Command::new("pwd").with_directory("/a");
        assert_eq!(command.invocation()[2], "cd /a && (pwd)");
        command.set_directory(Some("/b".into()));
        assert_eq!(command.invocation()[2], "cd /b && (pwd)");
        command.set_directory(None);
        command.set_user(Some("root".to_owned()));
        assert_eq!(command.invocation()[..3], ["sudo", "--user=root", "--login"]);
    }

    #[test]
    fn test_from_args() {
        let command = Command::from_args(["printf", "%s\n", "it's here"]).unwrap();
        assert_eq!(command.raw(), "printf '%s\n' 'it'\\''s here'");
    }

    #[test]
    fn test_display() {
        let command = Command::new("echo 'hi'").with_user("root");
        assert_eq!(
            command.display(),
            r"sudo --user=root --login bash -c 'echo '\''hi'\'''"
        );
        assert_eq!(command.to_string(), "echo 'hi'");
    }

    #[test]
    fn test_to_tokio() {
        let command = Command::new("true").with_user("root").to_tokio(false);
        let std = command.as_std();
        assert_eq!(std.get_program(), "sudo");
        assert_eq!(
            std.get_args().collect::<Vec<_>>(),
            ["--user=root", "--login", "bash", "-c", "true"]
        );
    }
}
