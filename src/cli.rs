//! Command-line argument parser and argument access.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::Parser;
use indoc::indoc;
use miette::IntoDiagnostic;
use miette::WrapErr;
use tokio::io::AsyncReadExt;

use crate::Command;
use crate::ExecutionRequest;
use crate::Stdin;
use crate::TracingSink;

/// Run a shell command, streaming its output with a label and capturing it.
#[derive(Debug, Clone, Parser)]
#[command(version, author, about)]
#[command(max_term_width = 100)]
#[command(after_help = indoc!("
    Examples:
      shellby --name build -- make -j4
      shellby --user root --directory /etc 'ls -la | head'
      shellby --stdin 'hello' cat
"))]
pub struct Opts {
    /// The command to run.
    ///
    /// A single argument is run as shell code with `bash -c`. Multiple arguments are quoted
    /// individually and joined with spaces.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,

    /// A label to print before every line of output.
    #[arg(long)]
    pub name: Option<String>,

    /// Run the command as this user with `sudo --login`.
    #[arg(long, short)]
    pub user: Option<String>,

    /// `cd` to this directory inside the shell before running the command.
    ///
    /// Unlike `--cwd`, this happens after `sudo --login` has switched to the user's home
    /// directory.
    #[arg(long)]
    pub directory: Option<Utf8PathBuf>,

    /// Start the shell in this directory. A leading `~` is expanded.
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Text to write to the command's stdin.
    #[arg(long, conflicts_with = "stdin_file")]
    pub stdin: Option<String>,

    /// A file whose contents are written to the command's stdin. `-` reads from our stdin.
    #[arg(long)]
    pub stdin_file: Option<PathBuf>,

    /// Options controlling how output is shown and how failures are reported.
    #[command(flatten)]
    pub output: OutputOpts,

    /// Kill the command if it takes longer than this, like `30s` or `5m`.
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Options to modify logging and error-handling behavior.
    #[command(flatten)]
    pub logging: LoggingOpts,
}

/// Options controlling how output is shown and how failures are reported.
#[derive(Debug, Clone, clap::Args)]
#[clap(next_help_heading = "Output options")]
pub struct OutputOpts {
    /// Don't fail when the command exits with a non-zero code.
    ///
    /// `shellby` still exits with the command's exit code.
    #[arg(long)]
    pub no_check: bool,

    /// Don't display output as it arrives. The captured output is printed when the command
    /// finishes instead.
    #[arg(long)]
    pub no_display: bool,

    /// Don't keep the command's output.
    #[arg(long)]
    pub no_capture: bool,

    /// Don't print anything about the command: no banner, no output lines, no exit status.
    #[arg(long, short)]
    pub quiet: bool,

    /// Where to display the command's progress.
    #[arg(long, value_enum, default_value_t = SinkKind::Terminal)]
    pub sink: SinkKind,
}

/// A choice of [`crate::OutputSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SinkKind {
    /// Print labeled lines to stderr.
    Terminal,
    /// Emit `tracing` log events.
    Tracing,
}

/// Options to modify logging and error-handling behavior.
#[derive(Debug, Clone, clap::Args)]
#[clap(next_help_heading = "Logging options")]
pub struct LoggingOpts {
    #[allow(rustdoc::bare_urls)]
    /// Tracing filter.
    ///
    /// Can be any of "error", "warn", "info", "debug", or
    /// "trace". Supports more granular filtering, as well.
    /// See: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html
    ///
    /// A nice value is "shellby=debug".
    #[arg(long, default_value = "shellby=info")]
    pub tracing_filter: String,
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|err| {
        format!("{err}; durations look like `500ms`, `30s`, or `1h 30m`")
    })
}

impl ExecutionRequest {
    /// Construct a request from the command-line options, reading stdin data if requested.
    pub async fn from_cli(opts: &Opts) -> miette::Result<Self> {
        let mut command = match opts.command.as_slice() {
            [raw] => Command::new(raw.as_str()),
            args => Command::from_args(args)?,
        };
        command.set_user(opts.user.clone());
        command.set_directory(opts.directory.clone());

        let mut request = Self::new(command)
            .check(!opts.output.no_check)
            .display(!opts.output.no_display)
            .capture(!opts.output.no_capture)
            .quiet(opts.output.quiet);
        request.name = opts.name.clone();
        request.cwd = opts.cwd.clone();
        request.stdin = read_stdin(opts).await?;

        if opts.output.sink == SinkKind::Tracing {
            request = request.sink(Arc::new(TracingSink::new(opts.name.as_deref())));
        }

        Ok(request)
    }
}

async fn read_stdin(opts: &Opts) -> miette::Result<Option<Stdin>> {
    if let Some(text) = &opts.stdin {
        return Ok(Some(Stdin::Text(text.clone())));
    }

    let Some(path) = &opts.stdin_file else {
        return Ok(None);
    };

    let bytes = if path.as_os_str() == "-" {
        let mut bytes = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut bytes)
            .await
            .into_diagnostic()
            .wrap_err("Failed to read stdin")?;
        bytes
    } else {
        tokio::fs::read(path)
            .await
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read {path:?}"))?
    };
    Ok(Some(Stdin::Bytes(bytes)))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Opts::command().debug_assert();
    }

    #[tokio::test]
    async fn test_single_argument_is_raw_shell() {
        let opts = Opts::parse_from(["shellby", "--name", "x", "echo $HOME | wc -c"]);
        let request = ExecutionRequest::from_cli(&opts).await.unwrap();
        assert_eq!(request.command.raw(), "echo $HOME | wc -c");
        assert_eq!(request.name.as_deref(), Some("x"));
        assert!(request.check);
        assert!(request.sink.is_none());
    }

    #[tokio::test]
    async fn test_multiple_arguments_are_quoted() {
        let opts = Opts::parse_from([
            "shellby",
            "--user",
            "root",
            "--no-check",
            "--",
            "grep",
            "-r",
            "two words",
            "/etc",
        ]);
        let request = ExecutionRequest::from_cli(&opts).await.unwrap();
        assert_eq!(request.command.raw(), "grep -r 'two words' /etc");
        assert_eq!(request.command.user(), Some("root"));
        assert!(!request.check);
    }

    #[tokio::test]
    async fn test_stdin_and_sink() {
        let opts = Opts::parse_from([
            "shellby",
            "--stdin",
            "hello",
            "--sink",
            "tracing",
            "--timeout",
            "1m 30s",
            "cat",
        ]);
        assert_eq!(opts.timeout, Some(Duration::from_secs(90)));
        let request = ExecutionRequest::from_cli(&opts).await.unwrap();
        assert_eq!(request.stdin, Some(Stdin::Text("hello".to_owned())));
        assert!(request.sink.is_some());
    }

    #[test]
    fn test_stdin_conflicts_with_stdin_file() {
        assert!(Opts::try_parse_from([
            "shellby",
            "--stdin",
            "a",
            "--stdin-file",
            "b",
            "cat"
        ])
        .is_err());
    }

    #[test]
    fn test_bad_timeout() {
        let err = Opts::try_parse_from(["shellby", "--timeout", "soon", "true"]).unwrap_err();
        assert!(err.to_string().contains("durations look like"), "{err}");
    }
}
