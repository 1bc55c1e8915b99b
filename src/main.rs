//! `shellby` runs a shell command, labeling each line of its output as it arrives and reporting
//! how it exited.

use clap::Parser;
use miette::IntoDiagnostic;
use miette::WrapErr;
use nix::sys::signal::Signal;
use shellby::cli;
use shellby::Error;
use shellby::ExecutionRequest;
use shellby::ExecutionResult;
use tokio::io::AsyncWriteExt;

#[tokio::main]
async fn main() -> miette::Result<()> {
    miette::set_panic_hook();
    let opts = cli::Opts::parse();
    shellby::install_tracing(&opts.logging.tracing_filter)?;

    let request = ExecutionRequest::from_cli(&opts).await?;
    let displayed = request.display;

    let run = async {
        match opts.timeout {
            Some(timeout) => tokio::time::timeout(timeout, shellby::run(request))
                .await
                .into_diagnostic()
                .wrap_err_with(|| {
                    format!(
                        "Command timed out after {}",
                        humantime::format_duration(timeout)
                    )
                }),
            None => Ok(shellby::run(request).await),
        }
    };

    // Dropping the run kills the command's process group.
    let outcome = tokio::select! {
        outcome = run => Some(outcome?),
        interrupt = tokio::signal::ctrl_c() => {
            interrupt.into_diagnostic().wrap_err("Failed to listen for Ctrl-C")?;
            None
        }
    };
    let Some(outcome) = outcome else {
        tracing::debug!("Interrupted");
        std::process::exit(exit_status(-(Signal::SIGINT as i32)));
    };

    let result = match outcome {
        Ok(result) => result,
        Err(Error::Execution(result)) => result,
        Err(err) => return Err(err.into()),
    };

    if !displayed {
        print_captured(&result).await?;
    }

    match exit_status(result.code) {
        0 => Ok(()),
        code => std::process::exit(code),
    }
}

/// Write captured output to our own stdout and stderr.
async fn print_captured(result: &ExecutionResult) -> miette::Result<()> {
    if let Some(stdout) = &result.stdout {
        let mut writer = tokio::io::stdout();
        writer.write_all(stdout.as_bytes()).await.into_diagnostic()?;
        writer.flush().await.into_diagnostic()?;
    }
    if let Some(stderr) = &result.stderr {
        let mut writer = tokio::io::stderr();
        writer.write_all(stderr.as_bytes()).await.into_diagnostic()?;
        writer.flush().await.into_diagnostic()?;
    }
    Ok(())
}

/// Map a command's exit code to ours, following the shell convention of `128 + signal` for
/// commands killed by a signal.
fn exit_status(code: i32) -> i32 {
    if code < 0 {
        128 - code
    } else {
        code
    }
}
