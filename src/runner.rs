//! Running a command: spawning it, draining its output, feeding its input, and reporting the
//! result.

use std::io::ErrorKind;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::process::ChildStdin;
use tracing::instrument;

use crate::cwd::resolve_cwd;
use crate::process_group::ProcessGroup;
use crate::result::exit_code;
use crate::Error;
use crate::ExecutionRequest;
use crate::ExecutionResult;
use crate::OutputSink;
use crate::SilentSink;
use crate::StreamTailer;
use crate::TerminalSink;

/// Run a command to completion.
///
/// Stdout and stderr are drained concurrently with each other and with writing stdin, so a child
/// which writes a lot of output before reading all of its input can't deadlock. The result is
/// produced only after both streams are closed and the child has exited.
///
/// Fails with [`Error::Execution`] if the command exits with a non-zero code and
/// [`ExecutionRequest::check`] is set. The captured output is available from the error.
///
/// The command runs in its own process group. Dropping the returned future before it completes
/// (for example, with [`tokio::time::timeout`]) kills the whole group, including anything the
/// command started in the background.
#[instrument(skip_all, level = "debug", fields(command = request.command.raw()))]
pub async fn run(request: ExecutionRequest) -> crate::Result<ExecutionResult> {
    let sink: Arc<dyn OutputSink> = if request.quiet {
        Arc::new(SilentSink)
    } else {
        match &request.sink {
            Some(sink) => sink.clone(),
            None => Arc::new(TerminalSink::stderr(request.name.as_deref())),
        }
    };
    let check = request.check;

    let result = match execute(request, sink.clone()).await {
        Ok(result) => result,
        Err(err) => {
            sink.fail(&err);
            return Err(err);
        }
    };

    if check && !result.success() {
        return Err(Error::Execution(result));
    }
    Ok(result)
}

/// Run a command to completion, blocking the current thread.
///
/// This starts a single-threaded runtime for the duration of the command. It fails immediately
/// with [`Error::NestedRuntime`] if called from inside an async runtime; use [`run`] there
/// instead.
pub fn run_blocking(request: ExecutionRequest) -> crate::Result<ExecutionResult> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(Error::NestedRuntime);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|source| Error::Runtime { source })?;
    runtime.block_on(run(request))
}

async fn execute(
    request: ExecutionRequest,
    sink: Arc<dyn OutputSink>,
) -> crate::Result<ExecutionResult> {
    let ExecutionRequest {
        command,
        stdin,
        cwd,
        display,
        capture,
        ..
    } = request;

    let mut process = command.to_tokio(stdin.is_some());
    if let Some(cwd) = cwd {
        process.current_dir(resolve_cwd(&cwd)?);
    }

    sink.announce(command.raw(), command.is_privileged());

    let invocation = command.display();
    tracing::debug!(invocation, "Starting command");
    let mut child = ProcessGroup::spawn(&mut process).map_err(|source| Error::Spawn {
        invocation: invocation.clone(),
        source,
    })?;

    let stdout = child
        .inner()
        .stdout
        .take()
        .ok_or_else(|| missing_pipe("stdout"))?;
    let stderr = child
        .inner()
        .stderr
        .take()
        .ok_or_else(|| missing_pipe("stderr"))?;
    let stdin_pipe = child.inner().stdin.take();

    let stdout = StreamTailer::new("stdout", stdout, sink.clone())
        .with_display(display)
        .with_capture(capture)
        .run();
    let stderr = StreamTailer::new("stderr", stderr, sink.clone())
        .with_display(display)
        .with_capture(capture)
        .run();
    let stdin = async {
        match (stdin_pipe, stdin) {
            (Some(pipe), Some(stdin)) => write_stdin(pipe, stdin.as_bytes()).await,
            _ => Ok(()),
        }
    };

    // Both readers are polled before the first write, and all three make progress together.
    let (stdout, stderr, stdin) = tokio::join!(stdout, stderr, stdin);

    // The output streams are closed, but the child may still be running.
    let status = child.wait().await.map_err(|source| Error::Io {
        stream: "child",
        source,
    })?;
    let code = exit_code(status);
    tracing::debug!(code, %status, "Command exited");

    stdin?;
    let stdout = stdout?;
    let stderr = stderr?;

    sink.finish(code);

    Ok(ExecutionResult {
        code,
        stdout,
        stderr,
    })
}

/// Write all of `data` to the child's stdin, then close it so the child sees end-of-file.
#[instrument(skip_all, level = "debug", fields(bytes = data.len()))]
async fn write_stdin(mut pipe: ChildStdin, data: &[u8]) -> crate::Result<()> {
    let result = async {
        pipe.write_all(data).await?;
        pipe.flush().await?;
        pipe.shutdown().await
    }
    .await;
    drop(pipe);

    match result {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::BrokenPipe => {
            // The child exited (or closed stdin) without reading everything. That's its business.
            tracing::debug!("Child closed stdin before reading all input");
            Ok(())
        }
        Err(source) => Err(Error::Io {
            stream: "stdin",
            source,
        }),
    }
}

fn missing_pipe(stream: &'static str) -> Error {
    Error::Io {
        stream,
        source: std::io::Error::new(ErrorKind::BrokenPipe, format!("{stream} was not piped")),
    }
}
