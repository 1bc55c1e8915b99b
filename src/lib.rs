//! `shellby` runs shell commands with `sudo` impersonation, working-directory scoping, and stdin
//! piping, streaming both output channels to a display line-by-line while capturing them.
//!
//! ```no_run
//! # fn main() -> shellby::Result<()> {
//! use shellby::ExecutionRequest;
//!
//! let result = shellby::run_blocking(
//!     ExecutionRequest::new("make -j4")
//!         .name("build")
//!         .directory("/srv/app"),
//! )?;
//! assert_eq!(result.code, 0);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod buffers;
pub mod cli;
mod command;
mod cwd;
mod error;
mod process_group;
mod quote;
mod request;
mod result;
mod runner;
mod sink;
mod tailer;
mod tracing;

pub use command::build_invocation;
pub use command::Command;
pub use command::SHELL;
pub use error::Error;
pub use error::Result;
pub use quote::join_arguments;
pub use quote::quote;
pub use quote::ShellArg;
pub use request::ExecutionRequest;
pub use request::Stdin;
pub use result::ExecutionResult;
pub use runner::run;
pub use runner::run_blocking;
pub use sink::OutputSink;
pub use sink::RecordingSink;
pub use sink::SilentSink;
pub use sink::SinkEvent;
pub use sink::TerminalSink;
pub use sink::TracingSink;
pub use tailer::StreamTailer;
pub use self::tracing::install_tracing;

#[cfg(test)]
mod fake_reader;
