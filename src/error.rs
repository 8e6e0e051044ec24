use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Usage(#[from] clap::Error),

    #[error("{0}")]
    Precondition(String),

    #[error("{0}")]
    Io(String),

    #[error("{role} {} failed ({status}){}", .program.display(), format_stderr(.stderr))]
    Tool {
        role: &'static str,
        program: PathBuf,
        status: ExitStatus,
        stderr: String,
    },

    #[error("interrupted by signal {0}")]
    Interrupted(i32),
}

impl Error {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Usage(err) if !err.use_stderr() => 0,
            Error::Interrupted(signal) => 128 + signal,
            _ => 1,
        }
    }
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\n{}", trimmed)
    }
}
