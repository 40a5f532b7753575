// Consistent exit codes for the docpilot CLI.
//
//   0  = success
//   1  = general error
//   2  = usage/argument error
//   3  = document not found
//   4  = location (anchor, placeholder, table cell) not found
//   11 = authentication error
//   12 = rate limited
//   13 = network error

use std::process;

use docpilot_engine::DocsError;

/// Named exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    Usage = 2,
    NotFound = 3,
    LocationNotFound = 4,
    Auth = 11,
    RateLimited = 12,
    Network = 13,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map an anyhow error to an exit code by inspecting the error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(docs_err) = cause.downcast_ref::<DocsError>() {
                return Self::from_docs_error(docs_err);
            }
            if cause.downcast_ref::<UsageError>().is_some() {
                return Self::Usage;
            }
            if let Some(io_err) = cause.downcast_ref::<std::io::Error>() {
                return match io_err.kind() {
                    std::io::ErrorKind::TimedOut => Self::Network,
                    _ => Self::Error,
                };
            }
        }
        Self::Error
    }

    pub fn from_docs_error(err: &DocsError) -> Self {
        match err {
            DocsError::RemoteNotFound { .. } => Self::NotFound,
            DocsError::LocationNotFound { .. } => Self::LocationNotFound,
            DocsError::Auth { .. } | DocsError::MissingToken { .. } => Self::Auth,
            DocsError::RateLimited { .. } => Self::RateLimited,
            DocsError::Transport { .. } => Self::Network,
            DocsError::InvalidEndpoint { .. } => Self::Usage,
            DocsError::Remote { .. }
            | DocsError::Decode { .. }
            | DocsError::UnresolvedOperation { .. }
            | DocsError::InvalidOperation { .. } => Self::Error,
        }
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code.code() as u8)
    }
}

/// A bad argument combination caught after clap parsing.
#[derive(Debug)]
pub struct UsageError {
    pub message: String,
}

impl UsageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl std::fmt::Display for UsageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for UsageError {}
