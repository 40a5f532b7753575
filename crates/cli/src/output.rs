// Output format auto-detection for the CLI.
//
// TTY → human-readable text. Piped/redirected → structured JSON.
// `--json` flag forces JSON output regardless of terminal.

use serde::Serialize;
use std::io::{self, IsTerminal, Write};

use docpilot_engine::config::DEFAULT_TOKEN_ENV;
use docpilot_engine::sequencer::FormattingReport;
use docpilot_engine::DocsError;

use crate::exit_code::UsageError;

const ANSI_RED: &str = "\x1b[31m";
const ANSI_YELLOW: &str = "\x1b[33m";
const ANSI_RESET: &str = "\x1b[0m";

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    /// JSON if `--json` was passed or stdout is not a TTY.
    pub fn detect(json_flag: bool) -> Self {
        if json_flag {
            return Self::Json;
        }
        Self::detect_from_terminal(io::stdout().is_terminal())
    }

    pub fn detect_from_terminal(is_tty: bool) -> Self {
        if is_tty {
            Self::Human
        } else {
            Self::Json
        }
    }
}

/// Write a value to stdout in the selected format.
pub fn print_output<T, F>(format: OutputFormat, value: &T, human_fn: F) -> io::Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    write_output(&mut io::stdout().lock(), format, value, human_fn)
}

pub fn write_output<W, T, F>(
    writer: &mut W,
    format: OutputFormat,
    value: &T,
    human_fn: F,
) -> io::Result<()>
where
    W: Write,
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Human => {
            writeln!(writer, "{}", human_fn(value))
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *writer, value).map_err(io::Error::other)?;
            writeln!(writer)
        }
    }
}

pub fn print_error(format: OutputFormat, code: &str, message: &str) {
    print_stderr(format, "error", ANSI_RED, code, message);
}

pub fn print_warning(format: OutputFormat, code: &str, message: &str) {
    print_stderr(format, "warning", ANSI_YELLOW, code, message);
}

fn print_stderr(format: OutputFormat, label: &str, color: &str, code: &str, message: &str) {
    let mut err = io::stderr().lock();
    match format {
        OutputFormat::Human => {
            let line = render_human_stderr_line(label, message, io::stderr().is_terminal(), color);
            let _ = writeln!(err, "{line}");
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({ label: { "code": code, "message": message } });
            let _ = serde_json::to_writer(&mut err, &obj);
            let _ = writeln!(err);
        }
    }
}

/// One warning per formatting batch the service rejected.
pub fn print_formatting_warnings(format: OutputFormat, report: &FormattingReport) {
    for failed in &report.failed_batches {
        let span = failed
            .range
            .map(|range| format!(" over [{}, {})", range.start, range.end))
            .unwrap_or_default();
        print_warning(
            format,
            "FORMATTING_SKIPPED",
            &format!("formatting batch {}{span} was skipped: {}", failed.index, failed.message),
        );
    }
}

/// Print a mapped, actionable error for a command failure.
pub fn print_anyhow_error(format: OutputFormat, error: &anyhow::Error) {
    let (code, message) = actionable_error(error);
    print_error(format, code, &message);
}

fn actionable_error(error: &anyhow::Error) -> (&'static str, String) {
    let message = format!("{error:#}");

    for cause in error.chain() {
        if let Some(usage) = cause.downcast_ref::<UsageError>() {
            return ("USAGE", usage.to_string());
        }
        let Some(docs) = cause.downcast_ref::<DocsError>() else {
            continue;
        };
        return match docs {
            DocsError::RemoteNotFound { document_id } => (
                "DOCUMENT_NOT_FOUND",
                format!(
                    "Document {document_id} not found. Check the id, or share the document \
                     with the account behind the access token."
                ),
            ),
            DocsError::LocationNotFound { .. } => ("LOCATION_NOT_FOUND", message),
            DocsError::MissingToken { variable } => (
                "AUTH_MISSING_TOKEN",
                format!("No access token found. Run: export {variable}=<token>"),
            ),
            DocsError::Auth { .. } => (
                "AUTH_FAILURE",
                format!(
                    "{message}. Refresh the token in {DEFAULT_TOKEN_ENV} (or service.token_env)."
                ),
            ),
            DocsError::RateLimited { .. } => ("RATE_LIMITED", message),
            DocsError::Transport { .. } => ("NETWORK_ERROR", message),
            DocsError::InvalidEndpoint { .. } => ("CONFIG_ERROR", message),
            _ => ("REQUEST_FAILED", message),
        };
    }

    ("REQUEST_FAILED", message)
}

fn render_human_stderr_line(label: &str, message: &str, is_tty: bool, color: &str) -> String {
    if is_tty {
        format!("{color}{label}:{ANSI_RESET} {message}")
    } else {
        format!("{label}: {message}")
    }
}
