// CLI subcommand dispatch.

use clap::Subcommand;
use serde::Serialize;

use docpilot_engine::sequencer::WriteReport;

use crate::output::{self, OutputFormat};

pub mod append;
pub mod copy;
pub mod create;
pub mod delete;
pub mod insert;
pub mod read;
pub mod replace;
pub mod search;
pub mod update;

#[derive(Subcommand)]
pub enum Command {
    /// Create a document from markdown
    Create(create::CreateArgs),
    /// Print a document's title and plain text
    Read(read::ReadArgs),
    /// Replace a document's whole body with markdown
    Update(update::UpdateArgs),
    /// Append markdown after a document's content
    Append(append::AppendArgs),
    /// Case-insensitive search with surrounding context
    Search(search::SearchArgs),
    /// Insert plain text at an anchor
    Insert(insert::InsertArgs),
    /// Replace every occurrence of a literal string
    Replace(replace::ReplaceArgs),
    /// Delete every occurrence of a literal string
    Delete(delete::DeleteArgs),
    /// Copy a document under a new name
    Copy(copy::CopyArgs),
}

pub fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Create(args) => create::run(args),
        Command::Read(args) => read::run(args),
        Command::Update(args) => update::run(args),
        Command::Append(args) => append::run(args),
        Command::Search(args) => search::run(args),
        Command::Insert(args) => insert::run(args),
        Command::Replace(args) => replace::run(args),
        Command::Delete(args) => delete::run(args),
        Command::Copy(args) => copy::run(args),
    }
}

/// Prints a command's result, or its error, in `format`.
pub(crate) fn finish<T, F>(
    format: OutputFormat,
    result: anyhow::Result<T>,
    human_fn: F,
) -> anyhow::Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match result {
        Ok(value) => {
            output::print_output(format, &value, human_fn)?;
            Ok(())
        }
        Err(error) => {
            output::print_anyhow_error(format, &error);
            Err(error)
        }
    }
}

/// Like `finish`, but first warns about any skipped formatting batch.
pub(crate) fn finish_write(
    format: OutputFormat,
    result: anyhow::Result<WriteReport>,
    verb: &str,
) -> anyhow::Result<()> {
    if let Ok(report) = &result {
        output::print_formatting_warnings(format, &report.formatting);
    }
    finish(format, result, |report| format_write_report(verb, report))
}

pub(crate) fn format_write_report(verb: &str, report: &WriteReport) -> String {
    let mut line = format!(
        "{verb} {}: {} characters at offset {}",
        report.document_id, report.inserted_length, report.inserted_at
    );
    if report.tables > 0 {
        line.push_str(&format!(" ({} table(s))", report.tables));
    }
    if !report.formatting.is_clean() {
        line.push_str(&format!(
            "; {} of {} formatting batch(es) skipped",
            report.formatting.failed_batches.len(),
            report.formatting.batches
        ));
    }
    line
}
