// `docpilot replace`: literal, case-sensitive, global replace.

use anyhow::Context;
use clap::Args;
use serde::Serialize;

use docpilot_engine::DocumentHandle;

use crate::client;
use crate::input::parse_document_id;
use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct ReplaceArgs {
    /// Document id or URL.
    #[arg(value_parser = parse_document_id)]
    pub document: String,

    /// Exact text to find.
    pub find: String,

    /// Text to put in its place.
    pub replacement: String,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

/// Shared by `replace` and `delete`.
#[derive(Debug, Clone, Serialize)]
pub struct ReplaceResult {
    pub document_id: String,
    pub find: String,
    pub replacement: String,
    pub occurrences: u32,
}

pub fn run(args: ReplaceArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = client::run(replace(args.document, args.find, args.replacement));
    super::finish(format, result, format_human)
}

pub(crate) async fn replace(
    document_id: String,
    find: String,
    replacement: String,
) -> anyhow::Result<ReplaceResult> {
    let sequencer = client::connect()?;
    let mut handle = DocumentHandle::new(document_id);
    let occurrences = sequencer
        .replace_text(&mut handle, &find, &replacement)
        .await
        .with_context(|| format!("failed to replace text in {}", handle.document_id()))?;

    Ok(ReplaceResult {
        document_id: handle.document_id().to_string(),
        find,
        replacement,
        occurrences,
    })
}

pub(crate) fn format_human(result: &ReplaceResult) -> String {
    let (find, document_id) = (&result.find, &result.document_id);
    let action = if result.replacement.is_empty() { "Deleted" } else { "Replaced" };
    match result.occurrences {
        0 => format!("No occurrences of \"{find}\" in {document_id}."),
        n => format!("{action} {n} occurrence(s) of \"{find}\" in {document_id}."),
    }
}
