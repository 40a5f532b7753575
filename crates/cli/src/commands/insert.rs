// `docpilot insert`: plain text at an anchor.

use anyhow::Context;
use clap::Args;

use docpilot_engine::sequencer::InsertReport;
use docpilot_engine::{Anchor, DocumentHandle};

use crate::client;
use crate::input::{parse_document_id, ContentArgs};
use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct InsertArgs {
    /// Document id or URL.
    #[arg(value_parser = parse_document_id)]
    pub document: String,

    /// Where to insert: `start`, `end`, an offset, or `after:<text>`.
    #[arg(long, default_value = "end")]
    pub at: Anchor,

    #[command(flatten)]
    pub content: ContentArgs,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: InsertArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let (document, anchor) = (args.document, args.at);
    let result =
        args.content.resolve().and_then(|text| client::run(insert(document, anchor, text)));
    super::finish(format, result, format_human)
}

async fn insert(
    document_id: String,
    anchor: Anchor,
    text: String,
) -> anyhow::Result<InsertReport> {
    let sequencer = client::connect()?;
    let mut handle = DocumentHandle::new(document_id);
    sequencer
        .insert_at(&mut handle, &anchor, &text)
        .await
        .with_context(|| format!("failed to insert at {anchor} in {}", handle.document_id()))
}

fn format_human(report: &InsertReport) -> String {
    format!(
        "Inserted {} characters at offset {} in {}",
        report.length, report.index, report.document_id
    )
}
