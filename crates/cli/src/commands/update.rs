// `docpilot update`: replace a document's body with markdown.

use anyhow::Context;
use clap::Args;

use docpilot_engine::sequencer::WriteReport;
use docpilot_engine::DocumentHandle;

use crate::client;
use crate::input::{parse_document_id, ContentArgs};
use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Document id or URL.
    #[arg(value_parser = parse_document_id)]
    pub document: String,

    #[command(flatten)]
    pub content: ContentArgs,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: UpdateArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let document = args.document;
    let result =
        args.content.resolve().and_then(|markdown| client::run(update(document, markdown)));
    super::finish_write(format, result, "Updated")
}

async fn update(document_id: String, markdown: String) -> anyhow::Result<WriteReport> {
    let sequencer = client::connect()?;
    let mut handle = DocumentHandle::new(document_id);
    sequencer
        .replace_all(&mut handle, &markdown)
        .await
        .with_context(|| format!("failed to update document {}", handle.document_id()))
}
