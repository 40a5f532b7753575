// `docpilot read`: title and plain text of a document.

use anyhow::Context;
use clap::Args;

use docpilot_engine::sequencer::DocumentText;
use docpilot_engine::DocumentHandle;

use crate::client;
use crate::input::parse_document_id;
use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct ReadArgs {
    /// Document id or URL.
    #[arg(value_parser = parse_document_id)]
    pub document: String,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: ReadArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = client::run(read(args.document));
    super::finish(format, result, format_human)
}

async fn read(document_id: String) -> anyhow::Result<DocumentText> {
    let sequencer = client::connect()?;
    let mut handle = DocumentHandle::new(document_id);
    sequencer
        .read(&mut handle)
        .await
        .with_context(|| format!("failed to read document {}", handle.document_id()))
}

fn format_human(document: &DocumentText) -> String {
    let title = if document.title.is_empty() { "(untitled)" } else { document.title.as_str() };
    format!("# {title}\n\n{}", document.text.trim_end_matches('\n'))
}
