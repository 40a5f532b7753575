// `docpilot copy`: duplicate a document under a new name.

use anyhow::Context;
use clap::Args;

use docpilot_engine::{DocumentHandle, RemoteDocument};

use crate::client;
use crate::input::parse_document_id;
use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct CopyArgs {
    /// Document id or URL.
    #[arg(value_parser = parse_document_id)]
    pub document: String,

    /// Name of the copy.
    pub name: String,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: CopyArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = client::run(copy(args.document, args.name));
    super::finish(format, result, |copy| {
        format!("Copied to {} (\"{}\")", copy.document_id, copy.title)
    })
}

async fn copy(document_id: String, name: String) -> anyhow::Result<RemoteDocument> {
    let sequencer = client::connect()?;
    let handle = DocumentHandle::new(document_id);
    sequencer
        .copy(&handle, &name)
        .await
        .with_context(|| format!("failed to copy document {}", handle.document_id()))
}
