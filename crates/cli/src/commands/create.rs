// `docpilot create`: new document from markdown.

use anyhow::Context;
use clap::Args;

use docpilot_engine::sequencer::WriteReport;

use crate::client;
use crate::input::ContentArgs;
use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Title of the new document.
    pub title: String,

    #[command(flatten)]
    pub content: ContentArgs,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: CreateArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let title = args.title;
    let result = args.content.resolve().and_then(|markdown| client::run(create(title, markdown)));
    super::finish_write(format, result, "Created")
}

async fn create(title: String, markdown: String) -> anyhow::Result<WriteReport> {
    let sequencer = client::connect()?;
    sequencer
        .create(&title, &markdown)
        .await
        .with_context(|| format!("failed to create document `{title}`"))
}
