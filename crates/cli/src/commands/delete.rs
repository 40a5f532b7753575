// `docpilot delete`: remove every occurrence of a literal string.

use clap::Args;

use crate::client;
use crate::commands::replace;
use crate::input::parse_document_id;
use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Document id or URL.
    #[arg(value_parser = parse_document_id)]
    pub document: String,

    /// Exact text to delete.
    pub text: String,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: DeleteArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = client::run(replace::replace(args.document, args.text, String::new()));
    super::finish(format, result, replace::format_human)
}
