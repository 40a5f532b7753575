// `docpilot search`: case-insensitive search within one document.

use anyhow::Context;
use clap::Args;
use serde::Serialize;

use docpilot_common::document::SearchMatch;
use docpilot_engine::DocumentHandle;

use crate::client;
use crate::input::parse_document_id;
use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Document id or URL.
    #[arg(value_parser = parse_document_id)]
    pub document: String,

    /// Text to look for.
    pub term: String,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub document_id: String,
    pub term: String,
    pub total: usize,
    pub matches: Vec<SearchMatch>,
}

pub fn run(args: SearchArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = client::run(search(args.document, args.term));
    super::finish(format, result, format_human)
}

async fn search(document_id: String, term: String) -> anyhow::Result<SearchResult> {
    let sequencer = client::connect()?;
    let mut handle = DocumentHandle::new(document_id);
    let matches = sequencer
        .search(&mut handle, &term)
        .await
        .with_context(|| format!("failed to search document {}", handle.document_id()))?;

    Ok(SearchResult {
        document_id: handle.document_id().to_string(),
        term,
        total: matches.len(),
        matches,
    })
}

fn format_human(result: &SearchResult) -> String {
    if result.matches.is_empty() {
        return format!("No matches for \"{}\".", result.term);
    }

    let mut lines = vec![format!("{} match(es) for \"{}\":", result.total, result.term)];
    for hit in &result.matches {
        let context = hit.context.replace('\n', " ");
        lines.push(format!("  [{}, {})  ...{context}...", hit.start, hit.end));
    }
    lines.join("\n")
}
