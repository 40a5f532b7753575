// Markdown compiler: table extraction, lexing, and formatting-operation synthesis.

pub mod lexer;
pub mod table;

pub use lexer::{parse_markdown, parse_markdown_at, ParsedMarkdown};
pub use table::{extract_tables, ExtractedTables};

use crate::format::build_formatting_operations;
use crate::types::{ContentStream, MutationOperation, PlaceholderPosition, Segment, Table};

/// Everything the sequencer needs to write one markdown payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDocument {
    pub content: ContentStream,
    pub segments: Vec<Segment>,
    pub placeholders: Vec<PlaceholderPosition>,
    /// Tables in discovery order.
    pub tables: Vec<Table>,
    /// Formatting operations in class order.
    pub operations: Vec<MutationOperation>,
}

impl CompiledDocument {
    /// Moves every offset by `delta`, as if the stream were inserted `delta` later.
    ///
    /// Operations are rebuilt from the shifted segments rather than patched.
    pub fn shifted(&self, delta: u32) -> Self {
        let segments: Vec<Segment> = self.segments.iter().map(|s| s.shifted(delta)).collect();
        let operations = build_formatting_operations(&segments);
        Self {
            content: self.content.shifted(delta),
            segments,
            placeholders: self
                .placeholders
                .iter()
                .map(|p| PlaceholderPosition {
                    placeholder_id: p.placeholder_id.clone(),
                    index: p.index + delta,
                })
                .collect(),
            tables: self.tables.clone(),
            operations,
        }
    }

    /// Known offset of the placeholder line for `table`.
    pub fn placeholder_index(&self, table: &Table) -> Option<u32> {
        self.placeholders
            .iter()
            .find(|p| p.placeholder_id == table.placeholder_id)
            .map(|p| p.index)
    }
}

/// Runs the full pipeline with offsets starting at the document origin.
pub fn compile(markdown: &str) -> CompiledDocument {
    let ExtractedTables { tables, markdown } = extract_tables(markdown);
    let ParsedMarkdown { content, segments, mut placeholders } = parse_markdown(&markdown);
    // Token lines typed by the author are plain text.
    placeholders.retain(|p| tables.iter().any(|t| t.placeholder_id == p.placeholder_id));
    let operations = build_formatting_operations(&segments);

    CompiledDocument { content, segments, placeholders, tables, operations }
}
