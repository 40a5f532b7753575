// Read-side model of a remote document: an element tree with absolute offsets.

use serde::{Deserialize, Serialize};

use crate::types::{Range, DOCUMENT_ORIGIN};

/// Characters of context shown on each side of a search match.
pub const SEARCH_CONTEXT_CHARS: usize = 40;

/// A full read of a remote document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentSnapshot {
    pub document_id: String,
    pub title: String,
    pub body: Vec<StructuralElement>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StructuralElement {
    pub start: u32,
    pub end: u32,
    pub content: ElementContent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementContent {
    Paragraph { runs: Vec<TextRun> },
    Table(TableElement),
    SectionBreak,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextRun {
    pub start: u32,
    pub end: u32,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableElement {
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableCell {
    pub start: u32,
    pub end: u32,
    pub content: Vec<StructuralElement>,
}

impl TableCell {
    /// Offset where text typed into the cell lands.
    pub fn content_start(&self) -> u32 {
        self.content.first().map(|element| element.start).unwrap_or(self.start + 1)
    }
}

impl TableElement {
    pub fn cell(&self, row: usize, col: usize) -> Option<&TableCell> {
        self.rows.get(row).and_then(|r| r.cells.get(col))
    }
}

/// One hit from a case-insensitive document search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchMatch {
    pub start: u32,
    pub end: u32,
    pub text: String,
    pub context: String,
}

#[derive(Debug, Clone, Copy)]
struct IndexedChar {
    offset: u32,
    ch: char,
}

impl IndexedChar {
    fn end(self) -> u32 {
        self.offset + self.ch.len_utf16() as u32
    }
}

impl DocumentSnapshot {
    /// Exclusive end offset of the body, including the trailing newline.
    pub fn end_of_content(&self) -> u32 {
        self.body.last().map(|element| element.end).unwrap_or(DOCUMENT_ORIGIN + 1)
    }

    /// Every text run in document order, descending into table cells.
    pub fn text_runs(&self) -> Vec<&TextRun> {
        let mut runs = Vec::new();
        collect_runs(&self.body, &mut runs);
        runs
    }

    /// The document text with runs concatenated in document order.
    pub fn plain_text(&self) -> String {
        self.text_runs().into_iter().map(|run| run.text.as_str()).collect()
    }

    /// First table element whose start offset is at or after `index`.
    pub fn first_table_at_or_after(
        &self,
        index: u32,
    ) -> Option<(&StructuralElement, &TableElement)> {
        self.body.iter().find_map(|element| match &element.content {
            ElementContent::Table(table) if element.start >= index => Some((element, table)),
            _ => None,
        })
    }

    /// Whether `text` sits at exactly `index`.
    pub fn text_at(&self, index: u32, text: &str) -> bool {
        self.find_literal(text, index).is_some_and(|range| range.start == index)
    }

    /// First case-sensitive occurrence of `needle` starting at or after `from`.
    pub fn find_literal(&self, needle: &str, from: u32) -> Option<Range> {
        let chars = self.indexed_chars();
        let needle: Vec<char> = needle.chars().collect();
        if needle.is_empty() {
            return None;
        }

        (0..chars.len())
            .filter(|&i| chars[i].offset >= from)
            .find_map(|i| match_at(&chars, i, &needle, |a, b| a == b))
    }

    /// Every case-insensitive, non-overlapping occurrence of `term`.
    pub fn search(&self, term: &str) -> Vec<SearchMatch> {
        let chars = self.indexed_chars();
        let needle: Vec<char> = term.chars().collect();
        let mut matches = Vec::new();
        if needle.is_empty() {
            return matches;
        }

        let mut i = 0;
        while i < chars.len() {
            let Some(range) = match_at(&chars, i, &needle, chars_eq_ignore_case) else {
                i += 1;
                continue;
            };
            let last = i + needle.len();
            matches.push(SearchMatch {
                start: range.start,
                end: range.end,
                text: chars[i..last].iter().map(|c| c.ch).collect(),
                context: context_window(&chars, i, last),
            });
            i = last;
        }

        matches
    }

    fn indexed_chars(&self) -> Vec<IndexedChar> {
        let mut chars = Vec::new();
        for run in self.text_runs() {
            let mut offset = run.start;
            for ch in run.text.chars() {
                chars.push(IndexedChar { offset, ch });
                offset += ch.len_utf16() as u32;
            }
        }
        chars
    }
}

fn collect_runs<'a>(elements: &'a [StructuralElement], runs: &mut Vec<&'a TextRun>) {
    for element in elements {
        match &element.content {
            ElementContent::Paragraph { runs: paragraph_runs } => runs.extend(paragraph_runs),
            ElementContent::Table(table) => {
                for cell in table.rows.iter().flat_map(|row| &row.cells) {
                    collect_runs(&cell.content, runs);
                }
            }
            ElementContent::SectionBreak => {}
        }
    }
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Matches `needle` at `chars[i..]`; characters must be offset-contiguous.
fn match_at(
    chars: &[IndexedChar],
    i: usize,
    needle: &[char],
    eq: impl Fn(char, char) -> bool,
) -> Option<Range> {
    let window = chars.get(i..i + needle.len())?;
    let contiguous = window.windows(2).all(|pair| pair[0].end() == pair[1].offset);
    let equal = window.iter().zip(needle).all(|(c, n)| eq(c.ch, *n));
    if contiguous && equal {
        Some(Range::new(window[0].offset, window[window.len() - 1].end()))
    } else {
        None
    }
}

fn context_window(chars: &[IndexedChar], start: usize, end: usize) -> String {
    let from = start.saturating_sub(SEARCH_CONTEXT_CHARS);
    let to = (end + SEARCH_CONTEXT_CHARS).min(chars.len());
    chars[from..to]
        .iter()
        .map(|c| if c.ch == '\n' { ' ' } else { c.ch })
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(start: u32, text: &str) -> StructuralElement {
        let end = start + crate::types::utf16_len(text);
        StructuralElement {
            start,
            end,
            content: ElementContent::Paragraph {
                runs: vec![TextRun { start, end, text: text.to_string() }],
            },
        }
    }

    fn snapshot(body: Vec<StructuralElement>) -> DocumentSnapshot {
        DocumentSnapshot { document_id: "doc-1".into(), title: "T".into(), body }
    }

    fn split_runs(start: u32, parts: &[&str]) -> StructuralElement {
        let mut runs = Vec::new();
        let mut offset = start;
        for part in parts {
            let end = offset + crate::types::utf16_len(part);
            runs.push(TextRun { start: offset, end, text: part.to_string() });
            offset = end;
        }
        StructuralElement { start, end: offset, content: ElementContent::Paragraph { runs } }
    }

    #[test]
    fn end_of_content_defaults_for_empty_body() {
        assert_eq!(snapshot(vec![]).end_of_content(), 2);
        assert_eq!(snapshot(vec![paragraph(1, "hello\n")]).end_of_content(), 7);
    }

    #[test]
    fn finds_literal_across_style_runs() {
        let doc = snapshot(vec![split_runs(1, &["Hello ", "bold", " world\n"])]);
        assert_eq!(doc.find_literal("o bol", 1), Some(Range::new(5, 10)));
        assert_eq!(doc.find_literal("hello", 1), None);
        assert_eq!(doc.find_literal("o", 6), Some(Range::new(8, 9)));
        assert_eq!(doc.find_literal("o", 9), Some(Range::new(13, 14)));
    }

    #[test]
    fn search_is_case_insensitive_with_context() {
        let doc = snapshot(vec![paragraph(1, "Alpha beta\n"), paragraph(12, "BETA gamma\n")]);
        let hits = doc.search("beta");

        assert_eq!(hits.len(), 2);
        assert_eq!((hits[0].start, hits[0].end), (7, 11));
        assert_eq!(hits[0].text, "beta");
        assert_eq!((hits[1].start, hits[1].end), (12, 16));
        assert_eq!(hits[1].text, "BETA");
        assert_eq!(hits[1].context, "Alpha beta BETA gamma");
    }

    #[test]
    fn search_does_not_match_across_non_contiguous_cells() {
        let table = StructuralElement {
            start: 2,
            end: 12,
            content: ElementContent::Table(TableElement {
                rows: vec![TableRow {
                    cells: vec![
                        TableCell { start: 3, end: 7, content: vec![paragraph(4, "ab\n")] },
                        TableCell { start: 7, end: 11, content: vec![paragraph(8, "cd\n")] },
                    ],
                }],
            }),
        };
        let doc = snapshot(vec![paragraph(1, "\n"), table]);

        assert_eq!(doc.search("cd").len(), 1);
        assert!(doc.search("b\nc").is_empty());
        let (element, found) = doc.first_table_at_or_after(2).expect("table should be found");
        assert_eq!(element.start, 2);
        assert_eq!(found.cell(0, 1).map(TableCell::content_start), Some(8));
        assert!(doc.first_table_at_or_after(3).is_none());
    }

    #[test]
    fn text_at_checks_exact_offset() {
        let doc = snapshot(vec![paragraph(1, "x {{docpilot-table-0}}\n")]);
        assert!(doc.text_at(3, "{{docpilot-table-0}}"));
        assert!(!doc.text_at(2, "{{docpilot-table-0}}"));
    }
}
