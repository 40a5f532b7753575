// Pipe-table extraction: pulls tables out of markdown and leaves placeholder lines.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::{placeholder_token, Table};

/// Minimum lines for a pipe run to be a table: header, divider, one body row.
const MIN_TABLE_LINES: usize = 3;

const PLACEHOLDER_ID_PREFIX: &str = "docpilot-table-";

/// Result of the table pre-pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTables {
    pub tables: Vec<Table>,
    /// The input markdown with every accepted table replaced by one placeholder line.
    pub markdown: String,
}

fn divider_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\|[\s\-:|]+\|$").expect("table divider pattern should compile")
    })
}

/// Replaces every pipe table in `markdown` with a placeholder line.
///
/// A table is a maximal run of at least three lines that start and end with
/// `|`, whose second line is a header/body divider. Anything else stays as
/// literal text.
pub fn extract_tables(markdown: &str) -> ExtractedTables {
    let lines: Vec<&str> = markdown.lines().collect();
    let mut tables = Vec::new();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());

    let mut ordinal = 0;
    let mut index = 0;
    while index < lines.len() {
        if !is_pipe_line(lines[index]) {
            out.push(lines[index].to_string());
            index += 1;
            continue;
        }

        let run_start = index;
        while index < lines.len() && is_pipe_line(lines[index]) {
            index += 1;
        }
        let run = &lines[run_start..index];

        match parse_table(run) {
            Some((headers, rows)) => {
                let placeholder_id = unused_placeholder_id(markdown, &mut ordinal);
                out.push(placeholder_token(&placeholder_id));
                tables.push(Table { placeholder_id, headers, rows });
            }
            None => out.extend(run.iter().map(|line| line.to_string())),
        }
    }

    let mut rebuilt = out.join("\n");
    if markdown.ends_with('\n') {
        rebuilt.push('\n');
    }

    ExtractedTables { tables, markdown: rebuilt }
}

fn is_pipe_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 2 && trimmed.starts_with('|') && trimmed.ends_with('|')
}

/// Next placeholder id whose token does not already occur in the source text.
fn unused_placeholder_id(markdown: &str, ordinal: &mut usize) -> String {
    loop {
        let placeholder_id = format!("{PLACEHOLDER_ID_PREFIX}{ordinal}");
        *ordinal += 1;
        if !markdown.contains(&placeholder_token(&placeholder_id)) {
            return placeholder_id;
        }
    }
}

/// Headers and body rows of a pipe run, or `None` when it stays literal.
///
/// Header columns without text are dropped together with the matching body
/// column. A dropped column that carries body text keeps the run literal.
fn parse_table(run: &[&str]) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    if run.len() < MIN_TABLE_LINES || !divider_pattern().is_match(run[1].trim()) {
        return None;
    }

    let header_cells = split_cells(run[0]);
    let width = header_cells.len();
    let kept: Vec<usize> = (0..width).filter(|&col| !header_cells[col].is_empty()).collect();
    if kept.is_empty() {
        return None;
    }
    let headers = kept.iter().map(|&col| header_cells[col].clone()).collect();

    let mut rows = Vec::with_capacity(run.len() - 2);
    for line in &run[2..] {
        let mut cells = split_cells(line);
        cells.resize(width, String::new());
        let dropped_text = (0..width).any(|col| !kept.contains(&col) && !cells[col].is_empty());
        if dropped_text {
            return None;
        }
        rows.push(kept.iter().map(|&col| std::mem::take(&mut cells[col])).collect());
    }

    Some((headers, rows))
}

fn split_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|cell| cell.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::extract_tables;

    #[test]
    fn extracts_four_line_table_into_single_placeholder() {
        let markdown = "Intro\n| H1 | H2 |\n|---|---|\n| a | b |\n| c | d |\nOutro\n";
        let extracted = extract_tables(markdown);

        assert_eq!(extracted.tables.len(), 1);
        let table = &extracted.tables[0];
        assert_eq!(table.headers, vec!["H1", "H2"]);
        assert_eq!(table.rows, vec![vec!["a", "b"], vec!["c", "d"]]);
        assert_eq!(extracted.markdown, "Intro\n{{docpilot-table-0}}\nOutro\n");
        assert_eq!(
            extracted.markdown.lines().filter(|line| *line == table.placeholder_token()).count(),
            1
        );
    }

    #[test]
    fn two_line_pipe_block_is_left_as_text() {
        let markdown = "| H1 | H2 |\n|---|---|\n";
        let extracted = extract_tables(markdown);

        assert!(extracted.tables.is_empty());
        assert_eq!(extracted.markdown, markdown);
    }

    #[test]
    fn pipe_block_without_divider_is_left_as_text() {
        let markdown = "| a | b |\n| c | d |\n| e | f |\n";
        let extracted = extract_tables(markdown);

        assert!(extracted.tables.is_empty());
        assert_eq!(extracted.markdown, markdown);
    }

    #[test]
    fn accepts_alignment_colons_in_divider() {
        let markdown = "| Name | Qty |\n|:-----|----:|\n| pear | 3 |\n";
        let extracted = extract_tables(markdown);

        assert_eq!(extracted.tables.len(), 1);
        assert_eq!(extracted.tables[0].rows, vec![vec!["pear", "3"]]);
    }

    #[test]
    fn pads_and_truncates_body_rows_to_header_width() {
        let markdown = "| A | B | C |\n|---|---|---|\n| 1 |\n| 1 | 2 | 3 | 4 |\n| x |  | z |\n";
        let extracted = extract_tables(markdown);

        let rows = &extracted.tables[0].rows;
        assert_eq!(rows[0], vec!["1", "", ""]);
        assert_eq!(rows[1], vec!["1", "2", "3"]);
        assert_eq!(rows[2], vec!["x", "", "z"]);
    }

    #[test]
    fn numbers_placeholders_in_discovery_order() {
        let markdown = "| A |\n|---|\n| 1 |\n\ntext\n\n| B |\n|---|\n| 2 |\n";
        let extracted = extract_tables(markdown);

        assert_eq!(extracted.tables.len(), 2);
        assert_eq!(extracted.tables[0].placeholder_id, "docpilot-table-0");
        assert_eq!(extracted.tables[1].headers, vec!["B"]);
        assert_eq!(
            extracted.markdown,
            "{{docpilot-table-0}}\n\ntext\n\n{{docpilot-table-1}}\n"
        );
    }

    #[test]
    fn empty_header_column_is_dropped_with_its_body_cells() {
        let markdown = "| | H |\n|---|---|\n|  | b |\n| | c |\n";
        let extracted = extract_tables(markdown);

        assert_eq!(extracted.tables.len(), 1);
        assert_eq!(extracted.tables[0].headers, vec!["H"]);
        assert_eq!(extracted.tables[0].rows, vec![vec!["b"], vec!["c"]]);
    }

    #[test]
    fn body_text_under_empty_header_keeps_block_literal() {
        let markdown = "| | H |\n|---|---|\n| a | b |\n";
        let extracted = extract_tables(markdown);

        assert!(extracted.tables.is_empty());
        assert_eq!(extracted.markdown, markdown);
    }

    #[test]
    fn placeholder_ids_skip_tokens_already_in_the_source() {
        let markdown = "{{docpilot-table-0}}\n\n| A |\n|---|\n| 1 |\n";
        let extracted = extract_tables(markdown);

        assert_eq!(extracted.tables[0].placeholder_id, "docpilot-table-1");
        assert_eq!(extracted.markdown, "{{docpilot-table-0}}\n\n{{docpilot-table-1}}\n");
    }

    #[test]
    fn header_without_text_is_not_a_table() {
        let markdown = "|  |  |\n|---|---|\n| a | b |\n";
        let extracted = extract_tables(markdown);
        assert!(extracted.tables.is_empty());
    }
}
