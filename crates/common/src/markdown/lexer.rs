// Markdown lexer: one line-oriented pass producing plain text plus offset segments.
//
// Offsets are recorded against the emitted text, never the raw markdown, so
// every segment addresses exactly the characters that will be inserted.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::{
    parse_placeholder_token, ContentStream, ListKind, NamedStyle, PlaceholderPosition, Segment,
    DOCUMENT_ORIGIN,
};

/// Output of the lexer pass. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMarkdown {
    pub content: ContentStream,
    pub segments: Vec<Segment>,
    pub placeholders: Vec<PlaceholderPosition>,
}

fn heading_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(#{1,4}) (.*)$").expect("heading pattern should compile"))
}

fn list_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([ \t]*)([-*]|\d+\.)[ \t]+(.*)$").expect("list pattern should compile")
    })
}

/// Parses table-free markdown with offsets starting at the document origin.
pub fn parse_markdown(markdown: &str) -> ParsedMarkdown {
    parse_markdown_at(markdown, DOCUMENT_ORIGIN)
}

/// Parses table-free markdown with offsets starting at `origin`.
pub fn parse_markdown_at(markdown: &str, origin: u32) -> ParsedMarkdown {
    let mut emitter = Emitter::new(origin);

    for line in markdown.lines() {
        emitter.line(line);
    }

    emitter.finish()
}

struct Emitter {
    origin: u32,
    out: String,
    cursor: u32,
    segments: Vec<Segment>,
    placeholders: Vec<PlaceholderPosition>,
}

impl Emitter {
    fn new(origin: u32) -> Self {
        Self {
            origin,
            out: String::new(),
            cursor: origin,
            segments: Vec::new(),
            placeholders: Vec::new(),
        }
    }

    fn line(&mut self, line: &str) {
        let trimmed = line.trim();

        if let Some(placeholder_id) = parse_placeholder_token(trimmed) {
            self.placeholders.push(PlaceholderPosition {
                placeholder_id: placeholder_id.to_string(),
                index: self.cursor,
            });
            self.push_str(trimmed);
            self.push_char('\n');
            return;
        }

        if is_horizontal_rule(trimmed) {
            self.segments.push(Segment::HorizontalRule { index: self.cursor });
            self.push_char('\n');
            return;
        }

        let line_start = self.cursor;

        if let Some(captures) = heading_pattern().captures(line) {
            let level = captures[1].len();
            self.inline(&captures[2]);
            self.push_char('\n');
            if let Some(style) = NamedStyle::from_level(level) {
                self.segments.push(Segment::Heading { style, start: line_start, end: self.cursor });
            }
            return;
        }

        if let Some(captures) = list_pattern().captures(line) {
            let nest_level = indent_columns(&captures[1]) / 2;
            let kind =
                if captures[2].ends_with('.') { ListKind::Numbered } else { ListKind::Bullet };
            self.inline(&captures[3]);
            self.push_char('\n');
            self.segments.push(Segment::List {
                kind,
                nest_level,
                start: line_start,
                end: self.cursor,
            });
            return;
        }

        self.inline(line);
        self.push_char('\n');
    }

    fn inline(&mut self, content: &str) {
        let chars: Vec<char> = content.chars().collect();
        let mut index = 0;

        while index < chars.len() {
            if let Some(run) = match_inline_run(&chars, index) {
                let start = self.cursor;
                for ch in &chars[run.inner_start..run.inner_end] {
                    self.push_char(*ch);
                }
                self.segments.push(Segment::InlineStyle {
                    start,
                    end: self.cursor,
                    bold: run.bold,
                    italic: run.italic,
                });
                index = run.next;
                continue;
            }

            // Unterminated or rejected delimiters are kept literally.
            self.push_char(chars[index]);
            index += 1;
        }
    }

    fn push_str(&mut self, text: &str) {
        for ch in text.chars() {
            self.push_char(ch);
        }
    }

    fn push_char(&mut self, ch: char) {
        self.out.push(ch);
        self.cursor += ch.len_utf16() as u32;
    }

    fn finish(self) -> ParsedMarkdown {
        ParsedMarkdown {
            content: ContentStream::new(self.out, self.origin),
            segments: self.segments,
            placeholders: self.placeholders,
        }
    }
}

fn is_horizontal_rule(trimmed: &str) -> bool {
    matches!(trimmed, "---" | "***" | "___")
}

fn indent_columns(indent: &str) -> u32 {
    indent.chars().map(|ch| if ch == '\t' { 2 } else { 1 }).sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InlineRun {
    inner_start: usize,
    inner_end: usize,
    next: usize,
    bold: bool,
    italic: bool,
}

fn is_delimiter(ch: char) -> bool {
    ch == '*' || ch == '_'
}

fn match_inline_run(chars: &[char], index: usize) -> Option<InlineRun> {
    match chars[index] {
        '*' => [(3, true, true), (2, true, false), (1, false, true)]
            .into_iter()
            .find_map(|(width, bold, italic)| {
                match_delimited(chars, index, '*', width, bold, italic)
            }),
        '_' => {
            // Mid-word underscores (snake_case) never open emphasis.
            if index > 0 && chars[index - 1].is_alphanumeric() {
                return None;
            }
            match_delimited(chars, index, '_', 1, false, true)
        }
        _ => None,
    }
}

fn match_delimited(
    chars: &[char],
    index: usize,
    delimiter: char,
    width: usize,
    bold: bool,
    italic: bool,
) -> Option<InlineRun> {
    let inner_start = index + width;
    if inner_start >= chars.len() || !run_of(chars, index, delimiter, width) {
        return None;
    }

    let first = chars[inner_start];
    if is_delimiter(first) || first.is_whitespace() {
        return None;
    }

    let mut close = inner_start + 1;
    while close + width <= chars.len() {
        if run_of(chars, close, delimiter, width)
            && is_valid_closer(chars, close, delimiter, width)
        {
            return Some(InlineRun {
                inner_start,
                inner_end: close,
                next: close + width,
                bold,
                italic,
            });
        }
        close += 1;
    }

    None
}

fn run_of(chars: &[char], index: usize, delimiter: char, width: usize) -> bool {
    chars.get(index..index + width).is_some_and(|run| run.iter().all(|ch| *ch == delimiter))
}

fn is_valid_closer(chars: &[char], close: usize, delimiter: char, width: usize) -> bool {
    let before = chars[close - 1];
    if before.is_whitespace() || is_delimiter(before) {
        return false;
    }
    match chars.get(close + width) {
        Some(after) if *after == delimiter => false,
        Some(after) if delimiter == '_' && after.is_alphanumeric() => false,
        _ => true,
    }
}
