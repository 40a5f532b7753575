// Core compiler types shared across all docpilot crates.
//
// Offsets are absolute positions in the remote document, counted in UTF-16
// code units. The first writable position of a document body is 1.

use serde::{Deserialize, Serialize};

/// First writable offset of a document body.
pub const DOCUMENT_ORIGIN: u32 = 1;

/// Length of `text` in the remote addressing unit (UTF-16 code units).
pub fn utf16_len(text: &str) -> u32 {
    text.encode_utf16().count() as u32
}

/// The literal text inserted verbatim into the remote document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentStream {
    pub plain_text: String,
    /// Offset of the first character of `plain_text`.
    pub origin: u32,
    /// Exclusive end offset of the stream: `origin + utf16_len(plain_text)`.
    pub total_length: u32,
}

impl ContentStream {
    pub fn new(plain_text: String, origin: u32) -> Self {
        let total_length = origin + utf16_len(&plain_text);
        Self { plain_text, origin, total_length }
    }

    /// Number of offsets the stream occupies once inserted.
    pub fn len(&self) -> u32 {
        self.total_length - self.origin
    }

    pub fn is_empty(&self) -> bool {
        self.plain_text.is_empty()
    }

    pub fn shifted(&self, delta: u32) -> Self {
        Self {
            plain_text: self.plain_text.clone(),
            origin: self.origin + delta,
            total_length: self.total_length + delta,
        }
    }
}

/// Half-open offset range `[start, end)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: u32,
    pub end: u32,
}

impl Range {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Paragraph styles a markdown heading maps to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NamedStyle {
    #[serde(rename = "HEADING_1")]
    Heading1,
    #[serde(rename = "HEADING_2")]
    Heading2,
    #[serde(rename = "HEADING_3")]
    Heading3,
    #[serde(rename = "HEADING_4")]
    Heading4,
}

impl NamedStyle {
    pub fn from_level(level: usize) -> Option<Self> {
        match level {
            1 => Some(Self::Heading1),
            2 => Some(Self::Heading2),
            3 => Some(Self::Heading3),
            4 => Some(Self::Heading4),
            _ => None,
        }
    }

    /// Name used by the remote paragraph-style API.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Heading1 => "HEADING_1",
            Self::Heading2 => "HEADING_2",
            Self::Heading3 => "HEADING_3",
            Self::Heading4 => "HEADING_4",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Bullet,
    Numbered,
}

impl ListKind {
    /// Bullet preset used by the remote bullet-creation API.
    pub const fn preset(self) -> &'static str {
        match self {
            Self::Bullet => "BULLET_DISC_CIRCLE_SQUARE",
            Self::Numbered => "NUMBERED_DECIMAL_ALPHA_ROMAN",
        }
    }
}

/// A parsed markdown construct with the offsets it occupies once inserted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    Heading { style: NamedStyle, start: u32, end: u32 },
    List { kind: ListKind, nest_level: u32, start: u32, end: u32 },
    InlineStyle { start: u32, end: u32, bold: bool, italic: bool },
    HorizontalRule { index: u32 },
}

impl Segment {
    pub fn start(&self) -> u32 {
        match self {
            Self::Heading { start, .. }
            | Self::List { start, .. }
            | Self::InlineStyle { start, .. } => *start,
            Self::HorizontalRule { index } => *index,
        }
    }

    pub fn end(&self) -> u32 {
        match self {
            Self::Heading { end, .. } | Self::List { end, .. } | Self::InlineStyle { end, .. } => {
                *end
            }
            Self::HorizontalRule { index } => *index + 1,
        }
    }

    pub fn shifted(&self, delta: u32) -> Self {
        match *self {
            Self::Heading { style, start, end } => {
                Self::Heading { style, start: start + delta, end: end + delta }
            }
            Self::List { kind, nest_level, start, end } => {
                Self::List { kind, nest_level, start: start + delta, end: end + delta }
            }
            Self::InlineStyle { start, end, bold, italic } => {
                Self::InlineStyle { start: start + delta, end: end + delta, bold, italic }
            }
            Self::HorizontalRule { index } => Self::HorizontalRule { index: index + delta },
        }
    }
}

/// Known offset of a table placeholder line in the emitted stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaceholderPosition {
    pub placeholder_id: String,
    pub index: u32,
}

/// A pipe table pulled out of the markdown by the table extractor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Table {
    pub placeholder_id: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// The single-line token substituted for this table.
    pub fn placeholder_token(&self) -> String {
        placeholder_token(&self.placeholder_id)
    }

    /// Row count of the skeleton: the header row plus every body row.
    pub fn row_count(&self) -> u32 {
        self.rows.len() as u32 + 1
    }

    pub fn column_count(&self) -> u32 {
        self.headers.len() as u32
    }

    /// Source text of cell `(row, col)`, where row 0 is the header row.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        if row == 0 {
            self.headers.get(col).map(String::as_str)
        } else {
            self.rows.get(row - 1).and_then(|cells| cells.get(col)).map(String::as_str)
        }
    }
}

const PLACEHOLDER_PREFIX: &str = "{{docpilot-table-";
const PLACEHOLDER_SUFFIX: &str = "}}";

pub fn placeholder_token(placeholder_id: &str) -> String {
    format!("{{{{{placeholder_id}}}}}")
}

/// Returns the placeholder id when `line` is exactly one placeholder token.
pub fn parse_placeholder_token(line: &str) -> Option<&str> {
    let inner = line.strip_prefix("{{")?.strip_suffix(PLACEHOLDER_SUFFIX)?;
    let ordinal = line.strip_prefix(PLACEHOLDER_PREFIX)?.strip_suffix(PLACEHOLDER_SUFFIX)?;
    if !ordinal.is_empty() && ordinal.bytes().all(|byte| byte.is_ascii_digit()) {
        Some(inner)
    } else {
        None
    }
}

/// Indentation applied to nested list paragraphs, in points.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Indent {
    pub start_pt: f32,
    pub first_line_pt: f32,
}

/// One offset-addressed mutation against the remote document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MutationOperation {
    InsertText {
        index: u32,
        text: String,
    },
    DeleteRange {
        start: u32,
        end: u32,
    },
    SetTextStyle {
        range: Range,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bold: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        italic: Option<bool>,
    },
    SetParagraphStyle {
        range: Range,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        named_style: Option<NamedStyle>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        indent: Option<Indent>,
    },
    CreateBullets {
        range: Range,
        kind: ListKind,
    },
    InsertTableSkeleton {
        index: u32,
        rows: u32,
        cols: u32,
    },
    /// Plan-level cell write; resolved to `InsertText` once real cell offsets are known.
    SetCellText {
        row: u32,
        col: u32,
        text: String,
    },
    SetBorder {
        index: u32,
    },
}

/// Operation classes in the order they must be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OperationClass {
    Content,
    TextStyle,
    ParagraphStyle,
    Bullets,
    HorizontalRule,
    Table,
}

impl MutationOperation {
    pub fn class(&self) -> OperationClass {
        match self {
            Self::InsertText { .. } | Self::DeleteRange { .. } => OperationClass::Content,
            Self::SetTextStyle { .. } => OperationClass::TextStyle,
            Self::SetParagraphStyle { .. } => OperationClass::ParagraphStyle,
            Self::CreateBullets { .. } => OperationClass::Bullets,
            Self::SetBorder { .. } => OperationClass::HorizontalRule,
            Self::InsertTableSkeleton { .. } | Self::SetCellText { .. } => OperationClass::Table,
        }
    }

    /// Offset range the operation touches, when it addresses one.
    pub fn range(&self) -> Option<Range> {
        match self {
            Self::InsertText { index, .. } | Self::InsertTableSkeleton { index, .. } => {
                Some(Range::new(*index, *index))
            }
            Self::DeleteRange { start, end } => Some(Range::new(*start, *end)),
            Self::SetTextStyle { range, .. }
            | Self::SetParagraphStyle { range, .. }
            | Self::CreateBullets { range, .. } => Some(*range),
            Self::SetBorder { index } => Some(Range::new(*index, *index + 1)),
            Self::SetCellText { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf16_len_counts_surrogate_pairs() {
        assert_eq!(utf16_len("abc"), 3);
        assert_eq!(utf16_len("é"), 1);
        assert_eq!(utf16_len("🙂"), 2);
    }

    #[test]
    fn content_stream_total_length_is_exclusive_end() {
        let stream = ContentStream::new("Title\n".to_string(), DOCUMENT_ORIGIN);
        assert_eq!(stream.total_length, 7);
        assert_eq!(stream.len(), 6);

        let moved = stream.shifted(10);
        assert_eq!(moved.origin, 11);
        assert_eq!(moved.total_length, 17);
    }

    #[test]
    fn placeholder_token_round_trips_through_parser() {
        let token = placeholder_token("docpilot-table-3");
        assert_eq!(token, "{{docpilot-table-3}}");
        assert_eq!(parse_placeholder_token(&token), Some("docpilot-table-3"));
        assert_eq!(parse_placeholder_token("{{docpilot-table-}}"), None);
        assert_eq!(parse_placeholder_token("{{something-else}}"), None);
        assert_eq!(parse_placeholder_token("x {{docpilot-table-1}}"), None);
    }

    #[test]
    fn table_cell_addresses_header_as_row_zero() {
        let table = Table {
            placeholder_id: "docpilot-table-0".into(),
            headers: vec!["H1".into(), "H2".into()],
            rows: vec![vec!["a".into(), "b".into()]],
        };
        assert_eq!(table.cell(0, 1), Some("H2"));
        assert_eq!(table.cell(1, 0), Some("a"));
        assert_eq!(table.cell(2, 0), None);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 2);
    }

    #[test]
    fn segment_shift_moves_every_offset() {
        let segment = Segment::List { kind: ListKind::Bullet, nest_level: 1, start: 4, end: 9 };
        assert_eq!(
            segment.shifted(5),
            Segment::List { kind: ListKind::Bullet, nest_level: 1, start: 9, end: 14 }
        );
        assert_eq!(Segment::HorizontalRule { index: 3 }.shifted(2).start(), 5);
    }

    #[test]
    fn operations_serialize_with_op_tag() {
        let op = MutationOperation::SetTextStyle {
            range: Range::new(1, 5),
            bold: Some(true),
            italic: None,
        };
        let json = serde_json::to_value(&op).expect("serialize op");
        assert_eq!(json["op"], "set_text_style");
        assert_eq!(json["range"]["start"], 1);
        assert!(json.get("italic").is_none());
    }
}
