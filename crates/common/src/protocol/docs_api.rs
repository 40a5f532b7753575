// Wire format of the remote document service: request encoding and document decoding.

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::document::{
    DocumentSnapshot, ElementContent, StructuralElement, TableCell, TableElement, TableRow, TextRun,
};
use crate::types::{MutationOperation, Range};

/// Point size of the rule drawn under a horizontal-rule paragraph.
const RULE_WIDTH_PT: f32 = 1.0;
const RULE_PADDING_PT: f32 = 6.0;
const RULE_GRAY: f32 = 0.6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("cell write ({row}, {col}) has no resolved offset")]
    UnresolvedCellWrite { row: u32, col: u32 },
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed document payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encodes one operation as a batch-update request object.
pub fn encode_request(op: &MutationOperation) -> Result<Value, EncodeError> {
    let request = match op {
        MutationOperation::InsertText { index, text } => json!({
            "insertText": { "location": { "index": index }, "text": text }
        }),
        MutationOperation::DeleteRange { start, end } => json!({
            "deleteContentRange": { "range": range_json(Range::new(*start, *end)) }
        }),
        MutationOperation::SetTextStyle { range, bold, italic } => {
            let mut style = serde_json::Map::new();
            let mut fields = Vec::new();
            if let Some(bold) = bold {
                style.insert("bold".into(), json!(bold));
                fields.push("bold");
            }
            if let Some(italic) = italic {
                style.insert("italic".into(), json!(italic));
                fields.push("italic");
            }
            json!({
                "updateTextStyle": {
                    "range": range_json(*range),
                    "textStyle": style,
                    "fields": fields.join(","),
                }
            })
        }
        MutationOperation::SetParagraphStyle { range, named_style, indent } => {
            let mut style = serde_json::Map::new();
            let mut fields = Vec::new();
            if let Some(named_style) = named_style {
                style.insert("namedStyleType".into(), json!(named_style.as_str()));
                fields.push("namedStyleType");
            }
            if let Some(indent) = indent {
                style.insert("indentStart".into(), dimension(indent.start_pt));
                style.insert("indentFirstLine".into(), dimension(indent.first_line_pt));
                fields.push("indentStart");
                fields.push("indentFirstLine");
            }
            json!({
                "updateParagraphStyle": {
                    "range": range_json(*range),
                    "paragraphStyle": style,
                    "fields": fields.join(","),
                }
            })
        }
        MutationOperation::CreateBullets { range, kind } => json!({
            "createParagraphBullets": { "range": range_json(*range), "bulletPreset": kind.preset() }
        }),
        MutationOperation::InsertTableSkeleton { index, rows, cols } => json!({
            "insertTable": { "rows": rows, "columns": cols, "location": { "index": index } }
        }),
        MutationOperation::SetBorder { index } => json!({
            "updateParagraphStyle": {
                "range": range_json(Range::new(*index, *index + 1)),
                "paragraphStyle": {
                    "borderBottom": {
                        "color": { "color": { "rgbColor": {
                            "red": RULE_GRAY, "green": RULE_GRAY, "blue": RULE_GRAY
                        } } },
                        "width": { "magnitude": RULE_WIDTH_PT, "unit": "PT" },
                        "padding": { "magnitude": RULE_PADDING_PT, "unit": "PT" },
                        "dashStyle": "SOLID",
                    }
                },
                "fields": "borderBottom",
            }
        }),
        MutationOperation::SetCellText { row, col, .. } => {
            return Err(EncodeError::UnresolvedCellWrite { row: *row, col: *col });
        }
    };
    Ok(request)
}

/// Encodes a batch-update body for `operations`.
pub fn encode_batch(operations: &[MutationOperation]) -> Result<Value, EncodeError> {
    let requests = operations.iter().map(encode_request).collect::<Result<Vec<_>, _>>()?;
    Ok(json!({ "requests": requests }))
}

/// Encodes a literal, global find/replace as a batch-update body.
pub fn encode_replace_all_text(find: &str, replacement: &str, match_case: bool) -> Value {
    json!({
        "requests": [{
            "replaceAllText": {
                "containsText": { "text": find, "matchCase": match_case },
                "replaceText": replacement,
            }
        }]
    })
}

fn range_json(range: Range) -> Value {
    json!({ "startIndex": range.start, "endIndex": range.end })
}

fn dimension(points: f32) -> Value {
    json!({ "magnitude": points, "unit": "PT" })
}

// ── Decoding ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDocument {
    document_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: WireBody,
}

#[derive(Debug, Default, Deserialize)]
struct WireBody {
    #[serde(default)]
    content: Vec<WireElement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireElement {
    #[serde(default)]
    start_index: u32,
    #[serde(default)]
    end_index: u32,
    paragraph: Option<WireParagraph>,
    table: Option<WireTable>,
}

#[derive(Debug, Deserialize)]
struct WireParagraph {
    #[serde(default)]
    elements: Vec<WireParagraphElement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireParagraphElement {
    #[serde(default)]
    start_index: u32,
    #[serde(default)]
    end_index: u32,
    text_run: Option<WireTextRun>,
}

#[derive(Debug, Deserialize)]
struct WireTextRun {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTable {
    #[serde(default)]
    table_rows: Vec<WireTableRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTableRow {
    #[serde(default)]
    table_cells: Vec<WireTableCell>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTableCell {
    #[serde(default)]
    start_index: u32,
    #[serde(default)]
    end_index: u32,
    #[serde(default)]
    content: Vec<WireElement>,
}

#[derive(Debug, Deserialize)]
struct WireBatchResponse {
    #[serde(default)]
    replies: Vec<Value>,
}

/// Decodes a full document read into the element-tree model.
pub fn decode_document(payload: &[u8]) -> Result<DocumentSnapshot, DecodeError> {
    let wire: WireDocument = serde_json::from_slice(payload)?;
    Ok(DocumentSnapshot {
        document_id: wire.document_id,
        title: wire.title,
        body: wire.body.content.into_iter().map(convert_element).collect(),
    })
}

/// Sum of `occurrencesChanged` across a batch-update reply; absent means zero.
pub fn decode_occurrences_changed(payload: &[u8]) -> Result<u32, DecodeError> {
    let response: WireBatchResponse = serde_json::from_slice(payload)?;
    Ok(response
        .replies
        .iter()
        .filter_map(|reply| reply.pointer("/replaceAllText/occurrencesChanged"))
        .filter_map(Value::as_u64)
        .sum::<u64>() as u32)
}

fn convert_element(element: WireElement) -> StructuralElement {
    let content = if let Some(paragraph) = element.paragraph {
        ElementContent::Paragraph {
            runs: paragraph
                .elements
                .into_iter()
                .filter_map(|item| {
                    item.text_run.map(|run| TextRun {
                        start: item.start_index,
                        end: item.end_index,
                        text: run.content,
                    })
                })
                .collect(),
        }
    } else if let Some(table) = element.table {
        ElementContent::Table(TableElement {
            rows: table
                .table_rows
                .into_iter()
                .map(|row| TableRow {
                    cells: row
                        .table_cells
                        .into_iter()
                        .map(|cell| TableCell {
                            start: cell.start_index,
                            end: cell.end_index,
                            content: cell.content.into_iter().map(convert_element).collect(),
                        })
                        .collect(),
                })
                .collect(),
        })
    } else {
        ElementContent::SectionBreak
    };

    StructuralElement { start: element.start_index, end: element.end_index, content }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Indent, ListKind, NamedStyle};

    #[test]
    fn encodes_insert_and_delete() {
        let insert = encode_request(&MutationOperation::InsertText { index: 5, text: "hi".into() })
            .expect("insert should encode");
        assert_eq!(insert["insertText"]["location"]["index"], 5);
        assert_eq!(insert["insertText"]["text"], "hi");

        let delete = encode_request(&MutationOperation::DeleteRange { start: 1, end: 9 })
            .expect("delete should encode");
        assert_eq!(delete["deleteContentRange"]["range"]["endIndex"], 9);
    }

    #[test]
    fn text_style_fields_list_only_set_attributes() {
        let request = encode_request(&MutationOperation::SetTextStyle {
            range: Range::new(2, 6),
            bold: Some(true),
            italic: Some(true),
        })
        .expect("style should encode");
        assert_eq!(request["updateTextStyle"]["fields"], "bold,italic");
        assert_eq!(request["updateTextStyle"]["textStyle"]["italic"], true);
    }

    #[test]
    fn paragraph_style_carries_heading_and_indent() {
        let heading = encode_request(&MutationOperation::SetParagraphStyle {
            range: Range::new(1, 7),
            named_style: Some(NamedStyle::Heading3),
            indent: None,
        })
        .expect("heading should encode");
        let style = &heading["updateParagraphStyle"]["paragraphStyle"];
        assert_eq!(style["namedStyleType"], "HEADING_3");
        assert_eq!(heading["updateParagraphStyle"]["fields"], "namedStyleType");

        let indented = encode_request(&MutationOperation::SetParagraphStyle {
            range: Range::new(1, 7),
            named_style: None,
            indent: Some(Indent { start_pt: 72.0, first_line_pt: 54.0 }),
        })
        .expect("indent should encode");
        let style = &indented["updateParagraphStyle"]["paragraphStyle"];
        assert_eq!(style["indentStart"]["magnitude"], 72.0);
        assert_eq!(indented["updateParagraphStyle"]["fields"], "indentStart,indentFirstLine");
    }

    #[test]
    fn bullets_table_and_border_requests() {
        let bullets = encode_request(&MutationOperation::CreateBullets {
            range: Range::new(1, 4),
            kind: ListKind::Numbered,
        })
        .expect("bullets should encode");
        assert_eq!(
            bullets["createParagraphBullets"]["bulletPreset"],
            "NUMBERED_DECIMAL_ALPHA_ROMAN"
        );

        let table =
            encode_request(&MutationOperation::InsertTableSkeleton { index: 12, rows: 3, cols: 2 })
                .expect("table should encode");
        assert_eq!(table["insertTable"]["columns"], 2);

        let border = encode_request(&MutationOperation::SetBorder { index: 8 })
            .expect("border should encode");
        assert_eq!(border["updateParagraphStyle"]["range"]["endIndex"], 9);
        assert_eq!(border["updateParagraphStyle"]["fields"], "borderBottom");
    }

    #[test]
    fn unresolved_cell_write_is_rejected() {
        let ops = vec![
            MutationOperation::InsertText { index: 1, text: "x".into() },
            MutationOperation::SetCellText { row: 1, col: 0, text: "a".into() },
        ];
        assert_eq!(
            encode_batch(&ops).expect_err("cell writes must be resolved"),
            EncodeError::UnresolvedCellWrite { row: 1, col: 0 }
        );
    }

    #[test]
    fn decodes_paragraphs_and_tables() {
        let payload = br#"{
            "documentId": "abc",
            "title": "Plan",
            "body": { "content": [
                { "endIndex": 1, "sectionBreak": {} },
                { "startIndex": 1, "endIndex": 7, "paragraph": { "elements": [
                    { "startIndex": 1, "endIndex": 7, "textRun": { "content": "Hello\n" } }
                ] } },
                { "startIndex": 7, "endIndex": 14, "table": { "rows": 1, "columns": 2, "tableRows": [
                    { "startIndex": 8, "endIndex": 13, "tableCells": [
                        { "startIndex": 9, "endIndex": 11, "content": [
                            { "startIndex": 10, "endIndex": 11, "paragraph": { "elements": [
                                { "startIndex": 10, "endIndex": 11, "textRun": { "content": "\n" } }
                            ] } }
                        ] },
                        { "startIndex": 11, "endIndex": 13, "content": [
                            { "startIndex": 12, "endIndex": 13, "paragraph": { "elements": [] } }
                        ] }
                    ] }
                ] } },
                { "startIndex": 14, "endIndex": 15, "paragraph": { "elements": [
                    { "startIndex": 14, "endIndex": 15, "textRun": { "content": "\n" } }
                ] } }
            ] }
        }"#;

        let doc = decode_document(payload).expect("document should decode");
        assert_eq!(doc.document_id, "abc");
        assert_eq!(doc.end_of_content(), 15);
        assert_eq!(doc.body[0].content, ElementContent::SectionBreak);

        let (element, table) = doc.first_table_at_or_after(7).expect("table should decode");
        assert_eq!(element.start, 7);
        assert_eq!(table.cell(0, 1).map(TableCell::content_start), Some(12));
        assert!(doc.plain_text().starts_with("Hello\n"));
    }

    #[test]
    fn missing_occurrences_means_zero() {
        assert_eq!(
            decode_occurrences_changed(br#"{"documentId":"x","replies":[{"replaceAllText":{}}]}"#)
                .expect("reply should decode"),
            0
        );
        assert_eq!(
            decode_occurrences_changed(
                br#"{"replies":[{"replaceAllText":{"occurrencesChanged":4}}]}"#
            )
            .expect("reply should decode"),
            4
        );
    }
}
