// Formatting request builder: segments → mutation operations in fixed class order.
//
// Order is text-style, paragraph-style, bullets, horizontal-rule borders.
// Paragraph-style changes applied after text-style would otherwise clear
// inline runs, bullets must see final paragraph ranges, and the border on a
// rule paragraph must come after every paragraph-style batch.

use crate::types::{Indent, ListKind, MutationOperation, Range, Segment};

/// Indentation step per list nesting level, in points.
pub const INDENT_STEP_PT: f32 = 36.0;
/// Hanging offset between a bullet glyph and its text, in points.
pub const BULLET_HANG_PT: f32 = 18.0;

/// Builds the formatting operations for `segments`.
pub fn build_formatting_operations(segments: &[Segment]) -> Vec<MutationOperation> {
    let mut text_styles = Vec::new();
    let mut paragraph_styles = Vec::new();
    let mut borders = Vec::new();
    let mut list_items: Vec<(ListKind, Range)> = Vec::new();

    for segment in segments {
        match *segment {
            Segment::InlineStyle { start, end, bold, italic } => {
                if start < end && (bold || italic) {
                    text_styles.push(MutationOperation::SetTextStyle {
                        range: Range::new(start, end),
                        bold: bold.then_some(true),
                        italic: italic.then_some(true),
                    });
                }
            }
            Segment::Heading { style, start, end } => {
                paragraph_styles.push(MutationOperation::SetParagraphStyle {
                    range: Range::new(start, end),
                    named_style: Some(style),
                    indent: None,
                });
            }
            Segment::List { kind, nest_level, start, end } => {
                if nest_level > 0 {
                    paragraph_styles.push(MutationOperation::SetParagraphStyle {
                        range: Range::new(start, end),
                        named_style: None,
                        indent: Some(indent_for_level(nest_level)),
                    });
                }
                list_items.push((kind, Range::new(start, end)));
            }
            Segment::HorizontalRule { index } => {
                borders.push(MutationOperation::SetBorder { index });
            }
        }
    }

    let bullets = merge_list_runs(list_items)
        .into_iter()
        .map(|(kind, range)| MutationOperation::CreateBullets { range, kind });

    text_styles.into_iter().chain(paragraph_styles).chain(bullets).chain(borders).collect()
}

/// Indent pair for a list paragraph at `nest_level`.
pub fn indent_for_level(nest_level: u32) -> Indent {
    let level = nest_level as f32;
    Indent {
        start_pt: INDENT_STEP_PT * (level + 1.0),
        first_line_pt: INDENT_STEP_PT * level + BULLET_HANG_PT,
    }
}

/// Joins contiguous list items of the same kind so a numbered list is one list.
fn merge_list_runs(mut items: Vec<(ListKind, Range)>) -> Vec<(ListKind, Range)> {
    items.sort_by_key(|(_, range)| range.start);

    let mut merged: Vec<(ListKind, Range)> = Vec::with_capacity(items.len());
    for (kind, range) in items {
        match merged.last_mut() {
            Some((last_kind, last_range))
                if *last_kind == kind && last_range.end == range.start =>
            {
                last_range.end = range.end;
            }
            _ => merged.push((kind, range)),
        }
    }
    merged
}
