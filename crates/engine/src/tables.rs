// Table materializer: replaces placeholder lines with populated remote tables.
//
// Tables are processed last-to-first against one snapshot, so the offset of
// every placeholder still waiting is untouched by the tables already built.

use tracing::{debug, warn};

use docpilot_common::document::{DocumentSnapshot, TableElement};
use docpilot_common::markdown::CompiledDocument;
use docpilot_common::types::{utf16_len, MutationOperation, Range, Table, DOCUMENT_ORIGIN};

use crate::config::Pacing;
use crate::error::DocsError;
use crate::sequencer::{pause, DocumentHandle};
use crate::service::DocumentService;

pub struct TableMaterializer<'a, S> {
    service: &'a S,
    pacing: Pacing,
}

impl<'a, S: DocumentService> TableMaterializer<'a, S> {
    pub fn new(service: &'a S, pacing: Pacing) -> Self {
        Self { service, pacing }
    }

    /// Materializes every table in `compiled`, in reverse discovery order.
    pub async fn materialize_all(
        &self,
        handle: &mut DocumentHandle,
        compiled: &CompiledDocument,
    ) -> Result<usize, DocsError> {
        if compiled.tables.is_empty() {
            return Ok(0);
        }

        let snapshot = self.service.get_document(handle.document_id()).await?;
        handle.record_read(snapshot.end_of_content());

        for table in compiled.tables.iter().rev() {
            pause(self.pacing.table_delay).await;
            let index = locate_placeholder(&snapshot, table, compiled.placeholder_index(table))?;
            self.materialize(handle, table, index).await?;
        }

        Ok(compiled.tables.len())
    }

    /// Swaps the placeholder at `index` for a skeleton, then fills its cells.
    pub async fn materialize(
        &self,
        handle: &mut DocumentHandle,
        table: &Table,
        index: u32,
    ) -> Result<(), DocsError> {
        let document_id = handle.document_id().to_string();
        let token_len = utf16_len(&table.placeholder_token());
        let swap = [
            MutationOperation::DeleteRange { start: index, end: index + token_len },
            MutationOperation::InsertTableSkeleton {
                index,
                rows: table.row_count(),
                cols: table.column_count(),
            },
        ];
        self.service.batch_update(&document_id, &swap).await?;
        handle.invalidate();

        let snapshot = self.service.get_document(&document_id).await?;
        handle.record_read(snapshot.end_of_content());
        let (element, grid) = snapshot.first_table_at_or_after(index).ok_or_else(|| {
            DocsError::location_not_found(&document_id, format!("table inserted at {index}"))
        })?;
        debug!(
            document_id = %document_id,
            placeholder = %table.placeholder_id,
            start = element.start,
            "table skeleton inserted"
        );

        let writes = resolve_cell_writes(&document_id, &plan_cell_writes(table), grid)?;
        if !writes.is_empty() {
            self.service.batch_update(&document_id, &writes).await?;
            let written: u32 = table_text_len(table);
            handle.record_insert(written);
        }

        let header = header_bold_ranges(table, grid)
            .into_iter()
            .map(|range| MutationOperation::SetTextStyle { range, bold: Some(true), italic: None })
            .collect::<Vec<_>>();
        if !header.is_empty() {
            if let Err(error) = self.service.batch_update(&document_id, &header).await {
                warn!(
                    document_id = %document_id,
                    placeholder = %table.placeholder_id,
                    %error,
                    "could not bold table header"
                );
            }
        }

        Ok(())
    }
}

/// Finds the placeholder for `table`: at its known offset when the text is
/// still there, otherwise at its first literal occurrence.
pub fn locate_placeholder(
    snapshot: &DocumentSnapshot,
    table: &Table,
    known_index: Option<u32>,
) -> Result<u32, DocsError> {
    let token = table.placeholder_token();
    if let Some(index) = known_index.filter(|&index| snapshot.text_at(index, &token)) {
        return Ok(index);
    }

    match snapshot.find_literal(&token, DOCUMENT_ORIGIN) {
        Some(range) => {
            debug!(
                document_id = %snapshot.document_id,
                expected = ?known_index,
                found = range.start,
                "placeholder not at its known offset"
            );
            Ok(range.start)
        }
        None => Err(DocsError::location_not_found(&snapshot.document_id, token)),
    }
}

/// Cell writes for every non-empty source cell, strictly descending by `(row, col)`.
///
/// Writing the last cell first keeps every earlier cell's offset valid.
pub fn plan_cell_writes(table: &Table) -> Vec<MutationOperation> {
    let mut writes = Vec::new();
    for row in (0..table.row_count()).rev() {
        for col in (0..table.column_count()).rev() {
            if let Some(text) = table.cell(row as usize, col as usize).filter(|t| !t.is_empty()) {
                writes.push(MutationOperation::SetCellText { row, col, text: text.to_string() });
            }
        }
    }
    writes
}

/// Resolves cell writes to text inserts at each cell's first content offset.
pub fn resolve_cell_writes(
    document_id: &str,
    writes: &[MutationOperation],
    grid: &TableElement,
) -> Result<Vec<MutationOperation>, DocsError> {
    writes
        .iter()
        .map(|op| match op {
            MutationOperation::SetCellText { row, col, text } => grid
                .cell(*row as usize, *col as usize)
                .map(|cell| MutationOperation::InsertText {
                    index: cell.content_start(),
                    text: text.clone(),
                })
                .ok_or_else(|| {
                    DocsError::location_not_found(document_id, format!("table cell ({row}, {col})"))
                }),
            other => Ok(other.clone()),
        })
        .collect()
}

/// Final ranges of the header texts once every cell has been written.
///
/// Header cells come first in the table, so each one only moves by the
/// header texts inserted before it.
pub fn header_bold_ranges(table: &Table, grid: &TableElement) -> Vec<Range> {
    let mut ranges = Vec::new();
    let mut shift = 0;
    for (col, header) in table.headers.iter().enumerate() {
        let Some(cell) = grid.cell(0, col) else {
            break;
        };
        let length = utf16_len(header);
        let start = cell.content_start() + shift;
        if length > 0 {
            ranges.push(Range::new(start, start + length));
        }
        shift += length;
    }
    ranges
}

fn table_text_len(table: &Table) -> u32 {
    let body: u32 = table.rows.iter().flatten().map(|cell| utf16_len(cell)).sum();
    table.headers.iter().map(|header| utf16_len(header)).sum::<u32>() + body
}
