// In-memory document service with the remote offset semantics.
//
// A document is a flat list of slots, one per offset: offset 0 is the section
// break, text occupies one slot per UTF-16 code unit, and each table, row and
// cell start (plus the table end) takes one slot. Batches apply atomically.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use docpilot_common::document::{
    DocumentSnapshot, ElementContent, StructuralElement, TableCell, TableElement, TableRow,
    TextRun,
};
use docpilot_common::protocol::docs_api::EncodeError;
use docpilot_common::types::{MutationOperation, Range};

use crate::error::DocsError;
use crate::service::{DocumentService, RemoteDocument, ServiceFuture};

const NEWLINE: u16 = b'\n' as u16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    SectionBreak,
    Text { unit: u16, bold: bool, italic: bool },
    TableStart,
    RowStart,
    CellStart,
    TableEnd,
}

impl Slot {
    fn text(unit: u16) -> Self {
        Self::Text { unit, bold: false, italic: false }
    }

    fn is_text(self) -> bool {
        matches!(self, Self::Text { .. })
    }

    fn is_newline(self) -> bool {
        matches!(self, Self::Text { unit: NEWLINE, .. })
    }
}

#[derive(Debug, Clone)]
struct StoredDocument {
    title: String,
    slots: Vec<Slot>,
    reads: usize,
    batches: Vec<Vec<MutationOperation>>,
}

impl StoredDocument {
    fn new(title: &str, text: &str) -> Self {
        let mut slots = vec![Slot::SectionBreak];
        slots.extend(text.encode_utf16().map(Slot::text));
        if !slots.last().is_some_and(|slot| slot.is_newline()) {
            slots.push(Slot::text(NEWLINE));
        }
        Self { title: title.to_string(), slots, reads: 0, batches: Vec::new() }
    }
}

type FailurePredicate = Box<dyn Fn(&MutationOperation) -> bool + Send + Sync>;

#[derive(Default)]
struct State {
    documents: HashMap<String, StoredDocument>,
    next_id: u32,
    fail_when: Option<FailurePredicate>,
}

impl State {
    fn allocate(&mut self, document: StoredDocument) -> String {
        self.next_id += 1;
        let document_id = format!("mem-doc-{:04}", self.next_id);
        self.documents.insert(document_id.clone(), document);
        document_id
    }

    fn document_mut(&mut self, document_id: &str) -> Result<&mut StoredDocument, DocsError> {
        self.documents
            .get_mut(document_id)
            .ok_or_else(|| DocsError::RemoteNotFound { document_id: document_id.to_string() })
    }
}

/// Shared handle to an in-memory document store. Clones see the same documents.
#[derive(Clone, Default)]
pub struct InMemoryDocs {
    state: Arc<Mutex<State>>,
}

impl InMemoryDocs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a document holding `text` as plain paragraphs.
    pub fn insert_document(&self, title: &str, text: &str) -> String {
        self.lock().allocate(StoredDocument::new(title, text))
    }

    /// Makes every later batch containing a matching operation fail as a whole.
    pub fn fail_batches_when(
        &self,
        predicate: impl Fn(&MutationOperation) -> bool + Send + Sync + 'static,
    ) {
        self.lock().fail_when = Some(Box::new(predicate));
    }

    /// Snapshot without counting it as a read.
    pub fn snapshot(&self, document_id: &str) -> Option<DocumentSnapshot> {
        let state = self.lock();
        state.documents.get(document_id).map(|document| build_snapshot(document_id, document))
    }

    pub fn text(&self, document_id: &str) -> Option<String> {
        self.snapshot(document_id).map(|snapshot| snapshot.plain_text())
    }

    pub fn title(&self, document_id: &str) -> Option<String> {
        self.lock().documents.get(document_id).map(|document| document.title.clone())
    }

    /// Number of full reads served for `document_id`.
    pub fn reads(&self, document_id: &str) -> usize {
        self.lock().documents.get(document_id).map_or(0, |document| document.reads)
    }

    /// Successfully applied batches, in order.
    pub fn batches(&self, document_id: &str) -> Vec<Vec<MutationOperation>> {
        self.lock().documents.get(document_id).map(|d| d.batches.clone()).unwrap_or_default()
    }

    /// Text of every maximal bold span.
    pub fn bold_spans(&self, document_id: &str) -> Vec<String> {
        let state = self.lock();
        let Some(document) = state.documents.get(document_id) else {
            return Vec::new();
        };

        let mut spans = Vec::new();
        let mut current: Vec<u16> = Vec::new();
        for slot in &document.slots {
            match slot {
                Slot::Text { unit, bold: true, .. } => current.push(*unit),
                _ if !current.is_empty() => {
                    spans.push(String::from_utf16_lossy(&current));
                    current.clear();
                }
                _ => {}
            }
        }
        if !current.is_empty() {
            spans.push(String::from_utf16_lossy(&current));
        }
        spans
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply_batch(
        &self,
        document_id: &str,
        operations: &[MutationOperation],
    ) -> Result<(), DocsError> {
        let mut state = self.lock();
        let injected = state
            .fail_when
            .as_ref()
            .is_some_and(|predicate| operations.iter().any(|op| predicate(op)));
        let document = state.document_mut(document_id)?;
        if injected {
            return Err(DocsError::Remote {
                document_id: document_id.to_string(),
                status: 500,
                message: "injected batch failure".to_string(),
            });
        }

        let mut slots = document.slots.clone();
        for (position, op) in operations.iter().enumerate() {
            apply_operation(&mut slots, op).map_err(|failure| match failure {
                Failure::Unresolved(source) => {
                    DocsError::UnresolvedOperation { document_id: document_id.to_string(), source }
                }
                Failure::Invalid(message) => {
                    DocsError::invalid(document_id, format!("requests[{position}]: {message}"))
                }
            })?;
        }

        document.slots = slots;
        document.batches.push(operations.to_vec());
        Ok(())
    }

    fn replace_literal(
        &self,
        document_id: &str,
        find: &str,
        replacement: &str,
    ) -> Result<u32, DocsError> {
        if find.is_empty() {
            return Err(DocsError::invalid(document_id, "replace target must not be empty"));
        }

        let mut state = self.lock();
        let document = state.document_mut(document_id)?;
        let needle: Vec<u16> = find.encode_utf16().collect();
        let matches = find_units(&document.slots, &needle);

        for &start in matches.iter().rev() {
            let (bold, italic) = match document.slots[start] {
                Slot::Text { bold, italic, .. } => (bold, italic),
                _ => (false, false),
            };
            let inserted = replacement.encode_utf16().map(|unit| Slot::Text { unit, bold, italic });
            document.slots.splice(start..start + needle.len(), inserted);
        }

        Ok(matches.len() as u32)
    }
}

impl DocumentService for InMemoryDocs {
    fn create_document<'a>(&'a self, title: &'a str) -> ServiceFuture<'a, RemoteDocument> {
        let document_id = self.insert_document(title, "");
        let created = RemoteDocument { document_id, title: title.to_string() };
        Box::pin(async move { Ok(created) })
    }

    fn get_document<'a>(&'a self, document_id: &'a str) -> ServiceFuture<'a, DocumentSnapshot> {
        let result = {
            let mut state = self.lock();
            state.document_mut(document_id).map(|document| {
                document.reads += 1;
                build_snapshot(document_id, document)
            })
        };
        Box::pin(async move { result })
    }

    fn batch_update<'a>(
        &'a self,
        document_id: &'a str,
        operations: &'a [MutationOperation],
    ) -> ServiceFuture<'a, ()> {
        let result = self.apply_batch(document_id, operations);
        Box::pin(async move { result })
    }

    fn replace_all_text<'a>(
        &'a self,
        document_id: &'a str,
        find: &'a str,
        replacement: &'a str,
    ) -> ServiceFuture<'a, u32> {
        let result = self.replace_literal(document_id, find, replacement);
        Box::pin(async move { result })
    }

    fn copy_document<'a>(
        &'a self,
        document_id: &'a str,
        name: &'a str,
    ) -> ServiceFuture<'a, RemoteDocument> {
        let result = {
            let mut state = self.lock();
            state.document_mut(document_id).map(|source| StoredDocument {
                title: name.to_string(),
                slots: source.slots.clone(),
                reads: 0,
                batches: Vec::new(),
            })
        }
        .map(|copy| {
            let document_id = self.lock().allocate(copy);
            RemoteDocument { document_id, title: name.to_string() }
        });
        Box::pin(async move { result })
    }
}

// ── Mutation semantics ─────────────────────────────────────────────

enum Failure {
    Unresolved(EncodeError),
    Invalid(String),
}

fn apply_operation(slots: &mut Vec<Slot>, op: &MutationOperation) -> Result<(), Failure> {
    match op {
        MutationOperation::InsertText { index, text } => {
            if text.is_empty() {
                return Err(Failure::Invalid("inserted text must not be empty".into()));
            }
            let at = insertion_point(slots, *index)?;
            slots.splice(at..at, text.encode_utf16().map(Slot::text));
        }
        MutationOperation::DeleteRange { start, end } => {
            let (start, end) = (*start as usize, *end as usize);
            check_deletion(slots, start, end)?;
            slots.drain(start..end);
        }
        MutationOperation::SetTextStyle { range, bold, italic } => {
            check_range(slots, *range)?;
            for slot in &mut slots[range.start as usize..range.end as usize] {
                if let Slot::Text { bold: slot_bold, italic: slot_italic, .. } = slot {
                    if let Some(bold) = bold {
                        *slot_bold = *bold;
                    }
                    if let Some(italic) = italic {
                        *slot_italic = *italic;
                    }
                }
            }
        }
        MutationOperation::SetParagraphStyle { range, .. }
        | MutationOperation::CreateBullets { range, .. } => check_range(slots, *range)?,
        MutationOperation::SetBorder { index } => {
            check_range(slots, Range::new(*index, *index + 1))?;
        }
        MutationOperation::InsertTableSkeleton { index, rows, cols } => {
            if *rows == 0 || *cols == 0 {
                return Err(Failure::Invalid("table needs at least one row and column".into()));
            }
            let at = insertion_point(slots, *index)?;
            slots.splice(at..at, table_skeleton(*rows, *cols));
        }
        MutationOperation::SetCellText { row, col, .. } => {
            return Err(Failure::Unresolved(EncodeError::UnresolvedCellWrite {
                row: *row,
                col: *col,
            }));
        }
    }
    Ok(())
}

/// A new paragraph break followed by an empty `rows × cols` table.
fn table_skeleton(rows: u32, cols: u32) -> Vec<Slot> {
    let mut skeleton = vec![Slot::text(NEWLINE), Slot::TableStart];
    for _ in 0..rows {
        skeleton.push(Slot::RowStart);
        for _ in 0..cols {
            skeleton.push(Slot::CellStart);
            skeleton.push(Slot::text(NEWLINE));
        }
    }
    skeleton.push(Slot::TableEnd);
    skeleton
}

fn insertion_point(slots: &[Slot], index: u32) -> Result<usize, Failure> {
    let at = index as usize;
    if at == 0 || at >= slots.len() {
        return Err(Failure::Invalid(format!(
            "index {index} must be between 1 and {}",
            slots.len().saturating_sub(1)
        )));
    }
    if !slots[at].is_text() {
        return Err(Failure::Invalid(format!("index {index} is not inside a paragraph")));
    }
    Ok(at)
}

fn check_range(slots: &[Slot], range: Range) -> Result<(), Failure> {
    if range.start == 0 || range.start > range.end || range.end as usize > slots.len() {
        return Err(Failure::Invalid(format!(
            "range [{}, {}) is outside the document body (end {})",
            range.start,
            range.end,
            slots.len()
        )));
    }
    Ok(())
}

fn check_deletion(slots: &[Slot], start: usize, end: usize) -> Result<(), Failure> {
    let last = slots.len().saturating_sub(1);
    if start == 0 || start >= end || end > last {
        return Err(Failure::Invalid(format!(
            "delete range [{start}, {end}) must lie within [1, {last})"
        )));
    }

    let mut depth = 0usize;
    for slot in &slots[start..end] {
        match slot {
            Slot::TableStart => depth += 1,
            Slot::TableEnd if depth == 0 => {
                return Err(Failure::Invalid("delete range cuts through a table".into()));
            }
            Slot::TableEnd => depth -= 1,
            Slot::RowStart | Slot::CellStart if depth == 0 => {
                return Err(Failure::Invalid("delete range cuts through a table".into()));
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(Failure::Invalid("delete range cuts through a table".into()));
    }

    if slots[end - 1].is_newline() {
        match slots[end] {
            Slot::TableStart => {
                return Err(Failure::Invalid("cannot delete the newline before a table".into()));
            }
            Slot::RowStart | Slot::CellStart | Slot::TableEnd => {
                return Err(Failure::Invalid("cannot delete the last newline of a cell".into()));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Start slots of non-overlapping matches of `needle` over contiguous text.
fn find_units(slots: &[Slot], needle: &[u16]) -> Vec<usize> {
    let mut matches = Vec::new();
    let mut index = 1;
    while index + needle.len() <= slots.len() {
        let hit = slots[index..index + needle.len()]
            .iter()
            .zip(needle)
            .all(|(slot, unit)| matches!(slot, Slot::Text { unit: u, .. } if u == unit));
        if hit {
            matches.push(index);
            index += needle.len();
        } else {
            index += 1;
        }
    }
    matches
}

// ── Snapshots ──────────────────────────────────────────────────────

fn build_snapshot(document_id: &str, document: &StoredDocument) -> DocumentSnapshot {
    let slots = &document.slots;
    let mut body = Vec::new();
    let mut index = 0;

    while index < slots.len() {
        let (element, next) = match slots[index] {
            Slot::SectionBreak => (
                StructuralElement {
                    start: index as u32,
                    end: index as u32 + 1,
                    content: ElementContent::SectionBreak,
                },
                index + 1,
            ),
            Slot::TableStart => read_table(slots, index),
            Slot::Text { .. } => read_paragraph(slots, index),
            Slot::RowStart | Slot::CellStart | Slot::TableEnd => {
                index += 1;
                continue;
            }
        };
        body.push(element);
        index = next;
    }

    DocumentSnapshot { document_id: document_id.to_string(), title: document.title.clone(), body }
}

/// Reads one paragraph starting at `start`; ends after its newline.
fn read_paragraph(slots: &[Slot], start: usize) -> (StructuralElement, usize) {
    let mut runs: Vec<TextRun> = Vec::new();
    let mut units: Vec<u16> = Vec::new();
    let mut run_start = start;
    let mut run_style = None;
    let mut index = start;

    while let Some(Slot::Text { unit, bold, italic }) = slots.get(index).copied() {
        if run_style.is_some_and(|style| style != (bold, italic)) {
            runs.push(text_run(run_start, index, &units));
            units.clear();
            run_start = index;
        }
        run_style = Some((bold, italic));
        units.push(unit);
        index += 1;
        if unit == NEWLINE {
            break;
        }
    }
    if !units.is_empty() {
        runs.push(text_run(run_start, index, &units));
    }

    let element = StructuralElement {
        start: start as u32,
        end: index as u32,
        content: ElementContent::Paragraph { runs },
    };
    (element, index)
}

fn text_run(start: usize, end: usize, units: &[u16]) -> TextRun {
    TextRun { start: start as u32, end: end as u32, text: String::from_utf16_lossy(units) }
}

fn read_table(slots: &[Slot], start: usize) -> (StructuralElement, usize) {
    let mut rows: Vec<TableRow> = Vec::new();
    let mut index = start + 1;

    while index < slots.len() {
        match slots[index] {
            Slot::RowStart => {
                rows.push(TableRow { cells: Vec::new() });
                index += 1;
            }
            Slot::CellStart => {
                let cell_start = index;
                index += 1;
                let mut content = Vec::new();
                while slots.get(index).is_some_and(|slot| slot.is_text()) {
                    let (paragraph, next) = read_paragraph(slots, index);
                    content.push(paragraph);
                    index = next;
                }
                if let Some(row) = rows.last_mut() {
                    row.cells.push(TableCell {
                        start: cell_start as u32,
                        end: index as u32,
                        content,
                    });
                }
            }
            Slot::TableEnd => {
                index += 1;
                break;
            }
            Slot::SectionBreak | Slot::TableStart | Slot::Text { .. } => index += 1,
        }
    }

    let element = StructuralElement {
        start: start as u32,
        end: index as u32,
        content: ElementContent::Table(TableElement { rows }),
    };
    (element, index)
}
