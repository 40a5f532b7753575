// Document mutation sequencer: whole-document operations against one handle.
//
// Every remote call is awaited before the next offset is computed. The handle
// caches the end-of-content offset and keeps it current from the known effect
// of plain inserts and deletes; anything server-determined forces a re-read.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use docpilot_common::document::SearchMatch;
use docpilot_common::format::{batch_operations, covering_range};
use docpilot_common::markdown::{compile, CompiledDocument};
use docpilot_common::types::{utf16_len, MutationOperation, Range, DOCUMENT_ORIGIN};

use crate::config::Pacing;
use crate::error::DocsError;
use crate::service::{DocumentService, RemoteDocument};
use crate::tables::TableMaterializer;

/// End offset of an empty document: the body holds a single newline.
pub const EMPTY_DOCUMENT_END: u32 = DOCUMENT_ORIGIN + 1;

/// A remote document plus a possibly-stale end-of-content offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHandle {
    document_id: String,
    cached_end: Option<u32>,
}

impl DocumentHandle {
    pub fn new(document_id: impl Into<String>) -> Self {
        Self { document_id: document_id.into(), cached_end: None }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn cached_end(&self) -> Option<u32> {
        self.cached_end
    }

    pub(crate) fn record_read(&mut self, end_of_content: u32) {
        self.cached_end = Some(end_of_content);
    }

    pub(crate) fn record_insert(&mut self, length: u32) {
        if let Some(end) = self.cached_end.as_mut() {
            *end += length;
        }
    }

    pub(crate) fn record_delete(&mut self, range: Range) {
        if let Some(end) = self.cached_end.as_mut() {
            *end = end.saturating_sub(range.len());
        }
    }

    pub(crate) fn record_replace(&mut self, occurrences: u32, find_len: u32, replacement_len: u32) {
        if let Some(end) = self.cached_end.as_mut() {
            let grown = i64::from(*end)
                + i64::from(occurrences) * (i64::from(replacement_len) - i64::from(find_len));
            *end = u32::try_from(grown).unwrap_or(EMPTY_DOCUMENT_END);
        }
    }

    pub(crate) fn invalidate(&mut self) {
        self.cached_end = None;
    }
}

/// Where `insert_at` puts its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// The first writable offset.
    Start,
    /// Just before the final newline.
    End,
    Offset(u32),
    /// Immediately after the first case-sensitive match of the text.
    After(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnchorParseError {
    #[error("anchor must be `start`, `end`, a number, or `after:<text>`, got `{0}`")]
    Unrecognized(String),
    #[error("`after:` anchor needs text to look for")]
    EmptyAfter,
}

impl FromStr for Anchor {
    type Err = AnchorParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if let Some(target) = raw.strip_prefix("after:") {
            return if target.is_empty() {
                Err(AnchorParseError::EmptyAfter)
            } else {
                Ok(Self::After(target.to_string()))
            };
        }

        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("start") {
            Ok(Self::Start)
        } else if trimmed.eq_ignore_ascii_case("end") {
            Ok(Self::End)
        } else {
            trimmed
                .parse::<u32>()
                .map(Self::Offset)
                .map_err(|_| AnchorParseError::Unrecognized(raw.to_string()))
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::End => write!(f, "end"),
            Self::Offset(offset) => write!(f, "{offset}"),
            Self::After(target) => write!(f, "after:{target}"),
        }
    }
}

/// A formatting batch that was rejected and skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedBatch {
    pub index: usize,
    pub range: Option<Range>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormattingReport {
    pub batches: usize,
    pub operations: usize,
    pub failed_batches: Vec<FailedBatch>,
}

impl FormattingReport {
    pub fn is_clean(&self) -> bool {
        self.failed_batches.is_empty()
    }
}

/// Outcome of `create`, `replace_all`, and `append`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    pub document_id: String,
    pub inserted_at: u32,
    pub inserted_length: u32,
    pub tables: usize,
    pub formatting: FormattingReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsertReport {
    pub document_id: String,
    pub index: u32,
    pub length: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentText {
    pub document_id: String,
    pub title: String,
    pub text: String,
}

pub struct DocumentSequencer<S> {
    service: S,
    pacing: Pacing,
}

impl<S: DocumentService> DocumentSequencer<S> {
    pub fn new(service: S, pacing: Pacing) -> Self {
        Self { service, pacing }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Creates a document titled `title` holding the compiled `markdown`.
    pub async fn create(&self, title: &str, markdown: &str) -> Result<WriteReport, DocsError> {
        let created = self.service.create_document(title).await?;
        info!(document_id = %created.document_id, title, "created document");

        let mut handle = DocumentHandle::new(created.document_id);
        handle.record_read(EMPTY_DOCUMENT_END);
        let compiled = compile(markdown);
        self.write_compiled(&mut handle, &compiled, DOCUMENT_ORIGIN, "").await
    }

    /// Clears the body, then writes `markdown` as `create` would.
    pub async fn replace_all(
        &self,
        handle: &mut DocumentHandle,
        markdown: &str,
    ) -> Result<WriteReport, DocsError> {
        let end = self.end_of_content(handle).await?;
        if end > EMPTY_DOCUMENT_END {
            let range = Range::new(DOCUMENT_ORIGIN, end - 1);
            let clear = [MutationOperation::DeleteRange { start: range.start, end: range.end }];
            self.service.batch_update(handle.document_id(), &clear).await?;
            handle.record_delete(range);
            debug!(document_id = handle.document_id(), end, "cleared document body");
        }

        let compiled = compile(markdown);
        self.write_compiled(handle, &compiled, DOCUMENT_ORIGIN, "").await
    }

    /// Writes `markdown` after the existing content, separated by a newline.
    pub async fn append(
        &self,
        handle: &mut DocumentHandle,
        markdown: &str,
    ) -> Result<WriteReport, DocsError> {
        let end = self.end_of_content(handle).await?;
        let at = end - 1;
        let compiled = compile(markdown).shifted(at);
        self.write_compiled(handle, &compiled, at, "\n").await
    }

    /// Inserts `text` verbatim at `anchor`.
    pub async fn insert_at(
        &self,
        handle: &mut DocumentHandle,
        anchor: &Anchor,
        text: &str,
    ) -> Result<InsertReport, DocsError> {
        let index = self.resolve_anchor(handle, anchor).await?;
        let length = utf16_len(text);
        if length > 0 {
            let insert = [MutationOperation::InsertText { index, text: text.to_string() }];
            self.service.batch_update(handle.document_id(), &insert).await?;
            handle.record_insert(length);
        }
        info!(document_id = handle.document_id(), %anchor, index, length, "inserted text");

        Ok(InsertReport { document_id: handle.document_id().to_string(), index, length })
    }

    /// Case-insensitive search over every text run, table cells included.
    pub async fn search(
        &self,
        handle: &mut DocumentHandle,
        term: &str,
    ) -> Result<Vec<SearchMatch>, DocsError> {
        let snapshot = self.service.get_document(handle.document_id()).await?;
        handle.record_read(snapshot.end_of_content());
        Ok(snapshot.search(term))
    }

    /// Literal, case-sensitive, global replace. Zero occurrences is a success.
    pub async fn replace_text(
        &self,
        handle: &mut DocumentHandle,
        find: &str,
        replacement: &str,
    ) -> Result<u32, DocsError> {
        if find.is_empty() {
            return Err(DocsError::invalid(handle.document_id(), "search text must not be empty"));
        }

        let occurrences =
            self.service.replace_all_text(handle.document_id(), find, replacement).await?;
        handle.record_replace(occurrences, utf16_len(find), utf16_len(replacement));
        info!(document_id = handle.document_id(), occurrences, "replaced text");
        Ok(occurrences)
    }

    pub async fn delete_text(
        &self,
        handle: &mut DocumentHandle,
        find: &str,
    ) -> Result<u32, DocsError> {
        self.replace_text(handle, find, "").await
    }

    pub async fn copy(
        &self,
        handle: &DocumentHandle,
        new_name: &str,
    ) -> Result<RemoteDocument, DocsError> {
        let copy = self.service.copy_document(handle.document_id(), new_name).await?;
        info!(source = handle.document_id(), copy = %copy.document_id, "copied document");
        Ok(copy)
    }

    /// Title and plain text, runs concatenated in document order.
    pub async fn read(&self, handle: &mut DocumentHandle) -> Result<DocumentText, DocsError> {
        let snapshot = self.service.get_document(handle.document_id()).await?;
        handle.record_read(snapshot.end_of_content());
        Ok(DocumentText {
            document_id: snapshot.document_id.clone(),
            title: snapshot.title.clone(),
            text: snapshot.plain_text(),
        })
    }

    async fn end_of_content(&self, handle: &mut DocumentHandle) -> Result<u32, DocsError> {
        if let Some(end) = handle.cached_end() {
            return Ok(end);
        }
        let snapshot = self.service.get_document(handle.document_id()).await?;
        let end = snapshot.end_of_content();
        handle.record_read(end);
        Ok(end)
    }

    async fn resolve_anchor(
        &self,
        handle: &mut DocumentHandle,
        anchor: &Anchor,
    ) -> Result<u32, DocsError> {
        match anchor {
            Anchor::Start => Ok(DOCUMENT_ORIGIN),
            Anchor::End => Ok(self.end_of_content(handle).await? - 1),
            Anchor::Offset(offset) => {
                let end = self.end_of_content(handle).await?;
                if (DOCUMENT_ORIGIN..end).contains(offset) {
                    Ok(*offset)
                } else {
                    Err(DocsError::location_not_found(handle.document_id(), anchor.to_string()))
                }
            }
            Anchor::After(target) => {
                let snapshot = self.service.get_document(handle.document_id()).await?;
                handle.record_read(snapshot.end_of_content());
                snapshot
                    .find_literal(target, DOCUMENT_ORIGIN)
                    .map(|range| range.end)
                    .ok_or_else(|| {
                        DocsError::location_not_found(handle.document_id(), anchor.to_string())
                    })
            }
        }
    }

    async fn write_compiled(
        &self,
        handle: &mut DocumentHandle,
        compiled: &CompiledDocument,
        index: u32,
        prefix: &str,
    ) -> Result<WriteReport, DocsError> {
        let text = format!("{prefix}{}", compiled.content.plain_text);
        let inserted_length = utf16_len(&text);
        if inserted_length > 0 {
            let insert = [MutationOperation::InsertText { index, text }];
            self.service.batch_update(handle.document_id(), &insert).await?;
            handle.record_insert(inserted_length);
        }
        debug!(document_id = handle.document_id(), index, inserted_length, "inserted content");

        let formatting = self.apply_formatting(handle, &compiled.operations).await;
        let materializer = TableMaterializer::new(&self.service, self.pacing);
        let tables = materializer.materialize_all(handle, compiled).await?;

        info!(
            document_id = handle.document_id(),
            inserted_length,
            tables,
            failed_batches = formatting.failed_batches.len(),
            "wrote markdown"
        );

        Ok(WriteReport {
            document_id: handle.document_id().to_string(),
            inserted_at: index,
            inserted_length,
            tables,
            formatting,
        })
    }

    /// Sends formatting in capped batches. A failed batch is logged, recorded,
    /// and skipped; later batches still run.
    async fn apply_formatting(
        &self,
        handle: &DocumentHandle,
        operations: &[MutationOperation],
    ) -> FormattingReport {
        let mut report = FormattingReport::default();
        let batches = batch_operations(operations, self.pacing.batch_size);

        for (index, batch) in batches.into_iter().enumerate() {
            if index > 0 {
                pause(self.pacing.batch_delay).await;
            }
            report.batches += 1;
            report.operations += batch.len();

            if let Err(error) = self.service.batch_update(handle.document_id(), batch).await {
                let range = covering_range(batch);
                warn!(
                    document_id = handle.document_id(),
                    batch = index,
                    ?range,
                    %error,
                    "formatting batch failed; skipping"
                );
                let message = error.to_string();
                report.failed_batches.push(FailedBatch { index, range, message });
            }
        }

        report
    }
}

pub(crate) async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
