use docpilot_common::document::{DocumentSnapshot, ElementContent, StructuralElement};
use docpilot_common::markdown::compile;
use docpilot_common::types::MutationOperation;
use docpilot_engine::config::Pacing;
use docpilot_engine::memory::InMemoryDocs;
use docpilot_engine::tables::TableMaterializer;
use docpilot_engine::{DocsError, DocumentHandle, DocumentSequencer};

fn sequencer(docs: &InMemoryDocs, batch_size: usize) -> DocumentSequencer<InMemoryDocs> {
    DocumentSequencer::new(docs.clone(), Pacing::immediate(batch_size))
}

fn paragraph_text(elements: &[StructuralElement]) -> String {
    elements
        .iter()
        .filter_map(|element| match &element.content {
            ElementContent::Paragraph { runs } => {
                Some(runs.iter().map(|run| run.text.as_str()).collect::<String>())
            }
            _ => None,
        })
        .collect()
}

/// Cell texts of every table, row-major, trailing newline stripped.
fn table_cells(snapshot: &DocumentSnapshot) -> Vec<Vec<String>> {
    snapshot
        .body
        .iter()
        .filter_map(|element| match &element.content {
            ElementContent::Table(table) => Some(
                table
                    .rows
                    .iter()
                    .flat_map(|row| &row.cells)
                    .map(|cell| paragraph_text(&cell.content).trim_end_matches('\n').to_string())
                    .collect(),
            ),
            _ => None,
        })
        .collect()
}

fn inserted_indexes(batch: &[MutationOperation]) -> Vec<u32> {
    batch
        .iter()
        .filter_map(|op| match op {
            MutationOperation::InsertText { index, .. } => Some(*index),
            _ => None,
        })
        .collect()
}

const TABLE_MARKDOWN: &str =
    "Intro **x**\n\n| H1 | H2 |\n|---|---|\n| a | b |\n| c | d |\n\n## After\n";

#[tokio::test]
async fn append_inserts_before_final_newline_with_shifted_formatting() {
    let docs = InMemoryDocs::new();
    let id = docs.insert_document("Log", "existing\n");
    let mut handle = DocumentHandle::new(id.clone());

    let report = sequencer(&docs, 50)
        .append(&mut handle, "## Next\n")
        .await
        .expect("append should succeed");

    assert_eq!(report.inserted_at, 9);
    assert_eq!(docs.text(&id).expect("document exists"), "existing\nNext\n\n");

    let batches = docs.batches(&id);
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[1], compile("## Next\n").shifted(9).operations);
    assert!(matches!(
        batches[1].first(),
        Some(MutationOperation::SetParagraphStyle { range, .. }) if range.start == 10
    ));
    assert_eq!(docs.reads(&id), 1);
}

#[tokio::test]
async fn consecutive_appends_reuse_the_cached_end() {
    let docs = InMemoryDocs::new();
    let id = docs.insert_document("Log", "a\n");
    let sequencer = sequencer(&docs, 50);
    let mut handle = DocumentHandle::new(id.clone());

    sequencer.append(&mut handle, "b\n").await.expect("first append");
    sequencer.append(&mut handle, "c\n").await.expect("second append");

    assert_eq!(docs.text(&id).expect("document exists"), "a\nb\n\nc\n\n");
    assert_eq!(docs.reads(&id), 1);
}

#[tokio::test]
async fn replace_all_clears_then_writes() {
    let docs = InMemoryDocs::new();
    let id = docs.insert_document("Draft", "old stuff\nmore\n");
    let mut handle = DocumentHandle::new(id.clone());

    let report = sequencer(&docs, 50)
        .replace_all(&mut handle, "# New\n")
        .await
        .expect("replace_all should succeed");

    assert_eq!(report.inserted_at, 1);
    assert_eq!(docs.text(&id).expect("document exists"), "New\n\n");
    assert!(matches!(
        docs.batches(&id)[0].as_slice(),
        [MutationOperation::DeleteRange { start: 1, end: 15 }]
    ));
}

#[tokio::test]
async fn replace_and_delete_report_occurrences() {
    let docs = InMemoryDocs::new();
    let id = docs.insert_document("Pets", "a cat and a cat\n");
    let sequencer = sequencer(&docs, 50);
    let mut handle = DocumentHandle::new(id.clone());

    assert_eq!(sequencer.replace_text(&mut handle, "cat", "dog").await.expect("replace"), 2);
    assert_eq!(sequencer.replace_text(&mut handle, "Dog", "cat").await.expect("replace"), 0);
    assert_eq!(sequencer.delete_text(&mut handle, "zebra").await.expect("delete"), 0);
    assert_eq!(sequencer.delete_text(&mut handle, " and a dog").await.expect("delete"), 1);

    assert_eq!(docs.text(&id).expect("document exists"), "a dog\n");
}

#[tokio::test]
async fn search_is_case_insensitive_and_reaches_table_cells() {
    let docs = InMemoryDocs::new();
    let sequencer = sequencer(&docs, 50);
    let created = sequencer.create("Search", TABLE_MARKDOWN).await.expect("create");
    let mut handle = DocumentHandle::new(created.document_id);

    let hits = sequencer.search(&mut handle, "h2").await.expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].text, "H2");

    let hits = sequencer.search(&mut handle, "AFTER").await.expect("search");
    assert_eq!(hits.len(), 1);
    assert!(hits[0].context.contains("After"));

    assert!(sequencer.search(&mut handle, "missing").await.expect("search").is_empty());
}

#[tokio::test]
async fn tables_are_materialized_with_text_and_bold_header() {
    let docs = InMemoryDocs::new();
    let report = sequencer(&docs, 50).create("Tables", TABLE_MARKDOWN).await.expect("create");
    let id = report.document_id.clone();

    assert_eq!(report.tables, 1);
    let snapshot = docs.snapshot(&id).expect("document exists");
    assert_eq!(table_cells(&snapshot), vec![vec!["H1", "H2", "a", "b", "c", "d"]]);
    assert!(!snapshot.plain_text().contains("{{docpilot-table"));
    assert!(snapshot.plain_text().ends_with("After\n\n"));
    assert_eq!(docs.bold_spans(&id), vec!["x", "H1", "H2"]);

    let cell_batch = docs
        .batches(&id)
        .into_iter()
        .find(|batch| batch.len() == 6 && inserted_indexes(batch).len() == 6)
        .expect("cell writes go out in one batch");
    let indexes = inserted_indexes(&cell_batch);
    assert!(indexes.windows(2).all(|pair| pair[0] > pair[1]), "{indexes:?}");
}

#[tokio::test]
async fn several_tables_land_in_source_order() {
    let docs = InMemoryDocs::new();
    let markdown = "| A |\n|---|\n| 1 |\n\nmiddle\n\n| B |\n|---|\n| 2 |\n";
    let report = sequencer(&docs, 50).create("Two", markdown).await.expect("create");

    assert_eq!(report.tables, 2);
    let snapshot = docs.snapshot(&report.document_id).expect("document exists");
    assert_eq!(table_cells(&snapshot), vec![vec!["A", "1"], vec!["B", "2"]]);
    assert!(snapshot.plain_text().contains("middle"));
    // One snapshot up front plus one re-read per table.
    assert_eq!(docs.reads(&report.document_id), 3);
}

#[tokio::test]
async fn failed_formatting_batch_is_skipped_and_later_batches_run() {
    let docs = InMemoryDocs::new();
    docs.fail_batches_when(|op| matches!(op, MutationOperation::SetTextStyle { .. }));

    let report = sequencer(&docs, 1)
        .create("Partial", "**a** and *b*\n\n# Head\n")
        .await
        .expect("formatting failures do not fail the write");

    assert_eq!(report.formatting.batches, 3);
    let failed: Vec<usize> = report.formatting.failed_batches.iter().map(|f| f.index).collect();
    assert_eq!(failed, vec![0, 1]);
    assert!(report.formatting.failed_batches.iter().all(|f| f.range.is_some()));

    let batches = docs.batches(&report.document_id);
    assert!(matches!(batches.last().map(Vec::as_slice), Some([
        MutationOperation::SetParagraphStyle { .. }
    ])));
    assert!(docs.bold_spans(&report.document_id).is_empty());
}

#[tokio::test]
async fn header_bold_failure_leaves_table_in_place() {
    let docs = InMemoryDocs::new();
    docs.fail_batches_when(|op| matches!(op, MutationOperation::SetTextStyle { .. }));

    let report = sequencer(&docs, 50)
        .create("Plain", "| K | V |\n|---|---|\n| x | 1 |\n")
        .await
        .expect("header bolding is best effort");

    let snapshot = docs.snapshot(&report.document_id).expect("document exists");
    assert_eq!(table_cells(&snapshot), vec![vec!["K", "V", "x", "1"]]);
    assert!(docs.bold_spans(&report.document_id).is_empty());
}

#[tokio::test]
async fn token_typed_by_the_author_stays_as_text() {
    let docs = InMemoryDocs::new();
    let markdown = "{{docpilot-table-0}}\n\nbetween\n\n| A |\n|---|\n| 1 |\n\nend\n";
    let report = sequencer(&docs, 50).create("Literal", markdown).await.expect("create");

    let snapshot = docs.snapshot(&report.document_id).expect("document exists");
    assert_eq!(table_cells(&snapshot), vec![vec!["A", "1"]]);

    let text = snapshot.plain_text();
    assert!(text.starts_with("{{docpilot-table-0}}\n\nbetween\n"), "{text:?}");
    assert!(!text.contains("{{docpilot-table-1}}"), "{text:?}");
    let between = text.find("between").expect("paragraph kept");
    let cell = text.find("A\n").expect("table cell written");
    assert!(between < cell, "{text:?}");
}

#[tokio::test]
async fn body_text_under_empty_header_stays_literal() {
    let docs = InMemoryDocs::new();
    let markdown = "| | H |\n|---|---|\n| a | b |\n";
    let report = sequencer(&docs, 50).create("Ragged", markdown).await.expect("create");

    assert_eq!(report.tables, 0);
    let text = docs.text(&report.document_id).expect("document exists");
    assert!(text.contains("| a | b |"), "{text:?}");
}

#[tokio::test]
async fn placeholder_found_by_literal_search_when_moved() {
    let docs = InMemoryDocs::new();
    let id = docs.insert_document("Moved", "moved\n{{docpilot-table-0}}\n");
    let compiled = compile("| A |\n|---|\n| 1 |\n");
    let mut handle = DocumentHandle::new(id.clone());

    let materializer = TableMaterializer::new(&docs, Pacing::immediate(50));
    let count = materializer.materialize_all(&mut handle, &compiled).await.expect("materialize");

    assert_eq!(count, 1);
    let snapshot = docs.snapshot(&id).expect("document exists");
    assert_eq!(table_cells(&snapshot), vec![vec!["A", "1"]]);
    assert!(snapshot.plain_text().starts_with("moved\n"));
}

#[tokio::test]
async fn missing_placeholder_is_location_not_found() {
    let docs = InMemoryDocs::new();
    let id = docs.insert_document("Empty", "no token here\n");
    let compiled = compile("| A |\n|---|\n| 1 |\n");
    let mut handle = DocumentHandle::new(id.clone());

    let error = TableMaterializer::new(&docs, Pacing::immediate(50))
        .materialize_all(&mut handle, &compiled)
        .await
        .expect_err("no placeholder to replace");

    assert!(matches!(
        error,
        DocsError::LocationNotFound { ref location, .. } if location == "{{docpilot-table-0}}"
    ));
    assert_eq!(docs.text(&id).expect("document exists"), "no token here\n");
}

#[tokio::test]
async fn copy_duplicates_content_under_a_new_name() {
    let docs = InMemoryDocs::new();
    let id = docs.insert_document("Source", "body\n");
    let handle = DocumentHandle::new(id.clone());

    let copy = sequencer(&docs, 50).copy(&handle, "Source (copy)").await.expect("copy");

    assert_ne!(copy.document_id, id);
    assert_eq!(copy.title, "Source (copy)");
    assert_eq!(docs.text(&copy.document_id).expect("copy exists"), "body\n");
    assert_eq!(docs.title(&id).as_deref(), Some("Source"));
}

#[tokio::test]
async fn unknown_document_is_remote_not_found() {
    let docs = InMemoryDocs::new();
    let mut handle = DocumentHandle::new("mem-doc-9999");

    let error = sequencer(&docs, 50).read(&mut handle).await.expect_err("unknown document");
    assert!(matches!(error, DocsError::RemoteNotFound { .. }));
}
