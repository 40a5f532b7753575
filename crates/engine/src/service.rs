// Contract of the remote rich-text document service.
//
// Production talks HTTP (`http::HttpDocumentService`); tests use the
// offset-faithful `memory::InMemoryDocs`.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use docpilot_common::document::DocumentSnapshot;
use docpilot_common::types::MutationOperation;

use crate::error::DocsError;

pub type ServiceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, DocsError>> + Send + 'a>>;

/// Identity of a document the service created or copied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDocument {
    pub document_id: String,
    pub title: String,
}

pub trait DocumentService: Send + Sync {
    /// Allocates an empty document.
    fn create_document<'a>(&'a self, title: &'a str) -> ServiceFuture<'a, RemoteDocument>;

    /// Full read of the element tree with absolute offsets.
    fn get_document<'a>(&'a self, document_id: &'a str) -> ServiceFuture<'a, DocumentSnapshot>;

    /// Applies `operations` atomically and in order. Plan-level cell writes
    /// must already be resolved to text inserts.
    fn batch_update<'a>(
        &'a self,
        document_id: &'a str,
        operations: &'a [MutationOperation],
    ) -> ServiceFuture<'a, ()>;

    /// Literal, case-sensitive, global replace. Returns occurrences changed.
    fn replace_all_text<'a>(
        &'a self,
        document_id: &'a str,
        find: &'a str,
        replacement: &'a str,
    ) -> ServiceFuture<'a, u32>;

    fn copy_document<'a>(
        &'a self,
        document_id: &'a str,
        name: &'a str,
    ) -> ServiceFuture<'a, RemoteDocument>;
}
