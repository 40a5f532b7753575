// Error taxonomy for remote document operations.

use thiserror::Error;

use docpilot_common::protocol::docs_api::{DecodeError, EncodeError};

#[derive(Debug, Error)]
pub enum DocsError {
    #[error("location `{location}` not found in document {document_id}")]
    LocationNotFound { document_id: String, location: String },

    #[error(
        "document {document_id} not found; check the id and that the access token can open it"
    )]
    RemoteNotFound { document_id: String },

    #[error("rate limited while updating document {document_id}{}", retry_hint(.retry_after_secs))]
    RateLimited { document_id: String, retry_after_secs: Option<u64> },

    #[error("authentication rejected for document {document_id}: {message}")]
    Auth { document_id: String, message: String },

    #[error("remote service returned {status} for document {document_id}: {message}")]
    Remote { document_id: String, status: u16, message: String },

    #[error("network error talking to the document service for {document_id}: {message}")]
    Transport { document_id: String, message: String },

    #[error("could not decode response for document {document_id}")]
    Decode {
        document_id: String,
        #[source]
        source: DecodeError,
    },

    #[error("operation for document {document_id} was never resolved to an offset")]
    UnresolvedOperation {
        document_id: String,
        #[source]
        source: EncodeError,
    },

    #[error("document {document_id} rejected operation: {message}")]
    InvalidOperation { document_id: String, message: String },

    #[error("no access token: set the {variable} environment variable")]
    MissingToken { variable: String },

    #[error("invalid service URL `{url}`: {message}")]
    InvalidEndpoint { url: String, message: String },
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    match retry_after_secs {
        Some(secs) => format!("; retry after {secs}s"),
        None => String::new(),
    }
}

impl DocsError {
    /// The document the failing call addressed, when there was one.
    pub fn document_id(&self) -> Option<&str> {
        match self {
            Self::LocationNotFound { document_id, .. }
            | Self::RemoteNotFound { document_id }
            | Self::RateLimited { document_id, .. }
            | Self::Auth { document_id, .. }
            | Self::Remote { document_id, .. }
            | Self::Transport { document_id, .. }
            | Self::Decode { document_id, .. }
            | Self::UnresolvedOperation { document_id, .. }
            | Self::InvalidOperation { document_id, .. } => Some(document_id),
            Self::MissingToken { .. } | Self::InvalidEndpoint { .. } => None,
        }
    }

    pub fn invalid(document_id: &str, message: impl Into<String>) -> Self {
        Self::InvalidOperation { document_id: document_id.to_string(), message: message.into() }
    }

    pub fn location_not_found(document_id: &str, location: impl Into<String>) -> Self {
        Self::LocationNotFound { document_id: document_id.to_string(), location: location.into() }
    }
}
