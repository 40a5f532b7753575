// HTTP binding of the document service: JSON over reqwest with a bearer token.

use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use docpilot_common::document::DocumentSnapshot;
use docpilot_common::protocol::docs_api::{
    decode_document, decode_occurrences_changed, encode_batch, encode_replace_all_text,
    DecodeError,
};
use docpilot_common::types::MutationOperation;

use crate::config::ServiceConfig;
use crate::error::DocsError;
use crate::service::{DocumentService, RemoteDocument, ServiceFuture};

/// Stand-in document id for calls made before a document exists.
const NEW_DOCUMENT: &str = "(new document)";

/// Longest raw body echoed back in an error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

pub struct HttpDocumentService {
    client: Client,
    api_base: Url,
    files_api_base: Url,
    token: String,
}

#[derive(Debug, Deserialize)]
struct WireFile {
    id: String,
    #[serde(default)]
    name: String,
}

impl HttpDocumentService {
    pub fn new(config: &ServiceConfig, token: String) -> Result<Self, DocsError> {
        let api_base = parse_base(&config.api_base)?;
        let files_api_base = parse_base(&config.files_api_base)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|error| transport_error(NEW_DOCUMENT, &error))?;

        Ok(Self { client, api_base, files_api_base, token })
    }

    async fn send(&self, document_id: &str, request: RequestBuilder) -> Result<Vec<u8>, DocsError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|error| transport_error(document_id, &error))?;

        let status = response.status();
        if status.is_success() {
            let body =
                response.bytes().await.map_err(|error| transport_error(document_id, &error))?;
            return Ok(body.to_vec());
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();
        Err(status_error(document_id, status, retry_after, &body))
    }
}

impl DocumentService for HttpDocumentService {
    fn create_document<'a>(&'a self, title: &'a str) -> ServiceFuture<'a, RemoteDocument> {
        Box::pin(async move {
            let url = endpoint(&self.api_base, &["documents"]);
            debug!(%url, title, "creating document");
            let request = self.client.post(url).json(&json!({ "title": title }));
            let body = self.send(NEW_DOCUMENT, request).await?;
            let snapshot =
                decode_document(&body).map_err(|source| decode_error(NEW_DOCUMENT, source))?;
            Ok(RemoteDocument { document_id: snapshot.document_id, title: snapshot.title })
        })
    }

    fn get_document<'a>(&'a self, document_id: &'a str) -> ServiceFuture<'a, DocumentSnapshot> {
        Box::pin(async move {
            let url = endpoint(&self.api_base, &["documents", document_id]);
            let body = self.send(document_id, self.client.get(url)).await?;
            decode_document(&body).map_err(|source| decode_error(document_id, source))
        })
    }

    fn batch_update<'a>(
        &'a self,
        document_id: &'a str,
        operations: &'a [MutationOperation],
    ) -> ServiceFuture<'a, ()> {
        Box::pin(async move {
            let payload = encode_batch(operations).map_err(|source| {
                DocsError::UnresolvedOperation { document_id: document_id.to_string(), source }
            })?;
            let url = batch_update_url(&self.api_base, document_id);
            debug!(document_id, operations = operations.len(), "sending batch update");
            self.send(document_id, self.client.post(url).json(&payload)).await?;
            Ok(())
        })
    }

    fn replace_all_text<'a>(
        &'a self,
        document_id: &'a str,
        find: &'a str,
        replacement: &'a str,
    ) -> ServiceFuture<'a, u32> {
        Box::pin(async move {
            let payload = encode_replace_all_text(find, replacement, true);
            let url = batch_update_url(&self.api_base, document_id);
            let body = self.send(document_id, self.client.post(url).json(&payload)).await?;
            decode_occurrences_changed(&body).map_err(|source| decode_error(document_id, source))
        })
    }

    fn copy_document<'a>(
        &'a self,
        document_id: &'a str,
        name: &'a str,
    ) -> ServiceFuture<'a, RemoteDocument> {
        Box::pin(async move {
            let url = endpoint(&self.files_api_base, &["files", document_id, "copy"]);
            let body =
                self.send(document_id, self.client.post(url).json(&json!({ "name": name }))).await?;
            let file: WireFile = serde_json::from_slice(&body)
                .map_err(|error| decode_error(document_id, DecodeError::from(error)))?;
            let title = if file.name.is_empty() { name.to_string() } else { file.name };
            Ok(RemoteDocument { document_id: file.id, title })
        })
    }
}

fn parse_base(raw: &str) -> Result<Url, DocsError> {
    let url = Url::parse(raw.trim()).map_err(|error| DocsError::InvalidEndpoint {
        url: raw.to_string(),
        message: error.to_string(),
    })?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(DocsError::InvalidEndpoint {
            url: raw.to_string(),
            message: "expected an http(s) base URL".to_string(),
        });
    }
    Ok(url)
}

fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    // `parse_base` only admits URLs that can be a base, so this always succeeds.
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

fn batch_update_url(base: &Url, document_id: &str) -> Url {
    let action = format!("{document_id}:batchUpdate");
    endpoint(base, &["documents", action.as_str()])
}

fn status_error(
    document_id: &str,
    status: StatusCode,
    retry_after_secs: Option<u64>,
    body: &str,
) -> DocsError {
    let document_id = document_id.to_string();
    match status {
        StatusCode::NOT_FOUND => DocsError::RemoteNotFound { document_id },
        StatusCode::TOO_MANY_REQUESTS => DocsError::RateLimited { document_id, retry_after_secs },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            DocsError::Auth { document_id, message: error_message(body, status) }
        }
        _ => DocsError::Remote {
            document_id,
            status: status.as_u16(),
            message: error_message(body, status),
        },
    }
}

/// Pulls `error.message` out of a JSON error body, falling back to the raw text.
fn error_message(body: &str, status: StatusCode) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        value.pointer("/error/message").and_then(Value::as_str).map(str::to_string)
    });
    from_json.unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            status.canonical_reason().unwrap_or("request failed").to_string()
        } else {
            trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
        }
    })
}

fn transport_error(document_id: &str, error: &reqwest::Error) -> DocsError {
    let message =
        if error.is_timeout() { format!("request timed out: {error}") } else { error.to_string() };
    DocsError::Transport { document_id: document_id.to_string(), message }
}

fn decode_error(document_id: &str, source: DecodeError) -> DocsError {
    DocsError::Decode { document_id: document_id.to_string(), source }
}
