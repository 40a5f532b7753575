// Argument shapes shared by commands: content sources and document ids.

use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use clap::Args;
use regex::Regex;
use url::Url;

use crate::exit_code::UsageError;

const MIN_ID_LEN: usize = 20;
const MAX_ID_LEN: usize = 128;

/// Markdown supplied inline, from a file, or on stdin.
#[derive(Debug, Args)]
#[group(id = "content_source", multiple = false)]
pub struct ContentArgs {
    /// Markdown content. Read from stdin when neither this nor --file is given.
    pub content: Option<String>,

    /// Read markdown content from a file.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

impl ContentArgs {
    pub fn resolve(&self) -> Result<String> {
        let stdin = io::stdin();
        let is_terminal = stdin.is_terminal();
        resolve_content(self.content.as_deref(), self.file.as_deref(), stdin.lock(), is_terminal)
    }
}

/// Picks the content source. Stdin is only read when it is not a terminal.
pub fn resolve_content(
    inline: Option<&str>,
    file: Option<&Path>,
    mut stdin: impl Read,
    stdin_is_terminal: bool,
) -> Result<String> {
    match (inline, file) {
        (Some(_), Some(_)) => {
            Err(UsageError::new("give content either inline or with --file, not both").into())
        }
        (Some(content), None) => Ok(content.to_string()),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read content file `{}`", path.display())),
        (None, None) if stdin_is_terminal => Err(UsageError::new(
            "no content given: pass it as an argument, with --file, or on stdin",
        )
        .into()),
        (None, None) => {
            let mut content = String::new();
            stdin.read_to_string(&mut content).context("failed to read content from stdin")?;
            Ok(content)
        }
    }
}

fn id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_-]+$").expect("document id pattern should compile")
    })
}

/// Accepts a bare document id or a document URL and returns the id.
///
/// Used as a clap value parser, so a malformed id is a usage error.
pub fn parse_document_id(raw: &str) -> Result<String, String> {
    let raw = raw.trim();
    if let Ok(url) = Url::parse(raw) {
        return id_from_url(&url).ok_or_else(|| {
            format!("`{raw}` is not a document URL (expected .../document/d/<id>/...)")
        });
    }
    if is_document_id(raw) {
        Ok(raw.to_string())
    } else {
        Err(format!(
            "`{raw}` is not a document id ({MIN_ID_LEN}-{MAX_ID_LEN} letters, digits, `-` or `_`)"
        ))
    }
}

fn is_document_id(candidate: &str) -> bool {
    (MIN_ID_LEN..=MAX_ID_LEN).contains(&candidate.len()) && id_pattern().is_match(candidate)
}

fn id_from_url(url: &Url) -> Option<String> {
    let segments: Vec<&str> = url.path_segments()?.collect();
    segments
        .windows(3)
        .find(|window| window[0] == "document" && window[1] == "d")
        .map(|window| window[2])
        .filter(|id| is_document_id(id))
        .map(str::to_string)
}
