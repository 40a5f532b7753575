// Builds the sequencer the commands run against, and the runtime they run on.

use std::future::Future;

use anyhow::{Context, Result};
use tracing::debug;

use docpilot_engine::config::DocpilotConfig;
use docpilot_engine::http::HttpDocumentService;
use docpilot_engine::DocumentSequencer;

pub type Sequencer = DocumentSequencer<HttpDocumentService>;

/// Loads config, resolves the access token from the environment, and wires
/// the HTTP service into a sequencer.
pub fn connect() -> Result<Sequencer> {
    let config = DocpilotConfig::load().context("failed to load ~/.docpilot/config.toml")?;
    let token = config.access_token(|name| std::env::var(name).ok())?;
    let service = HttpDocumentService::new(&config.service, token)
        .context("failed to configure the document service client")?;
    debug!(api_base = %config.service.api_base, "document service configured");
    Ok(DocumentSequencer::new(service, config.pacing()))
}

/// Runs `future` to completion on a fresh current-thread runtime.
///
/// Commands are synchronous entry points; calling this from inside a runtime
/// is a bug.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    Ok(runtime.block_on(future))
}

/// Drives a command future to completion, folding runtime startup errors in.
pub fn run<T>(future: impl Future<Output = Result<T>>) -> Result<T> {
    block_on(future)?
}
