// docpilot-engine: drives compiled markdown against a remote document service.

pub mod config;
pub mod error;
pub mod http;
pub mod memory;
pub mod sequencer;
pub mod service;
pub mod tables;

pub use error::DocsError;
pub use sequencer::{Anchor, DocumentHandle, DocumentSequencer};
pub use service::{DocumentService, RemoteDocument};
