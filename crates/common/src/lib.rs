// docpilot-common: markdown compiler and document model shared across the docpilot workspace.

pub mod document;
pub mod format;
pub mod markdown;
pub mod protocol;
pub mod types;
