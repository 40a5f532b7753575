// Remote service wire formats.

pub mod docs_api;
