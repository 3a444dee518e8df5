//! Language server for need/requirement traceability markers.
//!
//! Source files reference needs (requirements, specifications, tests) defined
//! in a Sphinx-Needs `needs.json` snapshot through marker comments such as
//! `# req-Id: REQ_001, REQ_002`. The server checks those references, and
//! offers hover, go-to-definition and completion on them.

pub mod codec;
pub mod config;
pub mod document;
pub mod error;
pub mod file_watcher;
pub mod handlers;
pub mod protocol;
pub mod server;

// Re-export commonly used types
pub use error::{LspError, Result};
pub use server::{Backend, serve};
