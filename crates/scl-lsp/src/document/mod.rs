//! Document management module.
//!
//! - `state`: per-document and server-wide state
//! - `lifecycle`: open/change handling and need index reloads

mod lifecycle;
mod state;

pub use lifecycle::{handle_document_change, handle_document_open, reload_needs};
pub use state::{DocumentInfo, ServerState};
