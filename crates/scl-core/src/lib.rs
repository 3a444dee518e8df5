//! Core model for scl-lsp.
//!
//! This crate knows nothing about the Language Server Protocol. It loads a
//! versioned `needs.json` snapshot, indexes its need records by ID and finds
//! where those IDs occur in document text.
//!
//! # Architecture
//!
//! scl-core defines:
//! - **Model**: [`Need`] records and the [`NeedsSnapshot`] file shape
//! - **Index**: [`NeedIndex`], an immutable ID lookup table with an
//!   Aho-Corasick matcher used by [`NeedIndex::scan`]
//! - **Text**: [`Span`] and [`LineIndex`] for UTF-16 line/column bookkeeping
//! - **Errors**: [`SnapshotError`] for snapshot loading
//!
//! # Examples
//!
//! ```no_run
//! use scl_core::{NeedIndex, DEFAULT_VERSION};
//! use std::path::Path;
//!
//! let index = NeedIndex::load(Path::new("docs/_build/needs/needs.json"), DEFAULT_VERSION)
//!     .unwrap_or_default();
//!
//! for occurrence in index.scan("# req-Id: REQ_001") {
//!     println!("{} at {:?}", occurrence.need.id, occurrence.spans);
//! }
//! ```

pub mod error;
pub mod index;
pub mod need;
pub mod snapshot;
pub mod text;

pub use error::{Result, SnapshotError};
pub use index::{NeedIndex, NeedOccurrence};
pub use need::{Need, StringList};
pub use snapshot::{Creator, DEFAULT_VERSION, NeedsSnapshot, SnapshotVersion};
pub use text::{LineIndex, Span, byte_offset, utf16_len};
