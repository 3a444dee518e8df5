//! LSP protocol handlers.
//!
//! - [`diagnostics`]: unknown or missing need references on marker lines
//! - [`hover`]: summary of the need under the cursor
//! - [`definition`]: jump to the documentation source defining a need
//! - [`completion`]: marker snippets and need IDs
//!
//! Handlers read from [`ServerState`](crate::document::ServerState) and
//! never fail: a miss produces an empty result, not a protocol error.

pub mod completion;
pub mod definition;
pub mod diagnostics;
pub mod hover;
