//! Document open/change handling and need index reloads.
//!
//! Every open or change rescans the whole text against the current need
//! index and replaces the stored document in one insert.

use super::state::{DocumentInfo, ServerState};
use crate::handlers::diagnostics;
use scl_core::{NeedIndex, SnapshotError};
use tower_lsp_server::ls_types::{Diagnostic, Uri};

/// Handles `textDocument/didOpen`.
///
/// Returns the diagnostics to publish for the document (possibly empty).
pub fn handle_document_open(state: &ServerState, uri: Uri, content: String) -> Vec<Diagnostic> {
    if !state.documents.contains_key(&uri) {
        tracing::debug!("creating document state for {:?}", uri);
    }
    store_document(state, uri, content)
}

/// Handles one full-text `textDocument/didChange` event.
///
/// A change for a document that was never opened is treated like an open.
pub fn handle_document_change(state: &ServerState, uri: Uri, content: String) -> Vec<Diagnostic> {
    if !state.documents.contains_key(&uri) {
        tracing::warn!("change for unopened document {:?}, creating state", uri);
    }
    store_document(state, uri, content)
}

/// Reloads the need index from the configured snapshot.
///
/// On failure the index is replaced by an empty one, so stale needs are not
/// served after the snapshot became unreadable. Open documents pick up the
/// new index on their next open or change.
pub fn reload_needs(state: &ServerState) -> Result<usize, SnapshotError> {
    let config = &state.config;
    match NeedIndex::load(&config.needs_path, &config.needs_version) {
        Ok(index) => {
            let count = index.len();
            state.replace_index(index);
            tracing::info!(
                "loaded {} needs from {}",
                count,
                config.needs_path.display()
            );
            Ok(count)
        }
        Err(e) => {
            tracing::error!("failed to load needs snapshot: {}", e);
            state.replace_index(NeedIndex::empty());
            Err(e)
        }
    }
}

fn store_document(state: &ServerState, uri: Uri, content: String) -> Vec<Diagnostic> {
    let index = state.index();
    let occurrences = index.scan(&content);
    let diagnostics = diagnostics::scan(&content, &index, &state.config.markers);
    let doc_name = document_name(&uri);

    tracing::debug!(
        doc = doc_name.as_deref().unwrap_or("<unnamed>"),
        "{} referenced needs, {} diagnostics",
        occurrences.len(),
        diagnostics.len()
    );

    state.update_document(
        uri,
        DocumentInfo {
            content,
            doc_name,
            occurrences,
            diagnostics: diagnostics.clone(),
        },
    );
    diagnostics
}

/// Extracts the percent-decoded file name component of a document URI.
fn document_name(uri: &Uri) -> Option<String> {
    let path = uri.path();
    let name = path.as_str().split('/').next_back().unwrap_or_default();
    if name.is_empty() {
        tracing::debug!("no document name in {:?}", uri);
        return None;
    }
    match urlencoding::decode(name) {
        Ok(decoded) => Some(decoded.into_owned()),
        Err(e) => {
            tracing::debug!("keeping encoded document name {}: {}", name, e);
            Some(name.to_string())
        }
    }
}
