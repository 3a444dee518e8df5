//! Hover handler: summary and content of the need under the cursor.

use crate::document::ServerState;
use scl_core::Need;
use tower_lsp_server::ls_types::{Hover, HoverContents, HoverParams, MarkedString};

/// Handles `textDocument/hover`.
///
/// Always answers with a hover: when no need sits under the cursor (or the
/// document is unknown) the text explains that instead.
pub fn handle_hover(state: &ServerState, params: HoverParams) -> Hover {
    let uri = &params.text_document_position_params.text_document.uri;
    let position = params.text_document_position_params.position;

    let text = match state.get_document(uri) {
        Some(doc) => match doc.find_at_position(position) {
            Ok(need) => hover_text(need),
            Err(e) => {
                tracing::debug!(doc = doc.name(), "hover at {:?}: {}", position, e);
                e.to_string()
            }
        },
        None => {
            tracing::warn!("hover for unknown document {:?}", uri);
            crate::LspError::NeedNotFound.to_string()
        }
    };

    Hover {
        contents: HoverContents::Scalar(MarkedString::String(text)),
        range: None,
    }
}

fn hover_text(need: &Need) -> String {
    format!("{}\n\n{}", need.summary(), need.content)
}
