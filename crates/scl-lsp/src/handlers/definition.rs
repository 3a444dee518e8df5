//! Go-to-definition: jump from a need reference to the documentation source
//! that defines the need.

use crate::config::ServerConfig;
use crate::document::ServerState;
use scl_core::Need;
use std::path::PathBuf;
use tower_lsp_server::ls_types::{GotoDefinitionParams, Location, Position, Range, Uri};

/// Handles `textDocument/definition`.
///
/// Returns zero or one location. Misses of any kind (unknown document, no
/// need under the cursor, need without a source document) yield an empty
/// list rather than an error.
pub fn handle_definition(state: &ServerState, params: GotoDefinitionParams) -> Vec<Location> {
    let uri = &params.text_document_position_params.text_document.uri;
    let position = params.text_document_position_params.position;

    let Some(doc) = state.get_document(uri) else {
        tracing::warn!("definition for unknown document {:?}", uri);
        return vec![];
    };

    let need = match doc.find_at_position(position) {
        Ok(need) => need,
        Err(e) => {
            tracing::debug!(doc = doc.name(), "definition at {:?}: {}", position, e);
            return vec![];
        }
    };

    definition_location(need, &state.config).into_iter().collect()
}

/// Location of the directive that defines `need`.
///
/// The target file is `<docs_path>/<docname>.<extension>` made absolute, at
/// the need's 1-based `lineno` converted to a 0-based line.
pub fn definition_location(need: &Need, config: &ServerConfig) -> Option<Location> {
    if need.docname.is_empty() {
        tracing::debug!("need {} has no source document", need.id);
        return None;
    }

    let path = source_path(need, config);
    let Some(uri) = Uri::from_file_path(&path) else {
        tracing::warn!("cannot convert {} to a file URI", path.display());
        return None;
    };

    let line = need.lineno.unwrap_or(0).saturating_sub(1);
    let start = Position::new(line, 0);
    Some(Location {
        uri,
        range: Range::new(start, start),
    })
}

fn source_path(need: &Need, config: &ServerConfig) -> PathBuf {
    let file = format!("{}.{}", need.docname, config.definition_extension);
    let path = config.docs_path.join(file);
    std::path::absolute(&path).unwrap_or(path)
}
