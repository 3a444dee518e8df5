//! Completion handler.
//!
//! Two kinds of items are offered:
//! - marker snippets, when the word under the cursor starts with the marker
//!   stem (`req-` by default);
//! - need IDs, when the line before the cursor contains a marker keyword
//!   followed by a space (`req-Id: REQ_0` completes to `REQ_001`, ...).

use crate::config::ServerConfig;
use crate::document::ServerState;
use scl_core::{Need, NeedIndex, byte_offset};
use tower_lsp_server::ls_types::{
    CompletionItem, CompletionItemKind, CompletionParams, Documentation, InsertTextFormat,
    Position,
};

/// Handles `textDocument/completion`.
pub fn handle_completion(state: &ServerState, params: CompletionParams) -> Vec<CompletionItem> {
    let uri = &params.text_document_position.text_document.uri;
    let position = params.text_document_position.position;

    let Some(doc) = state.get_document(uri) else {
        tracing::warn!("completion for unknown document {:?}", uri);
        return vec![];
    };

    let items = complete(&doc.content, position, &state.index(), &state.config);
    tracing::debug!(doc = doc.name(), "{} completion items at {:?}", items.len(), position);
    items
}

/// Computes completion items for `position` in `content`.
pub fn complete(
    content: &str,
    position: Position,
    index: &NeedIndex,
    config: &ServerConfig,
) -> Vec<CompletionItem> {
    let Some(line) = line_at(content, position.line as usize) else {
        tracing::debug!("completion line {} past end of document", position.line);
        return vec![];
    };
    let prefix = &line[..byte_offset(line, position.character)];
    let token = prefix.rsplit([' ', '\t']).next().unwrap_or_default();

    let mut items = Vec::new();

    if !config.marker_stem.is_empty() && token.starts_with(config.marker_stem.as_str()) {
        items.extend(config.marker_keywords().map(marker_snippet));
    }

    if let Some(filter) = reference_filter(prefix, config) {
        let filter = filter.to_lowercase();
        items.extend(
            index
                .iter()
                .filter(|need| filter.is_empty() || need.id.to_lowercase().starts_with(&filter))
                .map(|need| need_item(need)),
        );
    }

    items
}

/// Line `line` of `content` split on `\n`, without a trailing `\r`.
///
/// One line past the last is treated as empty; anything further is `None`.
fn line_at(content: &str, line: usize) -> Option<&str> {
    let mut lines = content.split('\n');
    match lines.nth(line) {
        Some(text) => Some(text.strip_suffix('\r').unwrap_or(text)),
        None if line == content.split('\n').count() => Some(""),
        None => None,
    }
}

/// Text typed after the first marker keyword found in `prefix`.
///
/// Only the last comma-separated entry counts, with leading blanks removed,
/// so `req-Id: REQ_001, TO` filters by `TO`.
fn reference_filter<'a>(prefix: &'a str, config: &ServerConfig) -> Option<&'a str> {
    config.marker_keywords().find_map(|keyword| {
        let needle = format!("{keyword} ");
        let start = prefix.find(&needle)? + needle.len();
        let references = &prefix[start..];
        // Narrower than filtering by the whole remainder: entries before the
        // last comma are finished references and must not hide candidates.
        let last = references.rsplit(',').next().unwrap_or_default();
        Some(last.trim_start_matches([' ', '\t']))
    })
}

fn marker_snippet(keyword: &str) -> CompletionItem {
    let documentation = match keyword {
        "req-Id:" => "Use this to link to a specific requirement.",
        "req-traceability:" => "Use this to track the origin or relationships of a component.",
        _ => "Use this to reference one or more needs.",
    };

    CompletionItem {
        label: keyword.to_string(),
        kind: Some(CompletionItemKind::SNIPPET),
        detail: Some(format!("Insert a {keyword} need reference")),
        documentation: Some(Documentation::String(documentation.to_string())),
        insert_text: Some(format!("{keyword} ${{1:NEED_ID}}")),
        insert_text_format: Some(InsertTextFormat::SNIPPET),
        ..Default::default()
    }
}

fn need_item(need: &Need) -> CompletionItem {
    CompletionItem {
        label: need.id.clone(),
        kind: Some(CompletionItemKind::REFERENCE),
        detail: Some(need.summary()),
        documentation: (!need.content.is_empty())
            .then(|| Documentation::String(need.content.clone())),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::handle_document_open;
    use tower_lsp_server::ls_types::{
        TextDocumentIdentifier, TextDocumentPositionParams, Uri,
    };

    fn index() -> NeedIndex {
        NeedIndex::from_needs(["TOOL_001", "REQ_002", "REQ_001"].map(|id| Need {
            id: id.into(),
            need_type: "req".into(),
            status: "valid".into(),
            implemented: "NO".into(),
            content: format!("content of {id}"),
            ..Need::default()
        }))
    }

    fn labels(items: &[CompletionItem]) -> Vec<&str> {
        items.iter().map(|item| item.label.as_str()).collect()
    }

    fn complete_at(content: &str, line: u32, character: u32) -> Vec<CompletionItem> {
        complete(
            content,
            Position::new(line, character),
            &index(),
            &ServerConfig::default(),
        )
    }

    #[test]
    fn test_ids_filtered_by_prefix() {
        let items = complete_at("# req-Id: REQ", 0, 13);
        assert_eq!(labels(&items), ["REQ_001", "REQ_002"]);
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let items = complete_at("# req-Id: tool", 0, 14);
        assert_eq!(labels(&items), ["TOOL_001"]);
    }

    #[test]
    fn test_empty_filter_lists_all_needs() {
        let items = complete_at("# req-traceability: ", 0, 20);
        assert_eq!(labels(&items), ["REQ_001", "REQ_002", "TOOL_001"]);
    }

    #[test]
    fn test_filter_uses_last_reference() {
        let items = complete_at("# req-Id: REQ_001, TO", 0, 21);
        assert_eq!(labels(&items), ["TOOL_001"]);

        let items = complete_at("# req-Id: REQ_001,", 0, 18);
        assert_eq!(labels(&items), ["REQ_001", "REQ_002", "TOOL_001"]);

        // The finished first entry does not narrow the second one.
        let items = complete_at("# req-Id: REQ_001, REQ", 0, 22);
        assert_eq!(labels(&items), ["REQ_001", "REQ_002"]);
    }

    #[test]
    fn test_keyword_without_space_offers_only_snippets() {
        let items = complete_at("# req-Id:", 0, 9);
        assert_eq!(labels(&items), ["req-Id:", "req-traceability:"]);
    }

    #[test]
    fn test_only_text_before_cursor_counts() {
        // Cursor sits before "req-Id: ", so no reference filter applies.
        assert!(complete_at("# req-Id: REQ", 0, 2).is_empty());
    }

    #[test]
    fn test_marker_snippets() {
        let items = complete_at("    # req-", 0, 10);

        assert_eq!(labels(&items), ["req-Id:", "req-traceability:"]);
        assert_eq!(items[0].insert_text.as_deref(), Some("req-Id: ${1:NEED_ID}"));
        assert_eq!(
            items[1].insert_text.as_deref(),
            Some("req-traceability: ${1:NEED_ID}")
        );
        assert_eq!(items[0].insert_text_format, Some(InsertTextFormat::SNIPPET));
        assert_eq!(
            items[0].documentation,
            Some(Documentation::String(
                "Use this to link to a specific requirement.".into()
            ))
        );
        assert_eq!(
            items[1].documentation,
            Some(Documentation::String(
                "Use this to track the origin or relationships of a component.".into()
            ))
        );
    }

    #[test]
    fn test_need_item_fields() {
        let items = complete_at("# req-Id: REQ_001", 0, 17);

        assert_eq!(labels(&items), ["REQ_001"]);
        assert_eq!(
            items[0].detail.as_deref(),
            Some("Type: req\nStatus: valid\nImplemented: NO")
        );
        assert_eq!(
            items[0].documentation,
            Some(Documentation::String("content of REQ_001".into()))
        );
    }

    #[test]
    fn test_cursor_past_line_end_uses_whole_line() {
        let items = complete_at("# req-Id: TOOL", 0, 80);
        assert_eq!(labels(&items), ["TOOL_001"]);
    }

    #[test]
    fn test_line_after_last_is_empty() {
        // "a\n" splits into ["a", ""]; line 2 is one past the last line.
        assert!(complete_at("a\n", 2, 0).is_empty());
        assert_eq!(line_at("a\n", 2), Some(""));
        assert_eq!(line_at("a\n", 3), None);
        assert!(complete_at("a\n", 7, 0).is_empty());
    }

    #[test]
    fn test_crlf_line() {
        let items = complete_at("x\r\n# req-Id: REQ_00\r\n", 1, 80);
        assert_eq!(labels(&items), ["REQ_001", "REQ_002"]);
    }

    #[test]
    fn test_custom_marker_stem() {
        let config = ServerConfig {
            markers: vec!["// trace-Id:".into()],
            marker_stem: "trace-".into(),
            ..ServerConfig::default()
        };
        let items = complete("// trace-", Position::new(0, 9), &index(), &config);
        assert_eq!(labels(&items), ["trace-Id:"]);
        assert_eq!(
            items[0].documentation,
            Some(Documentation::String(
                "Use this to reference one or more needs.".into()
            ))
        );
    }

    #[test]
    fn test_handle_completion() {
        let state = ServerState::new(ServerConfig::default(), index());
        let uri = Uri::from_file_path("/project/main.py").unwrap();
        handle_document_open(&state, uri.clone(), "# req-Id: REQ".into());

        let params = CompletionParams {
            text_document_position: TextDocumentPositionParams {
                text_document: TextDocumentIdentifier { uri },
                position: Position::new(0, 13),
            },
            work_done_progress_params: Default::default(),
            partial_result_params: Default::default(),
            context: None,
        };
        assert_eq!(labels(&handle_completion(&state, params)), ["REQ_001", "REQ_002"]);
    }
}
