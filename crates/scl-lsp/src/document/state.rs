use crate::config::ServerConfig;
use crate::error::{LspError, Result};
use dashmap::DashMap;
use scl_core::{Need, NeedIndex, NeedOccurrence};
use std::sync::{Arc, PoisonError, RwLock};
use tower_lsp_server::ls_types::{Diagnostic, Position, Uri};

/// State for a single open document.
///
/// Occurrences and diagnostics are derived from `content` and always
/// replaced together with it, so a query never sees them out of step.
///
/// # Examples
///
/// ```
/// use scl_core::{Need, NeedIndex};
/// use scl_lsp::document::DocumentInfo;
/// use tower_lsp_server::ls_types::Position;
///
/// let index = NeedIndex::from_needs([Need { id: "REQ_001".into(), ..Need::default() }]);
/// let content = "# req-Id: REQ_001".to_string();
/// let doc = DocumentInfo {
///     doc_name: Some("main.py".into()),
///     occurrences: index.scan(&content),
///     diagnostics: vec![],
///     content,
/// };
///
/// assert_eq!(doc.find_at_position(Position::new(0, 12)).unwrap().id, "REQ_001");
/// assert!(doc.find_at_position(Position::new(0, 2)).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct DocumentInfo {
    /// Full document text as last sent by the client
    pub content: String,
    /// Percent-decoded file name component of the document URI, used to
    /// label log output
    pub doc_name: Option<String>,
    /// Need references found in `content`
    pub occurrences: Vec<NeedOccurrence>,
    /// Marker diagnostics for `content`
    pub diagnostics: Vec<Diagnostic>,
}

impl DocumentInfo {
    /// Document name for log output.
    pub fn name(&self) -> &str {
        self.doc_name.as_deref().unwrap_or("<unnamed>")
    }

    /// Returns the first need with an occurrence covering `position`.
    ///
    /// Spans are half-open: the column just past the end of an ID does not
    /// belong to it.
    pub fn find_at_position(&self, position: Position) -> Result<&Arc<Need>> {
        self.occurrences
            .iter()
            .find(|occurrence| {
                occurrence
                    .spans
                    .iter()
                    .any(|span| span.contains(position.line, position.character))
            })
            .map(|occurrence| &occurrence.need)
            .ok_or(LspError::NeedNotFound)
    }
}

/// Global server state.
///
/// Holds the configuration, every open document and the current need index.
/// The index sits behind a lock as an `Arc` so a reload can swap it whole
/// while earlier readers keep the index they started with.
///
/// # Examples
///
/// ```
/// use scl_core::NeedIndex;
/// use scl_lsp::config::ServerConfig;
/// use scl_lsp::document::ServerState;
///
/// let state = ServerState::new(ServerConfig::default(), NeedIndex::empty());
/// assert_eq!(state.document_count(), 0);
/// assert!(state.index().is_empty());
/// ```
pub struct ServerState {
    pub config: ServerConfig,
    /// Open documents by URI
    pub documents: DashMap<Uri, DocumentInfo>,
    index: RwLock<Arc<NeedIndex>>,
}

impl ServerState {
    pub fn new(config: ServerConfig, index: NeedIndex) -> Self {
        Self {
            config,
            documents: DashMap::new(),
            index: RwLock::new(Arc::new(index)),
        }
    }

    /// The current need index.
    pub fn index(&self) -> Arc<NeedIndex> {
        Arc::clone(&self.index.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replaces the need index. Open documents keep their occurrences until
    /// their next open or change.
    pub fn replace_index(&self, index: NeedIndex) {
        *self.index.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(index);
    }

    /// Retrieves document state by URI.
    ///
    /// The returned reference holds a shard lock of the document map and
    /// should be dropped as soon as possible.
    pub fn get_document(
        &self,
        uri: &Uri,
    ) -> Option<dashmap::mapref::one::Ref<'_, Uri, DocumentInfo>> {
        self.documents.get(uri)
    }

    /// Inserts or replaces document state.
    pub fn update_document(&self, uri: Uri, info: DocumentInfo) {
        self.documents.insert(uri, info);
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("config", &self.config)
            .field("documents", &self.documents.len())
            .field("needs", &self.index().len())
            .finish()
    }
}
