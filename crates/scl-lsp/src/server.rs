//! Message dispatch and the stdio serve loop.
//!
//! [`Backend`] turns one decoded frame into the messages to write back, and
//! [`serve`] drives it over a reader/writer pair: read a frame, dispatch it,
//! write every reply, repeat until `exit` or end of input.

use crate::codec::{FrameReader, FrameWriter, decode};
use crate::config::ServerConfig;
use crate::document::{ServerState, handle_document_change, handle_document_open, reload_needs};
use crate::error::{LspError, Result};
use crate::file_watcher;
use crate::handlers::{completion, definition, hover};
use crate::protocol::{Message, Notification, Outgoing, Request, Response, methods};
use scl_core::{NeedIndex, SnapshotError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncWrite};
use tower_lsp_server::jsonrpc::{self, Id};
use tower_lsp_server::ls_types::{
    CompletionOptions, Diagnostic, DidChangeTextDocumentParams, DidChangeWatchedFilesParams,
    DidCloseTextDocumentParams, DidOpenTextDocumentParams, HoverProviderCapability,
    InitializeParams, InitializeResult, MessageType, OneOf, PublishDiagnosticsParams,
    ServerCapabilities, ServerInfo, ShowMessageParams, TextDocumentSyncCapability,
    TextDocumentSyncKind, Uri,
};

/// Messages produced by dispatching one incoming message.
#[derive(Debug, Default)]
pub struct Dispatch {
    /// Replies and notifications to write, in order
    pub outgoing: Vec<Outgoing>,
    /// The client sent `exit`
    pub exit: bool,
}

impl Dispatch {
    fn send(outgoing: impl Into<Outgoing>) -> Self {
        Self {
            outgoing: vec![outgoing.into()],
            exit: false,
        }
    }
}

pub struct Backend {
    state: ServerState,
    /// Snapshot load failure at startup, reported once the client is ready
    startup_error: Option<SnapshotError>,
    /// Client supports dynamic registration of file watchers
    watcher_registration: bool,
    shutdown_requested: bool,
    next_request_id: i64,
}

impl Backend {
    /// Creates the backend and loads the need index from `config.needs_path`.
    ///
    /// A snapshot that cannot be loaded leaves the index empty; the failure
    /// is shown to the client after `initialized`.
    pub fn new(config: ServerConfig) -> Self {
        match NeedIndex::load(&config.needs_path, &config.needs_version) {
            Ok(index) => {
                tracing::info!(
                    "loaded {} needs from {}",
                    index.len(),
                    config.needs_path.display()
                );
                Self::with_index(config, index)
            }
            Err(e) => {
                tracing::error!("failed to load needs snapshot: {}", e);
                let mut backend = Self::with_index(config, NeedIndex::empty());
                backend.startup_error = Some(e);
                backend
            }
        }
    }

    /// Creates the backend around an already built index.
    pub fn with_index(config: ServerConfig, index: NeedIndex) -> Self {
        Self {
            state: ServerState::new(config, index),
            startup_error: None,
            watcher_registration: false,
            shutdown_requested: false,
            next_request_id: 0,
        }
    }

    pub fn state(&self) -> &ServerState {
        &self.state
    }

    fn server_capabilities() -> ServerCapabilities {
        ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
            hover_provider: Some(HoverProviderCapability::Simple(true)),
            definition_provider: Some(OneOf::Left(true)),
            completion_provider: Some(CompletionOptions {
                trigger_characters: Some(vec!["-".into(), ":".into()]),
                resolve_provider: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Decodes and dispatches one frame.
    ///
    /// A body that is not valid JSON is logged and dropped. Only framing
    /// and encoding failures are returned as errors.
    pub fn handle_frame(&mut self, frame: &[u8]) -> Result<Dispatch> {
        match decode(frame) {
            Ok(message) => self.handle_message(message),
            Err(LspError::PayloadDecode(e)) => {
                tracing::warn!("dropping undecodable message: {}", e);
                Ok(Dispatch::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Dispatches one decoded message.
    pub fn handle_message(&mut self, message: Message) -> Result<Dispatch> {
        match (&message.id, &message.method) {
            (Some(id), Some(method)) => {
                let response = self.handle_request(id.clone(), method, &message)?;
                Ok(Dispatch::send(response))
            }
            (None, Some(method)) => self.handle_notification(method, &message),
            (Some(id), None) => {
                tracing::debug!("ignoring client response {:?}", id);
                Ok(Dispatch::default())
            }
            (None, None) => {
                tracing::debug!("ignoring message without id or method");
                Ok(Dispatch::default())
            }
        }
    }

    fn handle_request(&mut self, id: Id, method: &str, message: &Message) -> Result<Response> {
        tracing::debug!("request {:?} {}", id, method);
        let state = &self.state;

        match method {
            methods::INITIALIZE => match message.params::<InitializeParams>() {
                Ok(params) => {
                    tracing::info!("initializing scl-lsp server");
                    self.watcher_registration =
                        file_watcher::supports_watcher_registration(&params.capabilities);
                    Response::ok(
                        id,
                        &InitializeResult {
                            capabilities: Self::server_capabilities(),
                            server_info: Some(ServerInfo {
                                name: "scl-lsp".into(),
                                version: Some(env!("CARGO_PKG_VERSION").into()),
                            }),
                            offset_encoding: None,
                        },
                    )
                }
                Err(e) => Ok(invalid_params(id, method, &e)),
            },
            methods::SHUTDOWN => {
                tracing::info!("shutting down scl-lsp server");
                self.shutdown_requested = true;
                Response::ok(id, &())
            }
            methods::HOVER => respond(id, method, message, |params| {
                hover::handle_hover(state, params)
            }),
            methods::DEFINITION => respond(id, method, message, |params| {
                definition::handle_definition(state, params)
            }),
            methods::COMPLETION => respond(id, method, message, |params| {
                completion::handle_completion(state, params)
            }),
            _ => {
                tracing::debug!("unsupported request method {}", method);
                Ok(Response::error(id, jsonrpc::Error::method_not_found()))
            }
        }
    }

    fn handle_notification(&mut self, method: &str, message: &Message) -> Result<Dispatch> {
        tracing::debug!("notification {}", method);

        match method {
            methods::INITIALIZED => self.handle_initialized(),
            methods::DID_OPEN => {
                let Some(params) = notification_params::<DidOpenTextDocumentParams>(method, message)
                else {
                    return Ok(Dispatch::default());
                };
                let uri = params.text_document.uri;
                tracing::info!("document opened: {:?}", uri);
                let diagnostics =
                    handle_document_open(&self.state, uri.clone(), params.text_document.text);
                Ok(Dispatch::send(publish_diagnostics(uri, diagnostics)?))
            }
            methods::DID_CHANGE => {
                let Some(params) =
                    notification_params::<DidChangeTextDocumentParams>(method, message)
                else {
                    return Ok(Dispatch::default());
                };
                let uri = params.text_document.uri;
                let mut dispatch = Dispatch::default();
                for change in params.content_changes {
                    let diagnostics = handle_document_change(&self.state, uri.clone(), change.text);
                    dispatch
                        .outgoing
                        .push(publish_diagnostics(uri.clone(), diagnostics)?.into());
                }
                Ok(dispatch)
            }
            methods::DID_CLOSE => {
                if let Some(params) =
                    notification_params::<DidCloseTextDocumentParams>(method, message)
                {
                    tracing::info!("document closed: {:?}", params.text_document.uri);
                }
                Ok(Dispatch::default())
            }
            methods::DID_CHANGE_WATCHED_FILES => {
                let Some(params) =
                    notification_params::<DidChangeWatchedFilesParams>(method, message)
                else {
                    return Ok(Dispatch::default());
                };
                self.handle_watched_files(params)
            }
            methods::EXIT => {
                if !self.shutdown_requested {
                    tracing::warn!("exit received without shutdown");
                }
                tracing::info!("exiting scl-lsp server");
                Ok(Dispatch {
                    outgoing: vec![],
                    exit: true,
                })
            }
            _ => {
                tracing::debug!("ignoring notification {}", method);
                Ok(Dispatch::default())
            }
        }
    }

    fn handle_initialized(&mut self) -> Result<Dispatch> {
        tracing::info!("scl-lsp server initialized");
        let mut dispatch = Dispatch::default();

        if let Some(e) = self.startup_error.take() {
            dispatch
                .outgoing
                .push(show_message(MessageType::WARNING, format!("scl-lsp: {e}"))?.into());
        }

        if self.watcher_registration {
            let params = file_watcher::needs_registration(&self.state.config.needs_path)?;
            let id = Id::Number(self.next_request_id);
            self.next_request_id += 1;
            tracing::debug!("registering needs snapshot watcher");
            dispatch
                .outgoing
                .push(Request::new(id, methods::REGISTER_CAPABILITY, &params)?.into());
        }

        Ok(dispatch)
    }

    fn handle_watched_files(&mut self, params: DidChangeWatchedFilesParams) -> Result<Dispatch> {
        tracing::debug!("received {} file change events", params.changes.len());
        let needs_path = &self.state.config.needs_path;

        if !params
            .changes
            .iter()
            .any(|event| file_watcher::concerns_needs_file(event, needs_path))
        {
            return Ok(Dispatch::default());
        }

        tracing::info!("needs snapshot changed, reloading");
        match reload_needs(&self.state) {
            Ok(_) => Ok(Dispatch::default()),
            Err(e) => Ok(Dispatch::send(show_message(
                MessageType::ERROR,
                format!("scl-lsp: {e}"),
            )?)),
        }
    }
}

/// Decodes request params and replies with the handler's result, or with an
/// `InvalidParams` error when the params do not fit the method.
fn respond<P, R>(id: Id, method: &str, message: &Message, handler: impl FnOnce(P) -> R) -> Result<Response>
where
    P: DeserializeOwned,
    R: Serialize,
{
    match message.params::<P>() {
        Ok(params) => Response::ok(id, &handler(params)),
        Err(e) => Ok(invalid_params(id, method, &e)),
    }
}

fn invalid_params(id: Id, method: &str, error: &serde_json::Error) -> Response {
    tracing::warn!("invalid params for {}: {}", method, error);
    Response::error(id, jsonrpc::Error::invalid_params(error.to_string()))
}

fn notification_params<P: DeserializeOwned>(method: &str, message: &Message) -> Option<P> {
    message
        .params::<P>()
        .inspect_err(|e| tracing::warn!("dropping {} with invalid params: {}", method, e))
        .ok()
}

fn publish_diagnostics(uri: Uri, diagnostics: Vec<Diagnostic>) -> Result<Notification> {
    Notification::new(
        methods::PUBLISH_DIAGNOSTICS,
        &PublishDiagnosticsParams {
            uri,
            diagnostics,
            version: None,
        },
    )
}

fn show_message(typ: MessageType, message: String) -> Result<Notification> {
    Notification::new(methods::SHOW_MESSAGE, &ShowMessageParams { typ, message })
}

/// Serves one session over `reader`/`writer` until `exit` or end of input.
///
/// Messages are handled strictly in order and every reply is written before
/// the next frame is read.
pub async fn serve<R, W>(backend: &mut Backend, reader: R, writer: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = FrameReader::new(reader);
    let mut writer = FrameWriter::new(writer);

    while let Some(frame) = reader.read_frame().await? {
        let dispatch = backend.handle_frame(&frame)?;
        for outgoing in &dispatch.outgoing {
            writer.send(outgoing).await?;
        }
        if dispatch.exit {
            return Ok(());
        }
    }

    tracing::info!("input closed, stopping");
    Ok(())
}
