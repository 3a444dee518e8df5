//! JSON-RPC envelopes exchanged with the client.
//!
//! Payload shapes (`HoverParams`, `Diagnostic`, ...) come from
//! [`tower_lsp_server::ls_types`]; this module only covers the envelope
//! around them.

use crate::error::{LspError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_lsp_server::jsonrpc::{self, Id};

const JSONRPC_VERSION: &str = "2.0";

/// LSP method names handled or emitted by the server.
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "initialized";
    pub const SHUTDOWN: &str = "shutdown";
    pub const EXIT: &str = "exit";

    pub const DID_OPEN: &str = "textDocument/didOpen";
    pub const DID_CHANGE: &str = "textDocument/didChange";
    pub const DID_CLOSE: &str = "textDocument/didClose";
    pub const DID_CHANGE_WATCHED_FILES: &str = "workspace/didChangeWatchedFiles";

    pub const HOVER: &str = "textDocument/hover";
    pub const DEFINITION: &str = "textDocument/definition";
    pub const COMPLETION: &str = "textDocument/completion";

    pub const PUBLISH_DIAGNOSTICS: &str = "textDocument/publishDiagnostics";
    pub const SHOW_MESSAGE: &str = "window/showMessage";
    pub const REGISTER_CAPABILITY: &str = "client/registerCapability";
}

/// A decoded incoming message.
///
/// Requests carry both `id` and `method`, notifications only `method`, and
/// responses to server-initiated requests only `id`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: Option<Id>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Value,
}

impl Message {
    pub fn is_request(&self) -> bool {
        self.id.is_some() && self.method.is_some()
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none() && self.method.is_some()
    }

    /// Deserializes `params` into the payload type of the method.
    pub fn params<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.params)
    }
}

/// Reply to a client request.
///
/// Exactly one of `result` and `error` is serialized; a successful reply
/// with no value still carries `"result": null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub jsonrpc: &'static str,
    pub id: Id,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<jsonrpc::Error>,
}

impl Response {
    pub fn ok(id: Id, result: &impl Serialize) -> Result<Self> {
        Ok(Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(serde_json::to_value(result).map_err(LspError::Encode)?),
            error: None,
        })
    }

    pub fn error(id: Id, error: jsonrpc::Error) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// Server-to-client notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: Value,
}

impl Notification {
    pub fn new(method: &'static str, params: &impl Serialize) -> Result<Self> {
        Ok(Self {
            jsonrpc: JSONRPC_VERSION,
            method,
            params: serde_json::to_value(params).map_err(LspError::Encode)?,
        })
    }
}

/// Server-to-client request. Replies are read and ignored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    pub jsonrpc: &'static str,
    pub id: Id,
    pub method: &'static str,
    pub params: Value,
}

impl Request {
    pub fn new(id: Id, method: &'static str, params: &impl Serialize) -> Result<Self> {
        Ok(Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params: serde_json::to_value(params).map_err(LspError::Encode)?,
        })
    }
}

/// Any message the server writes to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outgoing {
    Response(Response),
    Notification(Notification),
    Request(Request),
}

impl Outgoing {
    pub fn method(&self) -> Option<&'static str> {
        match self {
            Self::Response(_) => None,
            Self::Notification(notification) => Some(notification.method),
            Self::Request(request) => Some(request.method),
        }
    }
}

impl From<Response> for Outgoing {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

impl From<Notification> for Outgoing {
    fn from(notification: Notification) -> Self {
        Self::Notification(notification)
    }
}

impl From<Request> for Outgoing {
    fn from(request: Request) -> Self {
        Self::Request(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tower_lsp_server::ls_types::HoverParams;

    #[test]
    fn test_message_kinds() {
        let request: Message =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": 1, "method": "shutdown"}))
                .unwrap();
        assert!(request.is_request());
        assert_eq!(request.params, Value::Null);

        let notification: Message =
            serde_json::from_value(json!({"jsonrpc": "2.0", "method": "exit"})).unwrap();
        assert!(notification.is_notification());

        let response: Message =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": 7, "result": null})).unwrap();
        assert!(!response.is_request());
        assert!(!response.is_notification());
    }

    #[test]
    fn test_message_params() {
        let message: Message = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": "abc",
            "method": "textDocument/hover",
            "params": {
                "textDocument": {"uri": "file:///doc.py"},
                "position": {"line": 3, "character": 4}
            }
        }))
        .unwrap();

        assert_eq!(message.id, Some(Id::String("abc".into())));
        let params: HoverParams = message.params().unwrap();
        assert_eq!(params.text_document_position_params.position.line, 3);
    }

    #[test]
    fn test_message_params_shape_mismatch() {
        let message: Message = serde_json::from_value(json!({
            "id": 2,
            "method": "textDocument/hover",
            "params": {"position": "nowhere"}
        }))
        .unwrap();
        assert!(message.params::<HoverParams>().is_err());
    }

    #[test]
    fn test_null_result_is_serialized() {
        let response = Response::ok(Id::Number(4), &()).unwrap();
        assert_eq!(
            serde_json::to_value(Outgoing::from(response)).unwrap(),
            json!({"jsonrpc": "2.0", "id": 4, "result": null})
        );
    }

    #[test]
    fn test_error_response_omits_result() {
        let response = Response::error(Id::Number(5), jsonrpc::Error::method_not_found());
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("result").is_none());
        assert_eq!(value["error"]["code"], json!(-32601));
    }

    #[test]
    fn test_notification_shape() {
        let notification =
            Notification::new(methods::SHOW_MESSAGE, &json!({"type": 2, "message": "m"})).unwrap();
        let outgoing = Outgoing::from(notification);
        assert_eq!(outgoing.method(), Some(methods::SHOW_MESSAGE));
        assert_eq!(
            serde_json::to_value(&outgoing).unwrap(),
            json!({
                "jsonrpc": "2.0",
                "method": "window/showMessage",
                "params": {"type": 2, "message": "m"}
            })
        );
    }
}
