//! Common test utilities for integration tests.
//!
//! Provides a needs snapshot fixture and the `LspClient` that talks to the
//! `scl-lsp` binary over its stdio.

use serde_json::{Value, json};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use tempfile::TempDir;

/// A workspace directory holding `needs.json` and a `docs/` root.
pub(crate) struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    /// Writes a snapshot with `REQ_001`, `REQ_002` and `TOOL_001`.
    pub(crate) fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let snapshot = json!({
            "created": "2024-01-01T00:00:00",
            "current_version": "0.1",
            "project": "demo",
            "versions": {
                "0.1": {
                    "needs": {
                        "REQ_001": {
                            "id": "REQ_001",
                            "type": "req",
                            "status": "open",
                            "implemented": "NO",
                            "content": "The server shall publish diagnostics.",
                            "docname": "requirements/server",
                            "lineno": 12
                        },
                        "REQ_002": {
                            "id": "REQ_002",
                            "type": "req",
                            "status": "done",
                            "implemented": "YES",
                            "content": "The server shall offer completion.",
                            "docname": "requirements/server",
                            "lineno": 20
                        },
                        "TOOL_001": {
                            "id": "TOOL_001",
                            "type": "tool",
                            "docname": "tools",
                            "lineno": 3
                        }
                    }
                }
            }
        });
        std::fs::write(
            dir.path().join("needs.json"),
            serde_json::to_vec_pretty(&snapshot).unwrap(),
        )
        .expect("Failed to write needs.json");
        std::fs::create_dir(dir.path().join("docs")).expect("Failed to create docs dir");

        Self { dir }
    }

    pub(crate) fn path(&self) -> &Path {
        self.dir.path()
    }

    /// File URI for `name` inside the fixture directory.
    pub(crate) fn uri(&self, name: &str) -> String {
        format!("file://{}/{name}", self.path().display())
    }
}

/// LSP test client for communicating with the server binary.
pub(crate) struct LspClient {
    process: Child,
    reader: BufReader<ChildStdout>,
    /// Notifications received while waiting for responses, in order.
    notifications: Vec<Value>,
}

impl LspClient {
    /// Spawn the scl-lsp binary against `fixture`.
    pub(crate) fn spawn(fixture: &Fixture) -> Self {
        Self::spawn_with_args(&[
            "--needs-path",
            &fixture.path().join("needs.json").display().to_string(),
            "--docs-path",
            &fixture.path().join("docs").display().to_string(),
        ])
    }

    /// Spawn the scl-lsp binary with explicit arguments.
    pub(crate) fn spawn_with_args(args: &[&str]) -> Self {
        let mut process = Command::new(env!("CARGO_BIN_EXE_scl-lsp"))
            .args(args)
            .env_remove("RUST_LOG")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to spawn scl-lsp binary");

        let stdout = process.stdout.take().expect("Failed to capture stdout");

        Self {
            process,
            reader: BufReader::new(stdout),
            notifications: Vec::new(),
        }
    }

    /// Send a JSON-RPC message to the server.
    pub(crate) fn send(&mut self, message: &Value) {
        let body = serde_json::to_string(message).unwrap();
        self.send_raw(format!("Content-Length: {}\r\n\r\n{body}", body.len()).as_bytes());
    }

    /// Write raw bytes to the server's stdin.
    pub(crate) fn send_raw(&mut self, bytes: &[u8]) {
        let stdin = self.process.stdin.as_mut().expect("stdin not captured");
        stdin.write_all(bytes).unwrap();
        stdin.flush().unwrap();
    }

    /// Read the next message of any kind.
    pub(crate) fn read_message(&mut self) -> Value {
        let mut content_length = 0;
        loop {
            let mut line = String::new();
            let bytes_read = self
                .reader
                .read_line(&mut line)
                .expect("Failed to read header");
            assert!(bytes_read != 0, "Server closed connection unexpectedly");

            if line == "\r\n" {
                break;
            }
            if let Some((name, value)) = line.split_once(':')
                && name.eq_ignore_ascii_case("content-length")
            {
                content_length = value.trim().parse().expect("Invalid content length");
            }
        }

        let mut body = vec![0u8; content_length];
        self.reader
            .read_exact(&mut body)
            .expect("Failed to read body");
        serde_json::from_slice(&body).unwrap_or_else(|e| {
            panic!("Invalid JSON: {e} in: {:?}", String::from_utf8_lossy(&body))
        })
    }

    /// Read until the response with `id`, capturing notifications on the way.
    pub(crate) fn read_response(&mut self, id: &Value) -> Value {
        loop {
            let message = self.read_message();
            if message.get("method").is_some() {
                self.notifications.push(message);
                continue;
            }
            if message.get("id") == Some(id) {
                return message;
            }
        }
    }

    /// Next notification with `method`, reading from the server if needed.
    pub(crate) fn wait_notification(&mut self, method: &str) -> Value {
        if let Some(index) = self.notifications.iter().position(|n| n["method"] == method) {
            return self.notifications.remove(index);
        }
        loop {
            let message = self.read_message();
            if message["method"] == method {
                return message;
            }
            self.notifications.push(message);
        }
    }

    /// Captured notifications with `method`.
    #[allow(dead_code)] // Not used in all tests
    pub(crate) fn notifications(&self, method: &str) -> Vec<&Value> {
        self.notifications
            .iter()
            .filter(|n| n["method"] == method)
            .collect()
    }

    /// Send a request and wait for its response.
    pub(crate) fn request(&mut self, id: i64, method: &str, params: Value) -> Value {
        self.send(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        }));
        self.read_response(&json!(id))
    }

    /// Initialize the LSP session.
    pub(crate) fn initialize(&mut self) -> Value {
        let response = self.request(
            1,
            "initialize",
            json!({
                "processId": null,
                "rootUri": null,
                "capabilities": {
                    "textDocument": {
                        "completion": {"completionItem": {"snippetSupport": true}},
                        "publishDiagnostics": {}
                    }
                }
            }),
        );

        self.send(&json!({
            "jsonrpc": "2.0",
            "method": "initialized",
            "params": {}
        }));

        response
    }

    /// Open a text document.
    pub(crate) fn did_open(&mut self, uri: &str, text: &str) {
        self.send(&json!({
            "jsonrpc": "2.0",
            "method": "textDocument/didOpen",
            "params": {
                "textDocument": {
                    "uri": uri,
                    "languageId": "python",
                    "version": 1,
                    "text": text
                }
            }
        }));
    }

    /// Send a position request (hover, definition, completion).
    pub(crate) fn at_position(
        &mut self,
        id: i64,
        method: &str,
        uri: &str,
        line: u32,
        character: u32,
    ) -> Value {
        self.request(
            id,
            method,
            json!({
                "textDocument": {"uri": uri},
                "position": {"line": line, "character": character}
            }),
        )
    }

    /// Shutdown the server.
    pub(crate) fn shutdown(&mut self) -> Value {
        self.request(999, "shutdown", Value::Null)
    }

    /// Send `exit` and wait for the process to end.
    pub(crate) fn exit(&mut self) -> ExitStatus {
        self.send(&json!({"jsonrpc": "2.0", "method": "exit"}));
        self.wait()
    }

    /// Wait for the process to end.
    pub(crate) fn wait(&mut self) -> ExitStatus {
        drop(self.process.stdin.take());
        self.process.wait().expect("Failed to wait for scl-lsp")
    }
}

impl Drop for LspClient {
    fn drop(&mut self) {
        let _ = self.process.kill();
    }
}
