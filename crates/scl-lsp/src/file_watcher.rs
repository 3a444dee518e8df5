//! Needs snapshot watching.
//!
//! The server asks the client to watch the `needs.json` snapshot through
//! dynamic registration of `workspace/didChangeWatchedFiles`, and reloads
//! the need index when a reported change concerns that file.

use crate::error::{LspError, Result};
use crate::protocol::methods;
use std::path::{Path, PathBuf};
use tower_lsp_server::ls_types::{
    ClientCapabilities, DidChangeWatchedFilesRegistrationOptions, FileEvent, FileSystemWatcher,
    GlobPattern, Registration, RegistrationParams, WatchKind,
};

const WATCHER_ID: &str = "scl-lsp-needs-watcher";

/// Returns true if the client can register file watchers at runtime.
pub fn supports_watcher_registration(capabilities: &ClientCapabilities) -> bool {
    capabilities
        .workspace
        .as_ref()
        .and_then(|workspace| workspace.did_change_watched_files.as_ref())
        .and_then(|watched| watched.dynamic_registration)
        .unwrap_or(false)
}

/// Builds the `client/registerCapability` params that watch `needs_path`.
///
/// The glob matches the snapshot's file name anywhere in the workspace;
/// [`concerns_needs_file`] narrows events down to the configured path.
///
/// # Examples
///
/// ```
/// use scl_lsp::file_watcher::needs_registration;
/// use std::path::Path;
///
/// let params = needs_registration(Path::new("build/needs.json")).unwrap();
/// assert_eq!(params.registrations[0].method, "workspace/didChangeWatchedFiles");
/// ```
pub fn needs_registration(needs_path: &Path) -> Result<RegistrationParams> {
    let file_name = needs_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("needs.json");

    let options = DidChangeWatchedFilesRegistrationOptions {
        watchers: vec![FileSystemWatcher {
            glob_pattern: GlobPattern::String(format!("**/{file_name}")),
            kind: Some(WatchKind::Create | WatchKind::Change | WatchKind::Delete),
        }],
    };

    let registration = Registration {
        id: WATCHER_ID.to_string(),
        method: methods::DID_CHANGE_WATCHED_FILES.to_string(),
        register_options: Some(serde_json::to_value(options).map_err(LspError::Encode)?),
    };

    Ok(RegistrationParams {
        registrations: vec![registration],
    })
}

/// Returns true if `event` reports a change of the snapshot at `needs_path`.
pub fn concerns_needs_file(event: &FileEvent, needs_path: &Path) -> bool {
    let Some(changed) = event.uri.to_file_path() else {
        tracing::debug!("ignoring non-file change event {:?}", event.uri);
        return false;
    };
    let changed: &Path = &changed;
    absolute(changed) == absolute(needs_path)
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_lsp_server::ls_types::{
        DidChangeWatchedFilesClientCapabilities, FileChangeType, Uri,
        WorkspaceClientCapabilities,
    };

    fn capabilities(dynamic_registration: Option<bool>) -> ClientCapabilities {
        ClientCapabilities {
            workspace: Some(WorkspaceClientCapabilities {
                did_change_watched_files: Some(DidChangeWatchedFilesClientCapabilities {
                    dynamic_registration,
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_supports_watcher_registration() {
        assert!(supports_watcher_registration(&capabilities(Some(true))));
        assert!(!supports_watcher_registration(&capabilities(Some(false))));
        assert!(!supports_watcher_registration(&capabilities(None)));
        assert!(!supports_watcher_registration(&ClientCapabilities::default()));
    }

    #[test]
    fn test_needs_registration() {
        let params = needs_registration(Path::new("/project/build/needs.json")).unwrap();
        let registration = &params.registrations[0];

        assert_eq!(registration.id, WATCHER_ID);
        let options: DidChangeWatchedFilesRegistrationOptions =
            serde_json::from_value(registration.register_options.clone().unwrap()).unwrap();
        assert_eq!(
            options.watchers[0].glob_pattern,
            GlobPattern::String("**/needs.json".into())
        );
    }

    #[test]
    fn test_concerns_needs_file() {
        let event = |path: &str| FileEvent {
            uri: Uri::from_file_path(path).unwrap(),
            typ: FileChangeType::CHANGED,
        };
        let needs = Path::new("/project/build/needs.json");

        assert!(concerns_needs_file(&event("/project/build/needs.json"), needs));
        assert!(!concerns_needs_file(&event("/project/other/needs.json"), needs));
        assert!(!concerns_needs_file(&event("/project/build/main.py"), needs));
    }

    #[test]
    fn test_concerns_relative_needs_path() {
        let absolute = std::env::current_dir().unwrap().join("needs.json");
        let event = FileEvent {
            uri: Uri::from_file_path(&absolute).unwrap(),
            typ: FileChangeType::CREATED,
        };
        assert!(concerns_needs_file(&event, Path::new("needs.json")));
    }
}
