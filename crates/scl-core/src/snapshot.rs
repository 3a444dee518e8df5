//! Versioned `needs.json` snapshot files.

use crate::error::{Result, SnapshotError};
use crate::need::Need;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Snapshot version read when none is configured.
pub const DEFAULT_VERSION: &str = "0.1";

/// Top-level shape of a `needs.json` file.
///
/// ```json
/// {
///   "current_version": "0.1",
///   "project": "example",
///   "versions": {
///     "0.1": { "creator": { "program": "sphinx-needs" }, "needs": { "REQ_001": { } } }
///   }
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NeedsSnapshot {
    #[serde(alias = "current_version")]
    pub current_version: String,
    pub project: String,
    pub versions: HashMap<String, SnapshotVersion>,
}

/// One exported version of the needs.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SnapshotVersion {
    pub creator: Creator,
    pub needs: BTreeMap<String, Need>,
}

/// The program that produced a snapshot version.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Creator {
    pub program: String,
    pub version: String,
}

impl NeedsSnapshot {
    /// Reads and parses the snapshot at `path` in one blocking call.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_slice(&bytes, path)
    }

    /// Parses snapshot bytes; `path` is only used for error reporting.
    pub fn from_slice(bytes: &[u8], path: &Path) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|source| SnapshotError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Extracts a single version, consuming the snapshot.
    pub fn into_version(mut self, version: &str, path: &Path) -> Result<SnapshotVersion> {
        self.versions
            .remove(version)
            .ok_or_else(|| SnapshotError::MissingVersion {
                version: version.to_string(),
                path: path.to_path_buf(),
            })
    }
}
