use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading a needs snapshot.
///
/// None of these are fatal to the server: callers log the error, fall back
/// to an empty [`NeedIndex`](crate::NeedIndex) and keep serving.
///
/// # Examples
///
/// ```
/// use scl_core::error::SnapshotError;
///
/// let error = SnapshotError::MissingVersion {
///     version: "0.1".into(),
///     path: "needs.json".into(),
/// };
/// assert_eq!(
///     error.to_string(),
///     "needs snapshot needs.json has no version \"0.1\""
/// );
/// ```
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("failed to read needs snapshot {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse needs snapshot {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("needs snapshot {} has no version \"{version}\"", path.display())]
    MissingVersion { version: String, path: PathBuf },
}

/// Convenience type alias for `Result<T, SnapshotError>`.
pub type Result<T> = std::result::Result<T, SnapshotError>;
