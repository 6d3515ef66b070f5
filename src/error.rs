//! Error types shared by the Spotify client, the archive engine and the
//! configuration layer.
//!
//! Remote failures surface as [`ApiError`]. The engine never lets one escape a
//! reconciliation: it classifies them into an [`ErrorKind`] recorded on a
//! failed [`ArchiveResult`](crate::types::ArchiveResult).

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures reported by the remote playlist API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 404 from the API.
    #[error("Resource not found (404): {0}")]
    NotFound(String),

    /// 401/403 from the API, or no usable access token.
    #[error("Unauthorized ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    /// Rate limit whose retry delay exceeded the configured ceiling.
    #[error("Rate limited, retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    /// Any other non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Connection, timeout or other transport failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("Invalid response body: {0}")]
    Decode(String),

    /// The request was rejected before it was sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Maps an HTTP status and response message onto the error taxonomy.
    pub fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized {
                status: status.as_u16(),
                message,
            },
            _ => ApiError::Status {
                status: status.as_u16(),
                message,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ApiError::Decode(err.to_string());
        }
        if let Some(status) = err.status() {
            return ApiError::from_status(status, err.to_string());
        }
        ApiError::Transport(err.to_string())
    }
}

/// An append that stopped part way through its batches.
///
/// Batches before `committed_batches` are stored remotely and are not rolled back.
#[derive(Debug, Error)]
#[error("Append failed at batch {} of {total_batches} ({committed_batches} committed): {source}", .committed_batches + 1)]
pub struct WriteError {
    pub committed_batches: usize,
    pub total_batches: usize,
    #[source]
    pub source: ApiError,
}

/// Configuration problems. All of them are fatal before any network call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    MissingVar(&'static str),

    #[error("No playlist configuration found. Set SPOTIFY_PLAYLISTS_CONFIG or SPOTIFY_PLAYLIST_IDS, or pass --config/--playlist")]
    NoPlaylists,

    #[error("Invalid playlist configuration JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Playlist configuration must be a JSON array")]
    NotAnArray,

    #[error("Playlist entry {index} has an empty playlist id")]
    EmptySourceId { index: usize },

    #[error("'{0}' is not a valid Spotify playlist id, URL or URI")]
    InvalidPlaylistRef(String),

    #[error("Playlist {0} is already in the configuration")]
    Duplicate(String),

    #[error("Playlist {0} is not in the configuration")]
    UnknownEntry(String),

    #[error("Cannot access configuration file: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures reading or writing the session history file.
#[derive(Debug, Error)]
pub enum SessionLogError {
    #[error("Cannot access archive log: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive log is not valid JSON, refusing to overwrite it: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Errors that stop a batch run before it starts.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Invalid configuration: {0}")]
    Validation(#[from] ConfigError),

    #[error("Failed to get current user: {0}")]
    Identity(ApiError),
}

impl RunError {
    pub fn is_auth(&self) -> bool {
        matches!(self, RunError::Identity(e) if e.is_auth())
    }
}

/// Classification recorded on a failed archive result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    SourceNotFound,
    PlatformRestriction,
    AuthError,
    ValidationError,
    TransientOrUnknown,
    PartialWriteFailure,
}

impl ErrorKind {
    /// Kinds that invalidate every later call of the run.
    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorKind::AuthError | ErrorKind::ValidationError)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorKind::SourceNotFound => "source not found",
            ErrorKind::PlatformRestriction => "platform restriction",
            ErrorKind::AuthError => "authentication error",
            ErrorKind::ValidationError => "validation error",
            ErrorKind::TransientOrUnknown => "transient or unknown error",
            ErrorKind::PartialWriteFailure => "partial write failure",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(ApiError::from_status(StatusCode::NOT_FOUND, "x".into()).is_not_found());
        assert!(ApiError::from_status(StatusCode::UNAUTHORIZED, "x".into()).is_auth());
        assert!(ApiError::from_status(StatusCode::FORBIDDEN, "x".into()).is_auth());
        assert!(matches!(
            ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "boom".into()),
            ApiError::Status { status: 500, .. }
        ));
    }

    #[test]
    fn write_error_reports_failing_batch() {
        let err = WriteError {
            committed_batches: 2,
            total_batches: 3,
            source: ApiError::Transport("reset".into()),
        };
        assert_eq!(
            err.to_string(),
            "Append failed at batch 3 of 3 (2 committed): Transport error: reset"
        );
    }

    #[test]
    fn error_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&ErrorKind::PlatformRestriction).unwrap();
        assert_eq!(json, "\"platform-restriction\"");
        assert!(ErrorKind::AuthError.is_fatal());
        assert!(!ErrorKind::TransientOrUnknown.is_fatal());
    }
}
