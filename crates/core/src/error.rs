use std::path::PathBuf;

use thiserror::Error;

/// Failure while decoding one share link or one server-directory entry.
///
/// Always scoped to the smallest possible unit (a single line or a single
/// server object) so callers can log the entry and move on.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URI: {0}")]
    Uri(#[from] url::ParseError),

    #[error("decoded text is not valid UTF-8")]
    Utf8,

    #[error("port is missing or out of range")]
    Port,

    #[error("{0:?} is not a valid boolean")]
    Bool(String),

    #[error("{0}")]
    Malformed(&'static str),
}

/// Outcome of dispatching one line to the decoder registry.
///
/// Unknown prefixes and registered-but-disabled schemes both surface as
/// [`LinkError::UnsupportedScheme`]; callers cannot tell them apart.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("unknown proxy type")]
    UnsupportedScheme,

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Failure producing the merged configuration document.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// No detector accepted the payload. Unreachable while the
    /// line-delimited fallback exists; kept so the taxonomy is complete.
    #[error("payload matches no supported container format")]
    ContainerFormat,

    #[error("failed to serialize merged configuration: {0}")]
    MergeSerialization(#[from] serde_yaml::Error),
}

/// Failure retrieving one subscription's raw payload.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),

    #[error("failed to read {}: {source}", .path.display())]
    File {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("subscription {0:?} has neither url nor path")]
    MissingSource(String),
}

/// Failure handing the merged document to a configuration sink.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("engine rejected configuration: status {0}")]
    Rejected(reqwest::StatusCode),
}
