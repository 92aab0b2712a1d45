// Error types for the download flow

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum DownloadError {
    /// No stream matches the requested format/resolution
    #[error("Stream not found: {0}")]
    NotFound(String),

    /// Fetch or thumbnail retrieval failed
    #[error("Network error: {0}")]
    Network(String),

    /// Disk write or rename failed
    #[error("I/O error at {}: {message}", path.display())]
    Io {
        path: PathBuf,
        kind: io::ErrorKind,
        message: String,
    },

    /// Malformed or unparseable input (URL, format, resolution)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// yt-dlp not found in system
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Failed to parse yt-dlp JSON output
    #[error("Parse error: {0}")]
    Parse(String),

    /// The video service failed for a reason we could not classify
    #[error("Service error: {0}")]
    Service(String),
}

impl DownloadError {
    pub fn io(path: impl AsRef<Path>, err: &io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// Kind of the underlying I/O failure, if this is an I/O error
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Io { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<reqwest::Error> for DownloadError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}

impl From<serde_json::Error> for DownloadError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

// Classifies raw yt-dlp stderr
impl From<String> for DownloadError {
    fn from(s: String) -> Self {
        let lower = s.to_lowercase();

        if lower.contains("unsupported url")
            || lower.contains("is not a valid url")
            || lower.contains("invalid url")
            || lower.contains("incomplete youtube id")
        {
            return Self::InvalidInput(s);
        }

        if lower.contains("requested format is not available") {
            return Self::NotFound(s);
        }

        if lower.contains("timeout")
            || lower.contains("timed out")
            || lower.contains("connection reset")
            || lower.contains("connection refused")
            || lower.contains("network is unreachable")
            || lower.contains("unable to download")
            || lower.contains("http error")
            || lower.contains("incompleteread")
            || lower.contains("got error")
        {
            return Self::Network(s);
        }

        if lower.contains("no such file or directory") && lower.contains("yt-dlp") {
            return Self::ToolNotFound(s);
        }

        if lower.contains("permission denied") || lower.contains("no space left") {
            return Self::Io {
                path: PathBuf::new(),
                kind: io::ErrorKind::Other,
                message: s,
            };
        }

        Self::Service(s)
    }
}
