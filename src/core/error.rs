use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the installer backend.
/// Every module returns `Result<T, InstallerError>`.
#[derive(Debug, Error)]
pub enum InstallerError {
    // ── Input ───────────────────────────────────────────
    #[error("Unknown client or studio year: {0}")]
    InvalidIdentifier(String),

    // ── Remote responses ────────────────────────────────
    #[error("Invalid response from {command}: {reason}")]
    Validation { command: String, reason: String },

    #[error("Command {command} failed: {message}")]
    Command { command: String, message: String },

    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Serialization ───────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(String),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type InstallerResult<T> = Result<T, InstallerError>;

impl InstallerError {
    pub fn validation(command: impl Into<String>, reason: impl Into<String>) -> Self {
        InstallerError::Validation {
            command: command.into(),
            reason: reason.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, InstallerError::Validation { .. })
    }
}

impl From<std::io::Error> for InstallerError {
    fn from(source: std::io::Error) -> Self {
        InstallerError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

// ── Serialization for IPC ───────────────────────────────
// Frontends only ever see the rendered message.
impl serde::Serialize for InstallerError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_display_string() {
        let err = InstallerError::InvalidIdentifier("1999".into());
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"Unknown client or studio year: 1999\"");
    }

    #[test]
    fn validation_helper_builds_variant() {
        let err = InstallerError::validation("get_targets", "expected an array");
        assert!(err.is_validation());
        assert_eq!(
            err.to_string(),
            "Invalid response from get_targets: expected an array"
        );
    }
}
