//! Error taxonomy for the mirror run.
//!
//! Only two things are fatal: authentication failure and anything
//! unanticipated at the top level. Per-node, per-file, and per-page failures
//! are recorded and the run continues; the correlator carries its own
//! [`crate::correlator::DownloadFailure`] type for the per-file case.

use std::path::PathBuf;

use thiserror::Error;

use crate::browser::BrowserError;

/// Errors surfaced by the mirror library.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// The login handshake failed; nothing is mirrored.
    #[error("authentication failed: {reason}")]
    Authentication {
        /// Why the login was rejected.
        reason: String,
    },

    /// The browser session misbehaved.
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    /// A page render could not be captured; the node is skipped.
    #[error("could not capture {filename}: {reason}")]
    PageCapture {
        /// Local filename the page would have been saved under.
        filename: String,
        /// Why the capture was abandoned.
        reason: String,
    },

    /// Filesystem error with path context.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Network-level failure fetching a static asset.
    #[error("network error fetching {url}: {source}")]
    Http {
        /// The URL that failed.
        url: String,
        /// The underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },

    /// HTTP error status fetching a static asset.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that answered with an error.
        url: String,
        /// The status code.
        status: u16,
    },
}

impl MirrorError {
    /// Creates an authentication failure.
    pub fn authentication(reason: impl Into<String>) -> Self {
        Self::Authentication {
            reason: reason.into(),
        }
    }

    /// Creates a page-capture failure.
    pub fn page_capture(filename: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PageCapture {
            filename: filename.into(),
            reason: reason.into(),
        }
    }

    /// Creates an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a network error with URL context.
    pub fn http(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Http {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }
}

// The context-bearing variants (Io, Http) deliberately have no blanket `From`
// impls: callers must say which path or URL failed.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_display_includes_reason() {
        let error = MirrorError::authentication("logged-in marker never appeared");
        assert!(error.to_string().contains("authentication failed"));
        assert!(error.to_string().contains("marker never appeared"));
    }

    #[test]
    fn test_page_capture_display_includes_filename() {
        let error = MirrorError::page_capture("docs_rep_5.html", "session expired");
        let msg = error.to_string();
        assert!(msg.contains("docs_rep_5.html"), "expected filename in: {msg}");
        assert!(msg.contains("session expired"), "expected reason in: {msg}");
    }

    #[test]
    fn test_io_display_includes_path() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = MirrorError::io(PathBuf::from("/tmp/mirror/index.html"), source);
        assert!(error.to_string().contains("/tmp/mirror/index.html"));
    }

    #[test]
    fn test_http_status_display() {
        let error = MirrorError::http_status("https://example.test/css/style.min.css", 404);
        let msg = error.to_string();
        assert!(msg.contains("404"), "expected status in: {msg}");
        assert!(msg.contains("style.min.css"), "expected URL in: {msg}");
    }
}
