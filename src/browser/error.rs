//! Error types for the browser automation layer.

use thiserror::Error;

/// Errors surfaced by a [`super::Browser`] implementation.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The WebDriver session could not be created.
    #[error("webdriver session could not be created: {message}")]
    Session {
        /// What went wrong while negotiating the session.
        message: String,
    },

    /// Transport-level failure talking to the WebDriver endpoint.
    #[error("webdriver request {endpoint} failed: {source}")]
    Transport {
        /// Endpoint path of the failed request.
        endpoint: String,
        /// The underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },

    /// The WebDriver endpoint answered with a protocol error.
    #[error("webdriver request {endpoint} returned {code}: {message}")]
    Protocol {
        /// Endpoint path of the failed request.
        endpoint: String,
        /// WebDriver error code (`timeout`, `no such element`, ...).
        code: String,
        /// Human-readable message from the driver.
        message: String,
    },

    /// Every lookup strategy failed to match an element.
    #[error("no element matched any of: {tried}")]
    NoSuchElement {
        /// Comma-separated list of the selectors that were tried.
        tried: String,
    },

    /// A response did not carry the shape the protocol promises.
    #[error("malformed webdriver response from {endpoint}: {detail}")]
    MalformedResponse {
        /// Endpoint path of the surprising response.
        endpoint: String,
        /// What was missing or mistyped.
        detail: String,
    },
}

impl BrowserError {
    /// Whether this is the page-load timeout a download trigger expects.
    #[must_use]
    pub fn is_page_load_timeout(&self) -> bool {
        matches!(self, Self::Protocol { code, .. } if code == "timeout")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_load_timeout_matches_timeout_code() {
        let error = BrowserError::Protocol {
            endpoint: "/session/s/url".to_string(),
            code: "timeout".to_string(),
            message: "page load timed out".to_string(),
        };
        assert!(error.is_page_load_timeout());
    }

    #[test]
    fn test_page_load_timeout_rejects_other_codes() {
        let error = BrowserError::Protocol {
            endpoint: "/session/s/element".to_string(),
            code: "no such element".to_string(),
            message: "not found".to_string(),
        };
        assert!(!error.is_page_load_timeout());
    }

    #[test]
    fn test_no_such_element_lists_strategies() {
        let error = BrowserError::NoSuchElement {
            tried: "[name='identifiant'], #identifiant".to_string(),
        };
        assert!(error.to_string().contains("#identifiant"));
    }
}
