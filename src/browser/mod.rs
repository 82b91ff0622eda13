//! Browser automation seam.
//!
//! The engine never talks to a browser directly; it goes through the
//! [`Browser`] trait so traversal, authentication, and download correlation
//! can run against a scripted fake in tests. The production implementation
//! is [`WebDriverBrowser`], a thin W3C WebDriver client.

mod error;
mod webdriver;

use std::time::Duration;

use async_trait::async_trait;

pub use error::BrowserError;
pub use webdriver::WebDriverBrowser;

/// Driving interface over one authenticated browser session.
///
/// All element addressing is by CSS selector. Methods taking a selector list
/// are ordered lookup strategies: each selector is tried in turn, the first
/// match wins, and only when every strategy fails does the call return an
/// error naming everything it tried.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Navigates to a URL and waits for the page load to complete.
    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    /// Current rendered page content.
    async fn page_source(&self) -> Result<String, BrowserError>;

    /// Polls until any of the selectors matches an element.
    ///
    /// Returns `Ok(false)` when the timeout elapses with no match; callers
    /// decide whether that is fatal.
    async fn wait_for_any(
        &self,
        selectors: &[&str],
        timeout: Duration,
    ) -> Result<bool, BrowserError>;

    /// Clicks the first element matched by the lookup strategies.
    async fn click_first(&self, selectors: &[&str]) -> Result<(), BrowserError>;

    /// Clears and types into the first element matched by the strategies.
    async fn fill_first(&self, selectors: &[&str], value: &str) -> Result<(), BrowserError>;

    /// Sends the Enter key to the first element matched by the strategies.
    async fn press_enter_first(&self, selectors: &[&str]) -> Result<(), BrowserError>;

    /// Navigates to a download-only endpoint.
    ///
    /// Such a navigation never completes as a page load; the expected
    /// page-load timeout is swallowed, anything else is reported.
    async fn trigger_download(&self, url: &str) -> Result<(), BrowserError>;

    /// Ends the browser session.
    async fn close(&self) -> Result<(), BrowserError>;
}
