//! W3C WebDriver client over HTTP.
//!
//! Speaks the WebDriver wire protocol (JSON over HTTP) against a local
//! geckodriver. The session is created with Firefox preferences that save
//! every known document type straight into the watch directory without
//! prompting, which is what makes download correlation possible at all.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{Value, json};
use tokio::time::sleep;
use tracing::{debug, trace};

use super::error::BrowserError;
use super::Browser;

/// W3C element identifier key in find-element responses.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// WebDriver key code for Enter.
const ENTER_KEY: &str = "\u{E007}";

/// Page-load deadline for ordinary navigations.
const PAGE_LOAD_MS: u64 = 30_000;

/// Short page-load deadline when triggering a download; the navigation is
/// expected to time out.
const TRIGGER_PAGE_LOAD_MS: u64 = 5_000;

/// Poll interval while waiting for an element to appear.
const WAIT_POLL_MS: u64 = 250;

/// Document types the browser saves without asking.
const AUTOSAVE_MIME_TYPES: &str = "application/pdf,\
application/vnd.ms-excel,\
application/vnd.openxmlformats-officedocument.spreadsheetml.sheet,\
application/msword,\
application/vnd.openxmlformats-officedocument.wordprocessingml.document,\
application/zip,\
application/x-zip-compressed,\
application/octet-stream,\
text/plain,\
text/csv,\
application/vnd.ms-powerpoint,\
application/vnd.openxmlformats-officedocument.presentationml.presentation,\
image/jpeg,\
image/png,\
image/gif";

/// WebDriver-backed [`Browser`] implementation.
///
/// Create once with [`WebDriverBrowser::connect`] and reuse for the whole
/// run; the portal only tolerates one authenticated session.
#[derive(Debug)]
pub struct WebDriverBrowser {
    http: Client,
    endpoint: String,
    session: String,
}

impl WebDriverBrowser {
    /// Connects to a running WebDriver endpoint and opens a Firefox session
    /// configured to auto-save downloads into `download_dir`.
    pub async fn connect(
        endpoint: &str,
        download_dir: &Path,
        headless: bool,
    ) -> Result<Self, BrowserError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|source| BrowserError::Session {
                message: format!("HTTP client build failed: {source}"),
            })?;

        let mut args: Vec<&str> = Vec::new();
        if headless {
            args.push("-headless");
        }
        let payload = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "firefox",
                    "moz:firefoxOptions": {
                        "args": args,
                        "prefs": {
                            "browser.download.folderList": 2,
                            "browser.download.dir": download_dir.to_string_lossy(),
                            "browser.download.useDownloadDir": true,
                            "browser.download.manager.showWhenStarting": false,
                            "browser.download.manager.closeWhenDone": true,
                            "browser.download.manager.focusWhenStarting": false,
                            "browser.download.manager.useWindow": false,
                            "browser.download.manager.showAlertOnComplete": false,
                            "browser.helperApps.neverAsk.saveToDisk": AUTOSAVE_MIME_TYPES,
                            "browser.helperApps.alwaysAsk.force": false,
                            "browser.download.panel.shown": false,
                            "pdfjs.disabled": true
                        }
                    }
                }
            }
        });

        let mut browser = Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            session: String::new(),
        };
        let value = browser.execute(Method::POST, "/session", Some(payload)).await?;
        browser.session = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::MalformedResponse {
                endpoint: "/session".to_string(),
                detail: "missing sessionId".to_string(),
            })?
            .to_string();
        debug!(session = %browser.session, "webdriver session created");

        browser.set_page_load_timeout(PAGE_LOAD_MS).await?;
        Ok(browser)
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, BrowserError> {
        let url = format!("{}{}", self.endpoint, path);
        trace!(%method, path, "webdriver request");

        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.map_err(|source| BrowserError::Transport {
            endpoint: path.to_string(),
            source,
        })?;
        let status = response.status();
        let payload: Value = response.json().await.map_err(|source| BrowserError::Transport {
            endpoint: path.to_string(),
            source,
        })?;
        let value = payload.get("value").cloned().unwrap_or(Value::Null);

        if status.is_success() {
            Ok(value)
        } else {
            Err(BrowserError::Protocol {
                endpoint: path.to_string(),
                code: value
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
                message: value
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string(),
            })
        }
    }

    async fn session_cmd(
        &self,
        method: Method,
        suffix: &str,
        body: Option<Value>,
    ) -> Result<Value, BrowserError> {
        let path = format!("/session/{}{suffix}", self.session);
        self.execute(method, &path, body).await
    }

    async fn set_page_load_timeout(&self, ms: u64) -> Result<(), BrowserError> {
        self.session_cmd(Method::POST, "/timeouts", Some(json!({ "pageLoad": ms })))
            .await
            .map(|_| ())
    }

    async fn find_element(&self, selector: &str) -> Result<String, BrowserError> {
        let value = self
            .session_cmd(
                Method::POST,
                "/element",
                Some(json!({ "using": "css selector", "value": selector })),
            )
            .await?;
        value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| BrowserError::MalformedResponse {
                endpoint: "/element".to_string(),
                detail: format!("missing element reference for {selector}"),
            })
    }

    /// Ordered lookup: first selector that matches wins; protocol-level
    /// misses fall through to the next strategy.
    async fn find_first(&self, selectors: &[&str]) -> Result<String, BrowserError> {
        for selector in selectors {
            match self.find_element(selector).await {
                Ok(element) => {
                    trace!(selector, "lookup strategy matched");
                    return Ok(element);
                }
                Err(BrowserError::Protocol { .. } | BrowserError::MalformedResponse { .. }) => {}
                Err(other) => return Err(other),
            }
        }
        Err(BrowserError::NoSuchElement {
            tried: selectors.join(", "),
        })
    }

    async fn any_present(&self, selectors: &[&str]) -> Result<bool, BrowserError> {
        for selector in selectors {
            let value = self
                .session_cmd(
                    Method::POST,
                    "/elements",
                    Some(json!({ "using": "css selector", "value": selector })),
                )
                .await?;
            if value.as_array().is_some_and(|found| !found.is_empty()) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.session_cmd(Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    async fn page_source(&self) -> Result<String, BrowserError> {
        let value = self.session_cmd(Method::GET, "/source", None).await?;
        value
            .as_str()
            .map(ToString::to_string)
            .ok_or_else(|| BrowserError::MalformedResponse {
                endpoint: "/source".to_string(),
                detail: "page source is not a string".to_string(),
            })
    }

    async fn wait_for_any(
        &self,
        selectors: &[&str],
        timeout: Duration,
    ) -> Result<bool, BrowserError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.any_present(selectors).await? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(Duration::from_millis(WAIT_POLL_MS)).await;
        }
    }

    async fn click_first(&self, selectors: &[&str]) -> Result<(), BrowserError> {
        let element = self.find_first(selectors).await?;
        self.session_cmd(Method::POST, &format!("/element/{element}/click"), Some(json!({})))
            .await
            .map(|_| ())
    }

    async fn fill_first(&self, selectors: &[&str], value: &str) -> Result<(), BrowserError> {
        let element = self.find_first(selectors).await?;
        self.session_cmd(Method::POST, &format!("/element/{element}/clear"), Some(json!({})))
            .await?;
        self.session_cmd(
            Method::POST,
            &format!("/element/{element}/value"),
            Some(json!({ "text": value })),
        )
        .await
        .map(|_| ())
    }

    async fn press_enter_first(&self, selectors: &[&str]) -> Result<(), BrowserError> {
        let element = self.find_first(selectors).await?;
        self.session_cmd(
            Method::POST,
            &format!("/element/{element}/value"),
            Some(json!({ "text": ENTER_KEY })),
        )
        .await
        .map(|_| ())
    }

    async fn trigger_download(&self, url: &str) -> Result<(), BrowserError> {
        self.set_page_load_timeout(TRIGGER_PAGE_LOAD_MS).await?;
        let outcome = self
            .session_cmd(Method::POST, "/url", Some(json!({ "url": url })))
            .await;
        let restored = self.set_page_load_timeout(PAGE_LOAD_MS).await;

        match outcome {
            Ok(_) => {}
            // a download endpoint never completes as a page load
            Err(error) if error.is_page_load_timeout() => {
                debug!(url, "download trigger timed out as expected");
            }
            Err(other) => return Err(other),
        }
        restored
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.session_cmd(Method::DELETE, "", None).await.map(|_| ())
    }
}
