//! Scripted browser for end-to-end tests: serves canned page content and
//! drops configured files into the watch directory when a download is
//! triggered, mimicking the real browser's side-effect-only downloads.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use portal_mirror_core::{Browser, BrowserError};

pub struct FakeBrowser {
    watch_dir: PathBuf,
    pages: HashMap<String, String>,
    downloads: HashMap<String, (String, Vec<u8>)>,
    current: Mutex<String>,
    pub trigger_log: Mutex<Vec<String>>,
}

impl FakeBrowser {
    pub fn new(watch_dir: &Path) -> Self {
        Self {
            watch_dir: watch_dir.to_path_buf(),
            pages: HashMap::new(),
            downloads: HashMap::new(),
            current: Mutex::new(String::new()),
            trigger_log: Mutex::new(Vec::new()),
        }
    }

    pub fn page(&mut self, url: impl Into<String>, html: impl Into<String>) {
        self.pages.insert(url.into(), html.into());
    }

    pub fn download(&mut self, url: impl Into<String>, filename: &str, bytes: &[u8]) {
        self.downloads
            .insert(url.into(), (filename.to_string(), bytes.to_vec()));
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        *self.current.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn page_source(&self) -> Result<String, BrowserError> {
        let current = self.current.lock().unwrap().clone();
        Ok(self
            .pages
            .get(&current)
            .cloned()
            .unwrap_or_else(|| "<html><body></body></html>".to_string()))
    }

    async fn wait_for_any(
        &self,
        _selectors: &[&str],
        _timeout: Duration,
    ) -> Result<bool, BrowserError> {
        Ok(true)
    }

    async fn click_first(&self, _selectors: &[&str]) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn fill_first(&self, _selectors: &[&str], _value: &str) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn press_enter_first(&self, _selectors: &[&str]) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn trigger_download(&self, url: &str) -> Result<(), BrowserError> {
        self.trigger_log.lock().unwrap().push(url.to_string());
        if let Some((name, bytes)) = self.downloads.get(url) {
            fs::write(self.watch_dir.join(name), bytes).unwrap();
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), BrowserError> {
        Ok(())
    }
}
