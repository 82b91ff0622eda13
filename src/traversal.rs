//! Depth-first traversal of the remote directory graph.
//!
//! The graph is only materialized by fetching: each directory page reveals
//! its children. The engine keeps an explicit frontier stack and a per-node
//! state (`Visiting` once dequeued, `Saved` once its page is on disk), which
//! bounds the walk even when directories cross-link or cycle. Everything a
//! node produces (page file, mapping entries, downloads, failures) is
//! recorded before its children are pushed.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::browser::{Browser, BrowserError};
use crate::config::MirrorConfig;
use crate::correlator::DownloadCorrelator;
use crate::error::MirrorError;
use crate::mapping::{FailedDownload, MirrorState, PageRecord};
use crate::naming;
use crate::parser::{self, LinkTarget};

/// Bounded wait for a structural marker before capturing a page; rendering
/// proceeds with whatever is there when it elapses.
const PAGE_READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Selectors that signal a fully rendered portal page.
const PAGE_READY_MARKERS: [&str; 2] = [".icon-deconnexion", "section"];

/// Lifecycle of a directory node within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    /// Dequeued for exploration; never enqueued again.
    Visiting,
    /// Page captured and recorded; the visited-set invariant holds.
    Saved,
}

/// Drives one mirror run over a browser session.
pub struct TraversalEngine<'a, B: Browser + ?Sized> {
    browser: &'a B,
    config: &'a MirrorConfig,
    correlator: DownloadCorrelator,
    interrupted: Arc<AtomicBool>,
    states: HashMap<String, NodeState>,
    attempted_files: HashSet<String>,
    state: MirrorState,
    roots_explored: usize,
    dirs_visited: usize,
}

impl<'a, B: Browser + ?Sized> TraversalEngine<'a, B> {
    pub fn new(
        browser: &'a B,
        config: &'a MirrorConfig,
        correlator: DownloadCorrelator,
        interrupted: Arc<AtomicBool>,
    ) -> Self {
        Self {
            browser,
            config,
            correlator,
            interrupted,
            states: HashMap::new(),
            attempted_files: HashSet::new(),
            state: MirrorState::default(),
            roots_explored: 0,
            dirs_visited: 0,
        }
    }

    /// Accumulated mappings and failures, usable even after an aborted run.
    #[must_use]
    pub fn state(&self) -> &MirrorState {
        &self.state
    }

    /// Consumes the engine, yielding the accumulated state.
    #[must_use]
    pub fn into_state(self) -> MirrorState {
        self.state
    }

    /// Walks the portal: entry pages first, then every root directory from
    /// the navigation menu, depth-first.
    pub async fn run(&mut self) -> Result<(), MirrorError> {
        let base_url = self.config.base_url.clone();
        self.save_entry_page(&base_url, "index.html").await;
        let docs_url = format!("{base_url}docs");
        let docs_html = self.save_entry_page(&docs_url, "docs.html").await;

        let roots = docs_html.as_deref().map(parser::menu_links).unwrap_or_default();
        info!(count = roots.len(), "root directories discovered");

        for root in roots {
            if self.is_interrupted() {
                break;
            }
            if let Some(limits) = self.config.limits
                && self.roots_explored >= limits.max_roots
            {
                warn!(
                    cap = limits.max_roots,
                    "root directory cap reached, remaining roots skipped"
                );
                break;
            }
            if self.states.contains_key(&root.id) {
                continue;
            }
            info!(root = %root.label, "exploring root directory");
            self.explore(root).await;
            self.roots_explored += 1;
        }
        Ok(())
    }

    /// Depth-first walk from one root, explicit frontier.
    async fn explore(&mut self, root: LinkTarget) {
        let mut frontier = vec![root];

        while let Some(node) = frontier.pop() {
            if self.is_interrupted() {
                return;
            }
            // idempotent re-discovery: a node seen via another path is a no-op
            if self.states.contains_key(&node.id) {
                continue;
            }
            if let Some(limits) = self.config.limits
                && self.dirs_visited >= limits.max_dirs
            {
                warn!(directory = %node.id, cap = limits.max_dirs, "directory cap reached, skipping");
                continue;
            }

            self.states.insert(node.id.clone(), NodeState::Visiting);
            self.dirs_visited += 1;
            debug!(directory = %node.id, label = %node.label, "visiting directory");

            let html = match self.fetch_directory(&node.id).await {
                Ok(html) => html,
                Err(error) => {
                    warn!(directory = %node.id, %error, "page fetch failed, node skipped");
                    continue;
                }
            };

            match self.capture_page(&node, &html) {
                Ok(()) => {
                    self.states.insert(node.id.clone(), NodeState::Saved);
                }
                // keep walking: children already parsed below are still fair game
                Err(error) => warn!(directory = %node.id, %error, "page capture skipped"),
            }

            for file in parser::file_links(&html) {
                if self.is_interrupted() {
                    return;
                }
                self.download_file(&file, &node.label).await;
            }

            // reversed push keeps document order on the stack
            for child in parser::directory_links(&html).into_iter().rev() {
                if !self.states.contains_key(&child.id) {
                    frontier.push(child);
                }
            }
        }
    }

    async fn fetch_directory(&self, dir_id: &str) -> Result<String, BrowserError> {
        let url = format!("{}docs?rep={dir_id}", self.config.base_url);
        self.browser.goto(&url).await?;
        self.fetch_rendered().await
    }

    async fn fetch_rendered(&self) -> Result<String, BrowserError> {
        let ready = self
            .browser
            .wait_for_any(&PAGE_READY_MARKERS, PAGE_READY_TIMEOUT)
            .await?;
        if !ready {
            debug!("structural marker never appeared, capturing current content");
        }
        self.browser.page_source().await
    }

    /// Writes the page body and records it, atomically with entering the
    /// visited set (the caller flips the state on success).
    fn capture_page(&mut self, node: &LinkTarget, html: &str) -> Result<(), MirrorError> {
        let filename = naming::page_filename(&node.id);
        if !parser::is_authenticated(html) {
            return Err(MirrorError::page_capture(
                filename,
                "page rendered unauthenticated; the session has likely expired",
            ));
        }

        let path = self.config.output_dir.join(&filename);
        fs::write(&path, html).map_err(|source| MirrorError::io(path.clone(), source))?;
        info!(file = %filename, label = %node.label, "directory page saved");

        // first-seen label wins when a directory is linked under two names
        self.state
            .pages
            .entry(node.id.clone())
            .or_insert_with(|| PageRecord {
                local_file: filename,
                label: node.label.clone(),
                remote_ref: format!("docs?rep={}", node.id),
                link_text: node.label.clone(),
            });
        Ok(())
    }

    /// Captures one of the two entry pages; returns the content for further
    /// parsing even when the save itself fails.
    async fn save_entry_page(&mut self, url: &str, filename: &str) -> Option<String> {
        if let Err(error) = self.browser.goto(url).await {
            warn!(file = filename, %error, "entry page navigation failed");
            return None;
        }
        let html = match self.fetch_rendered().await {
            Ok(html) => html,
            Err(error) => {
                warn!(file = filename, %error, "entry page fetch failed");
                return None;
            }
        };
        if !parser::is_authenticated(&html) {
            warn!(file = filename, "entry page rendered unauthenticated, not saved");
            return None;
        }

        let path = self.config.output_dir.join(filename);
        match fs::write(&path, &html) {
            Ok(()) => info!(file = filename, "entry page saved"),
            Err(error) => warn!(file = filename, %error, "entry page write failed"),
        }
        Some(html)
    }

    async fn download_file(&mut self, file: &LinkTarget, owner_label: &str) {
        // one attempt per identifier per run, wherever it is linked from
        if !self.attempted_files.insert(file.id.clone()) {
            debug!(file = %file.id, "file already handled this run");
            return;
        }
        if let Some(limits) = self.config.limits
            && self.state.files.len() >= limits.max_files
        {
            warn!(file = %file.id, cap = limits.max_files, "file cap reached, skipping");
            return;
        }

        info!(file = %file.id, title = %file.label, "file link found");
        match self
            .correlator
            .download(
                self.browser,
                &self.config.base_url,
                &file.id,
                &file.label,
                owner_label,
            )
            .await
        {
            Ok(record) => {
                self.state.files.insert(file.id.clone(), record);
            }
            Err(failure) => {
                warn!(file = %file.id, %failure, "download failed, continuing");
                self.state.failures.push(FailedDownload {
                    id: file.id.clone(),
                    title: file.label.clone(),
                    reason: failure.to_string(),
                });
            }
        }
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }
}
