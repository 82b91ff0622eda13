//! Link rewriting: turns the captured, identifier-based hyperlink scheme
//! into a closed local scheme.
//!
//! Runs once after traversal, when both mappings are final. The pass is
//! idempotent (already-local targets are recognized and left alone) and it
//! only ever touches `href`/`src` attribute values, never link text or any
//! other markup.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{debug, info, warn};

use crate::error::MirrorError;
use crate::parser::query_param;

/// Endpoints that cannot work offline; their links collapse to `#`.
const OFFLINE_UNAVAILABLE: [&str; 6] = ["recent", "agenda", "mail", "notescolles", "prefs", "blogcdp"];

/// Before/after examples kept per page for diagnostics.
const EXAMPLE_CAP: usize = 3;

#[allow(clippy::expect_used)]
static ANCHOR_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(<a\b[^>]*?href=")([^"]*)(")"#).expect("anchor href regex is valid")
});

#[allow(clippy::expect_used)]
static CSS_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(href=")(css/[^"]*)(")"#).expect("css href regex is valid"));

#[allow(clippy::expect_used)]
static JS_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(src=")(js/[^"]*)(")"#).expect("js src regex is valid"));

/// Per-page rewrite outcome.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PageRewrite {
    /// Anchor hrefs that changed.
    pub anchors_fixed: usize,
    /// Stylesheet/script references that changed.
    pub assets_fixed: usize,
    /// Up to [`EXAMPLE_CAP`] (before, after) pairs.
    pub examples: Vec<(String, String)>,
}

impl PageRewrite {
    fn changed(&self) -> bool {
        self.anchors_fixed > 0 || self.assets_fixed > 0
    }
}

/// Whole-mirror rewrite totals.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RewriteReport {
    pub pages: usize,
    pub anchors_fixed: usize,
    pub assets_fixed: usize,
}

/// Rewrites a single anchor target. Returns the href unchanged when no rule
/// matches; callers compare against the input to tell a fix from an
/// already-correct link.
#[must_use]
pub fn rewrite_href(href: &str) -> String {
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return href.to_string();
    }
    // idempotence guard: targets already pointing into the mirror
    if href.starts_with("assets/") || href.starts_with("fichiers/") {
        return href.to_string();
    }
    if href.contains("download?id=")
        && let Some(id) = query_param(href, "id")
    {
        return format!("fichiers/{id}");
    }
    if (href.contains("docs?rep=") || href.starts_with("?rep="))
        && let Some(id) = query_param(href, "rep")
    {
        return format!("docs_rep_{id}.html");
    }
    match href {
        "." | "./" | "index" | "index.html" => return "index.html".to_string(),
        "docs" | "docs.html" => return "docs.html".to_string(),
        _ => {}
    }

    let endpoint = href.split(['?', '#']).next().unwrap_or(href);
    if OFFLINE_UNAVAILABLE.contains(&endpoint) || href.starts_with(".?") {
        return "#".to_string();
    }

    href.to_string()
}

/// Rewrites one page body, returning the new content and what changed.
#[must_use]
pub fn rewrite_document(html: &str) -> (String, PageRewrite) {
    let mut outcome = PageRewrite::default();

    let with_assets = {
        let assets_fixed = &mut outcome.assets_fixed;
        let prefixed = CSS_HREF.replace_all(html, |caps: &Captures<'_>| {
            *assets_fixed += 1;
            format!("{}assets/{}{}", &caps[1], &caps[2], &caps[3])
        });
        JS_SRC
            .replace_all(&prefixed, |caps: &Captures<'_>| {
                *assets_fixed += 1;
                format!("{}assets/{}{}", &caps[1], &caps[2], &caps[3])
            })
            .into_owned()
    };

    let rewritten = ANCHOR_HREF
        .replace_all(&with_assets, |caps: &Captures<'_>| {
            let old = &caps[2];
            let new = rewrite_href(old);
            if new != old {
                outcome.anchors_fixed += 1;
                if outcome.examples.len() < EXAMPLE_CAP {
                    outcome.examples.push((old.to_string(), new.clone()));
                }
            }
            format!("{}{new}{}", &caps[1], &caps[3])
        })
        .into_owned();

    (rewritten, outcome)
}

/// Rewrites every saved page in the mirror root.
///
/// Per-page failures are logged and skipped; the pass never aborts the run.
pub fn rewrite_mirror(output_dir: &Path) -> Result<RewriteReport, MirrorError> {
    let mut report = RewriteReport::default();

    let entries = fs::read_dir(output_dir)
        .map_err(|source| MirrorError::io(output_dir.to_path_buf(), source))?;
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "html") {
            continue;
        }
        report.pages += 1;

        let name = entry.file_name().to_string_lossy().into_owned();
        let html = match fs::read_to_string(&path) {
            Ok(html) => html,
            Err(error) => {
                warn!(page = %name, %error, "page unreadable, links left as-is");
                continue;
            }
        };

        let (rewritten, outcome) = rewrite_document(&html);
        if !outcome.changed() {
            continue;
        }
        if let Err(error) = fs::write(&path, rewritten) {
            warn!(page = %name, %error, "rewritten page could not be written, links left as-is");
            continue;
        }

        info!(
            page = %name,
            assets = outcome.assets_fixed,
            links = outcome.anchors_fixed,
            "links rewritten"
        );
        for (old, new) in &outcome.examples {
            debug!(page = %name, from = %old, to = %new, "rewrite example");
        }
        if outcome.anchors_fixed > outcome.examples.len() {
            debug!(
                page = %name,
                more = outcome.anchors_fixed - outcome.examples.len(),
                "further rewrites not listed"
            );
        }

        report.anchors_fixed += outcome.anchors_fixed;
        report.assets_fixed += outcome.assets_fixed;
    }

    info!(
        pages = report.pages,
        assets = report.assets_fixed,
        links = report.anchors_fixed,
        "link rewriting complete"
    );
    Ok(report)
}
