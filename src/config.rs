//! Run configuration: base URL normalization, output layout, and the
//! optional bounded-exploration caps.
//!
//! The configuration is resolved once in the binary and passed by value into
//! the engine; nothing here is global or mutable after startup.

use std::fs;
use std::path::PathBuf;

use crate::error::MirrorError;

/// Host every mirrored site lives under.
pub const PORTAL_HOST: &str = "cahier-de-prepa.fr";

/// Normalizes user input into the canonical base URL form
/// `https://<host>/<site>/`.
///
/// Accepted inputs: the full https URL, the http variant, the host-prefixed
/// form, or just the bare site name.
#[must_use]
pub fn normalize_base_url(input: &str) -> String {
    let trimmed = input.trim().trim_end_matches('/');
    let https_prefix = format!("https://{PORTAL_HOST}/");
    let http_prefix = format!("http://{PORTAL_HOST}/");
    let host_prefix = format!("{PORTAL_HOST}/");

    if trimmed.starts_with(&https_prefix) {
        format!("{trimmed}/")
    } else if let Some(rest) = trimmed.strip_prefix(&http_prefix) {
        format!("{https_prefix}{rest}/")
    } else if trimmed.starts_with(&host_prefix) {
        format!("https://{trimmed}/")
    } else {
        format!("{https_prefix}{trimmed}/")
    }
}

/// Caps for bounded-exploration mode.
///
/// Each cap is independent; hitting one skips further work of that kind
/// without aborting the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplorationLimits {
    /// Top-level directories explored from the navigation menu.
    pub max_roots: usize,
    /// Total directory pages visited.
    pub max_dirs: usize,
    /// Total files downloaded.
    pub max_files: usize,
}

impl ExplorationLimits {
    /// Defaults for a cheap trial run against a live portal.
    pub const TRIAL: Self = Self {
        max_roots: 1,
        max_dirs: 10,
        max_files: 10,
    };
}

/// Resolved configuration for one mirror run.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Canonical base URL, always ending in `/`.
    pub base_url: String,
    /// Mirror root: rewritten pages, mappings, and the run log land here.
    pub output_dir: PathBuf,
    /// Shared directory the browser saves downloads into.
    pub watch_dir: PathBuf,
    /// Exploration caps; `None` mirrors the whole portal.
    pub limits: Option<ExplorationLimits>,
}

impl MirrorConfig {
    /// Static asset directory (`assets/`).
    #[must_use]
    pub fn assets_dir(&self) -> PathBuf {
        self.output_dir.join("assets")
    }

    /// File store (`fichiers/`): resolved downloads plus alias entries.
    #[must_use]
    pub fn files_dir(&self) -> PathBuf {
        self.output_dir.join("fichiers")
    }

    /// Creates the output directory skeleton.
    pub fn create_layout(&self) -> Result<(), MirrorError> {
        for sub in ["assets/css", "assets/js", "assets/fonts", "fichiers"] {
            let path = self.output_dir.join(sub);
            fs::create_dir_all(&path).map_err(|source| MirrorError::io(path.clone(), source))?;
        }
        Ok(())
    }
}
