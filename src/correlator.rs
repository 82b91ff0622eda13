//! Download correlation against the shared browser download directory.
//!
//! The portal hands out file bytes as a side effect of a navigation, not as a
//! response the engine can read. The only observable result is a new entry in
//! a download directory that other processes may also be writing to. The
//! correlator disambiguates with a snapshot-and-poll protocol: record the
//! directory entries before triggering, then treat the newest entry that was
//! not in the baseline and was modified after the trigger as ours.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::browser::Browser;
use crate::mapping::FileRecord;
use crate::naming;

/// Suffix the browser gives an in-progress download.
const IN_PROGRESS_SUFFIX: &str = "part";

/// Timing knobs for the correlation protocol.
#[derive(Debug, Clone, Copy)]
pub struct CorrelatorTiming {
    /// Pause after the trigger before the first poll.
    pub initial_delay: Duration,
    /// Interval between directory polls.
    pub poll_interval: Duration,
    /// Number of polls before an attempt is abandoned; the budget is spent
    /// once waiting for a new entry and again waiting out an in-progress
    /// suffix.
    pub poll_budget: u32,
    /// Politeness pause after a completed download.
    pub pause_between: Duration,
}

impl Default for CorrelatorTiming {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(3),
            poll_interval: Duration::from_secs(1),
            poll_budget: 30,
            pause_between: Duration::from_secs(2),
        }
    }
}

/// Why a download attempt produced no mirrored file.
///
/// Every variant is recoverable: the attempt is recorded and traversal moves
/// on. There are no retries.
#[derive(Debug, Error)]
pub enum DownloadFailure {
    /// No entry beyond the baseline appeared within the polling budget.
    #[error("no new file appeared in {}", dir.display())]
    NoFileProduced {
        /// The watched download directory.
        dir: PathBuf,
    },

    /// The candidate never lost its in-progress suffix.
    #[error("download of {name} never completed")]
    Incomplete {
        /// Name of the in-progress entry.
        name: String,
    },

    /// Filesystem error while resolving the download into the file store.
    #[error("filesystem error at {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl DownloadFailure {
    fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Correlates browser-triggered downloads into the mirror file store.
#[derive(Debug)]
pub struct DownloadCorrelator {
    watch_dir: PathBuf,
    store_dir: PathBuf,
    timing: CorrelatorTiming,
}

impl DownloadCorrelator {
    /// Creates a correlator watching `watch_dir` and resolving files into
    /// `store_dir`, with production timing.
    #[must_use]
    pub fn new(watch_dir: PathBuf, store_dir: PathBuf) -> Self {
        Self {
            watch_dir,
            store_dir,
            timing: CorrelatorTiming::default(),
        }
    }

    /// Replaces the timing knobs (tests run with near-zero delays).
    #[must_use]
    pub fn with_timing(self, timing: CorrelatorTiming) -> Self {
        Self { timing, ..self }
    }

    /// Downloads one file and resolves it under its identity-derived name.
    ///
    /// On success the file lives at `store_dir/<slug>` with an alias entry
    /// `store_dir/<file_id>` pointing at it, and the returned record carries
    /// its final name and size.
    pub async fn download<B: Browser + ?Sized>(
        &self,
        browser: &B,
        base_url: &str,
        file_id: &str,
        title: &str,
        owner_label: &str,
    ) -> Result<FileRecord, DownloadFailure> {
        let url = format!("{base_url}download?id={file_id}");
        let baseline = self.snapshot()?;
        let triggered_at = SystemTime::now();

        if let Err(error) = browser.trigger_download(&url).await {
            // The navigation is only the trigger; whatever it reports, the
            // filesystem is the source of truth.
            debug!(file_id, %error, "download trigger did not settle cleanly");
        }
        sleep(self.timing.initial_delay).await;

        let mut path = self.await_new_entry(&baseline, triggered_at).await?;
        path = self.await_completion(path).await?;

        let extension = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let local_file = naming::ensure_extension(&naming::file_slug(title), &extension);
        let dest = self.store_dir.join(&local_file);

        move_file(&path, &dest).map_err(|source| DownloadFailure::io(dest.clone(), source))?;
        let size_bytes = fs::metadata(&dest)
            .map_err(|source| DownloadFailure::io(dest.clone(), source))?
            .len();

        write_alias(&self.store_dir, file_id, &local_file)
            .map_err(|source| DownloadFailure::io(self.store_dir.join(file_id), source))?;

        let size_human = naming::format_size(size_bytes);
        info!(file = %local_file, size = %size_human, alias = file_id, "file resolved");

        sleep(self.timing.pause_between).await;

        Ok(FileRecord {
            local_file,
            alias: file_id.to_string(),
            title: title.to_string(),
            directory: owner_label.to_string(),
            size_human,
            size_bytes,
        })
    }

    /// Names present in the watch directory right now.
    fn snapshot(&self) -> Result<HashSet<OsString>, DownloadFailure> {
        let entries = fs::read_dir(&self.watch_dir)
            .map_err(|source| DownloadFailure::io(self.watch_dir.clone(), source))?;
        Ok(entries
            .filter_map(Result::ok)
            .map(|entry| entry.file_name())
            .collect())
    }

    /// Polls until an entry outside the baseline, modified at or after the
    /// trigger instant, shows up.
    async fn await_new_entry(
        &self,
        baseline: &HashSet<OsString>,
        triggered_at: SystemTime,
    ) -> Result<PathBuf, DownloadFailure> {
        for _ in 0..self.timing.poll_budget {
            if let Some(path) = self.newest_new_entry(baseline, triggered_at)? {
                return Ok(path);
            }
            sleep(self.timing.poll_interval).await;
        }
        Err(DownloadFailure::NoFileProduced {
            dir: self.watch_dir.clone(),
        })
    }

    fn newest_new_entry(
        &self,
        baseline: &HashSet<OsString>,
        triggered_at: SystemTime,
    ) -> Result<Option<PathBuf>, DownloadFailure> {
        let entries = fs::read_dir(&self.watch_dir)
            .map_err(|source| DownloadFailure::io(self.watch_dir.clone(), source))?;

        let newest = entries
            .filter_map(Result::ok)
            .filter(|entry| !baseline.contains(&entry.file_name()))
            .filter_map(|entry| {
                let modified = entry.metadata().and_then(|meta| meta.modified()).ok()?;
                Some((entry.path(), modified))
            })
            .max_by_key(|(_, modified)| *modified);

        // An entry older than the trigger belongs to someone else; keep
        // polling for ours.
        Ok(newest
            .filter(|(_, modified)| *modified >= triggered_at)
            .map(|(path, _)| path))
    }

    /// Waits out the in-progress suffix, following the rename to the
    /// finished entry.
    async fn await_completion(&self, mut path: PathBuf) -> Result<PathBuf, DownloadFailure> {
        let mut polls = 0;
        while is_in_progress(&path) {
            if polls >= self.timing.poll_budget {
                return Err(DownloadFailure::Incomplete {
                    name: path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                });
            }
            sleep(self.timing.poll_interval).await;
            polls += 1;

            if !path.exists() {
                let finished = path.with_extension("");
                if finished.exists() {
                    path = finished;
                }
            }
        }
        Ok(path)
    }
}

fn is_in_progress(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == IN_PROGRESS_SUFFIX)
}

/// Rename, falling back to copy + remove across filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)
}

/// Writes the alias entry: a symlink where supported, a byte copy otherwise.
fn write_alias(store_dir: &Path, alias: &str, target: &str) -> io::Result<()> {
    let alias_path = store_dir.join(alias);
    if alias_path.symlink_metadata().is_ok() {
        fs::remove_file(&alias_path)?;
    }

    #[cfg(unix)]
    {
        if std::os::unix::fs::symlink(target, &alias_path).is_ok() {
            return Ok(());
        }
    }

    fs::copy(store_dir.join(target), &alias_path).map(|_| ())
}
