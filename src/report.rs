//! Final run report.
//!
//! Read-only consumer of the state the other components produced: counts,
//! duration, and the capped list of failed downloads.

use std::fs;
use std::path::Path;
use std::time::Instant;

use tracing::{info, warn};

use crate::mapping::MirrorState;

/// Failed files listed individually before collapsing to a remainder count.
const FAILURE_LIST_CAP: usize = 10;

/// Prints the run summary to the log.
pub fn print_summary(state: &MirrorState, output_dir: &Path, started: Instant) {
    let elapsed = started.elapsed();
    let minutes = elapsed.as_secs() / 60;
    let seconds = elapsed.as_secs() % 60;

    info!(
        pages = saved_page_count(output_dir),
        files = state.files.len(),
        failed = state.failures.len(),
        duration = %format!("{minutes}m {seconds:02}s"),
        "mirror run finished"
    );

    for failed in state.failures.iter().take(FAILURE_LIST_CAP) {
        warn!(id = %failed.id, title = %failed.title, reason = %failed.reason, "failed download");
    }
    if state.failures.len() > FAILURE_LIST_CAP {
        warn!(
            more = state.failures.len() - FAILURE_LIST_CAP,
            "additional failed downloads not listed"
        );
    }

    info!(
        path = %output_dir.display(),
        "mirror ready; open index.html in a browser"
    );
}

/// Saved pages are whatever `*.html` actually landed in the mirror root.
fn saved_page_count(output_dir: &Path) -> usize {
    fs::read_dir(output_dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "html"))
                .count()
        })
        .unwrap_or(0)
}
