//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Mirror an authenticated document portal into an offline-browsable copy.
///
/// The base URL and credentials are collected interactively; flags only
/// shape where the mirror lands and how much of the portal one run covers.
#[derive(Parser, Debug)]
#[command(name = "portal-mirror")]
#[command(author, version, about)]
pub struct Args {
    /// Bounded exploration: cap roots, directories, and files for a cheap
    /// trial run against the live portal
    #[arg(long)]
    pub bounded: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Mirror output directory (default: ~/portal_offline, or
    /// ~/portal_offline_test when --bounded)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Directory the browser saves downloads into (default: ~/Downloads)
    #[arg(long)]
    pub downloads_dir: Option<PathBuf>,

    /// WebDriver endpoint of a running geckodriver
    #[arg(long, default_value = "http://localhost:4444")]
    pub webdriver_url: String,

    /// Run the browser headless
    #[arg(long)]
    pub headless: bool,
}
