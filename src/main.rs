//! CLI entry point for the portal mirror.
//!
//! Collects the base URL and credentials interactively, drives one mirror
//! run, and maps the outcome to an explicit exit code: 0 success, 1
//! authentication failure, 2 fatal error, 130 user interrupt.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use portal_mirror_core::{
    Browser, Credentials, DownloadCorrelator, ExplorationLimits, MirrorConfig, MirrorError,
    TraversalEngine, WebDriverBrowser, assets, auth, normalize_base_url, report, rewrite, runlog,
};
use tracing::{error, info, warn};

mod cli;

use cli::Args;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessExit {
    Success,
    AuthFailure,
    Fatal,
    Interrupted,
}

impl ProcessExit {
    fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::AuthFailure => 1,
            Self::Fatal => 2,
            Self::Interrupted => 130,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(exit) => ExitCode::from(exit.code()),
        Err(err) => {
            // tracing may not be up yet; print directly
            eprintln!("fatal error: {err:#}");
            ExitCode::from(ProcessExit::Fatal.code())
        }
    }
}

async fn run(args: Args) -> Result<ProcessExit> {
    // Interactive inputs happen before tracing init so prompts do not
    // interleave with log lines.
    let site = prompt("Site URL or name: ")?;
    let base_url = normalize_base_url(&site);
    println!("  using {base_url}");
    let email = prompt("Account email: ")?;
    let secret = rpassword::prompt_password("Account secret: ")
        .context("could not read the account secret")?;

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| default_output_dir(args.bounded));
    let watch_dir = args.downloads_dir.clone().unwrap_or_else(default_watch_dir);
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("could not create {}", output_dir.display()))?;
    runlog::init(&output_dir, args.verbose, args.quiet)?;

    info!(
        output = %output_dir.display(),
        downloads = %watch_dir.display(),
        "portal mirror starting"
    );
    let limits = args.bounded.then_some(ExplorationLimits::TRIAL);
    if let Some(limits) = limits {
        info!(
            roots = limits.max_roots,
            directories = limits.max_dirs,
            files = limits.max_files,
            "bounded exploration active"
        );
    }

    let config = MirrorConfig {
        base_url,
        output_dir,
        watch_dir,
        limits,
    };
    config.create_layout()?;

    let browser = WebDriverBrowser::connect(&args.webdriver_url, &config.watch_dir, args.headless)
        .await
        .context("could not open the browser session; is geckodriver running?")?;

    // Ctrl-C only flips a flag: the engine finishes its current step, and
    // partial mappings still get persisted below.
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let flag = interrupted.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received; persisting partial state");
                flag.store(true, Ordering::SeqCst);
            }
        });
    }

    let credentials = Credentials { email, secret };
    if let Err(err) = auth::login(&browser, &config.base_url, &credentials).await {
        error!(%err, "authentication failed, nothing mirrored");
        let _ = browser.close().await;
        return Ok(match err {
            MirrorError::Authentication { .. } => ProcessExit::AuthFailure,
            _ => ProcessExit::Fatal,
        });
    }

    let started = Instant::now();
    let correlator = DownloadCorrelator::new(config.watch_dir.clone(), config.files_dir());
    let mut engine = TraversalEngine::new(&browser, &config, correlator, interrupted.clone());
    let traversal_outcome = engine.run().await;
    let state = engine.into_state();
    let _ = browser.close().await;

    // Assets, rewriting, and mappings all run on whatever traversal
    // produced, complete or not: a partial mirror must stay browsable.
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("could not build the asset HTTP client")?;
    assets::download_assets(&http, &config.base_url, &config.assets_dir()).await;

    if let Err(err) = rewrite::rewrite_mirror(&config.output_dir) {
        warn!(%err, "link rewriting pass failed; captured pages keep their remote links");
    }
    state.save(&config.output_dir)?;
    report::print_summary(&state, &config.output_dir, started);

    if let Err(err) = traversal_outcome {
        error!(%err, "traversal aborted; partial mirror preserved");
        return Ok(ProcessExit::Fatal);
    }
    if interrupted.load(Ordering::SeqCst) {
        return Ok(ProcessExit::Interrupted);
    }
    Ok(ProcessExit::Success)
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn default_output_dir(bounded: bool) -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(if bounded {
        "portal_offline_test"
    } else {
        "portal_offline"
    })
}

fn default_watch_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Downloads")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_explicit() {
        assert_eq!(ProcessExit::Success.code(), 0);
        assert_eq!(ProcessExit::AuthFailure.code(), 1);
        assert_eq!(ProcessExit::Fatal.code(), 2);
        assert_eq!(ProcessExit::Interrupted.code(), 130);
    }

    #[test]
    fn test_default_output_dir_differs_in_bounded_mode() {
        assert_ne!(default_output_dir(false), default_output_dir(true));
    }
}
