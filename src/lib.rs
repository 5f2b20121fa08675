// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod notifier;
pub mod reload;
pub mod runner;
pub mod types;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{Settings, load_raw, load_settings};
use crate::fs::{FileSystem, RealFileSystem};
use crate::notifier::{DeferredNotifier, LogNotifier, Notifier};
use crate::reload::{ReloadCoordinator, WatchFilter};
use crate::runner::{
    BuildRunner, GoToolchain, PlatformController, RunnerHandle, RunnerOptions, install_tools,
};
use crate::types::{RunState, RunStateChangeRequest};
use crate::watch::RecursiveWatcher;

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    if args.install_tools {
        let raw = load_raw(args.config.as_deref())?;
        return install_tools(Path::new(&raw.build.toolchain), args.verbose)
            .await
            .context("install-tools failed");
    }

    let settings = load_settings(args.config.as_deref(), &args.overrides())?;

    if args.dry_run {
        print_dry_run(&settings);
        return Ok(());
    }

    run_with_settings(settings).await
}

/// Build, run and (unless `once`) watch, until stopped.
///
/// This wires together:
/// - the toolchain build step and the build runner
/// - (optional) the recursive watcher and reload coordinator
/// - Ctrl-C handling
pub async fn run_with_settings(settings: Settings) -> Result<()> {
    let build = GoToolchain::new(
        settings.toolchain.clone(),
        settings.target.clone(),
        settings.bin_dir.clone(),
    )
    .with_generate_dir(settings.generate_dir.clone())
    .with_verbose(settings.verbose);

    let notifier: Arc<dyn Notifier> =
        Arc::new(DeferredNotifier::new(LogNotifier, settings.notify_delay));

    let options = RunnerOptions {
        args: settings.args.clone(),
        stop_timeout: settings.stop_timeout,
        settle_delay: settings.settle_delay,
        verbose: settings.verbose,
    };

    let (mut runner, handle) =
        BuildRunner::new(build, notifier, Arc::new(PlatformController), options);
    let RunnerHandle { requests, states } = handle;

    // Optional file watcher (disabled in --once mode).
    let watcher = match (&settings.watch_dir, settings.once) {
        (Some(dir), false) => Some(start_watching(dir, &settings, &requests, states)?),
        _ => None,
    };

    // Ctrl-C → graceful shutdown.
    {
        let tx = requests.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            info!("interrupt received, stopping");
            let _ = tx.send(RunStateChangeRequest::Stop).await;
        });
    }

    let result = runner.run().await;

    // `requests` stays alive until here so the runner never sees a closed
    // request channel while it is supervising.
    drop(requests);
    if let Some(watcher) = watcher {
        if let Err(e) = watcher.close().await {
            warn!(error = %e, "closing watcher");
        }
    }

    result.context("build runner failed")
}

fn start_watching(
    dir: &Path,
    settings: &Settings,
    requests: &mpsc::Sender<RunStateChangeRequest>,
    states: mpsc::Receiver<RunState>,
) -> Result<RecursiveWatcher> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let root = fs
        .canonicalize(dir)
        .with_context(|| format!("resolving watch dir {}", dir.display()))?;

    let filter = WatchFilter::new(&settings.watch_pattern)?
        .with_excludes(root.clone(), &settings.exclude)?;

    let (watcher, streams) = RecursiveWatcher::new()?;
    watcher.add_recursive(&root)?;
    debug!(root = %root.display(), pattern = %settings.watch_pattern, "watching");

    let coordinator = ReloadCoordinator::new(filter, fs, settings.verbose);
    let handle = RunnerHandle {
        requests: requests.clone(),
        states,
    };
    tokio::spawn(coordinator.run(streams, handle));

    Ok(watcher)
}

/// Simple dry-run output: print the resolved settings.
fn print_dry_run(settings: &Settings) {
    println!("devloop dry-run");
    println!("  target: {}", settings.target);
    if !settings.args.is_empty() {
        println!("  args: {:?}", settings.args);
    }
    println!("  toolchain: {}", settings.toolchain.display());
    println!("  bin_dir: {}", settings.bin_dir.display());
    match &settings.generate_dir {
        Some(dir) => println!("  generate_dir: {}", dir.display()),
        None => println!("  generate: disabled"),
    }
    match &settings.watch_dir {
        Some(dir) => {
            println!("  watch_dir: {}", dir.display());
            println!("  watch_pattern: {}", settings.watch_pattern);
            if !settings.exclude.is_empty() {
                println!("  exclude: {:?}", settings.exclude);
            }
        }
        None => println!("  watch: disabled (run once)"),
    }
    println!("  stop_timeout: {:?}", settings.stop_timeout);
    println!("  settle_delay: {:?}", settings.settle_delay);
    println!("  notify_delay: {:?}", settings.notify_delay);

    debug!("dry-run complete (no execution)");
}
