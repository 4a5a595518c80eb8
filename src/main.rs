use clap::Parser;
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;

use watchstate::{
    cli::Cli,
    config::WatchStateConfig,
    output,
    AppEvent, WatchOptions, WatchSession,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(err) = cli.validate() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }

    cli.setup_logging();

    let config = cli.resolve_config().context("Failed to load configuration")?;
    let watch_path = cli.get_watch_path();

    run(&watch_path, &config)
}

fn run(watch_path: &std::path::Path, config: &WatchStateConfig) -> Result<()> {
    let options = WatchOptions::from_config(watch_path, &config.watcher);
    let session = WatchSession::start(options)
        .with_context(|| format!("Failed to watch {}", watch_path.display()))?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let result = pump(&session, config, &running);

    // Stop on every exit path so the OS watches are released.
    let tracker = session.stop()?;
    tracing::debug!("Tracking {} files at shutdown", tracker.len());

    result
}

fn pump(session: &WatchSession, config: &WatchStateConfig, running: &AtomicBool) -> Result<()> {
    while running.load(Ordering::SeqCst) {
        match session.recv_timeout(Duration::from_millis(100)) {
            Ok(AppEvent::FileChanged(event)) => {
                output::emit(&event, config.output.format, config.output.no_color)?;
            }
            Ok(AppEvent::WatchFailed(reason)) => {
                anyhow::bail!("File watcher failed: {}", reason);
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}
