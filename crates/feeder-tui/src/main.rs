//! `feeder-tui`: real-time terminal dashboard for a smart bird feeder.
//!
//! Built on [ratatui](https://ratatui.rs) with reactive data from
//! `feeder-core`'s [`SnapshotStream`](feeder_core::SnapshotStream) and watch
//! channels. Screens are navigable via number keys (1-3): Home, Stats, and
//! Settings.
//!
//! Logs are written to a file (default `/tmp/feeder-tui.log`) to avoid
//! corrupting the terminal UI. A background data bridge task streams
//! food, species, visitor, and live-feed updates into the action loop.

mod action;
mod app;
mod component;
mod data_bridge;
mod event;
mod screen;
mod screens;
mod theme;
mod tui;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use feeder_core::{Feeder, FeederConfig};

use crate::app::App;

/// Terminal dashboard for watching and tending a smart bird feeder.
#[derive(Parser, Debug)]
#[command(name = "feeder-tui", version, about)]
struct Cli {
    /// Config profile to use (defaults to the configured default profile)
    #[arg(short, long, env = "FEEDER_PROFILE")]
    profile: Option<String>,

    /// Log file path
    #[arg(long, default_value = "/tmp/feeder-tui.log")]
    log_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// File-based tracing. Nothing may be logged to stdout/stderr while the
/// alternate screen is active. The returned guard flushes on drop.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("feeder_tui={log_level},feeder_core={log_level}"))
    });

    let log_dir = cli
        .log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(std::path::Path::new("/tmp"));
    let log_filename = cli
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("feeder-tui.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();

    guard
}

/// Resolve the dashboard configuration from the shared config file.
fn build_feeder_config(cli: &Cli) -> Result<FeederConfig> {
    let cfg = feeder_config::load_config().wrap_err("failed to load feeder config")?;
    let name = cfg.active_profile_name(cli.profile.as_deref());
    let profile = cfg.profile(&name).wrap_err_with(|| {
        format!(
            "run `feeder config init` first (available profiles: {})",
            cfg.available_profiles()
        )
    })?;

    let config = feeder_config::profile_to_feeder_config(profile, &name)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Hooks go in before the terminal is touched
    tui::install_hooks()?;

    let _log_guard = setup_tracing(&cli);

    // Config errors surface on the normal screen, before raw mode
    let config = build_feeder_config(&cli)?;
    info!(
        api_url = %config.api_url,
        profile = cli.profile.as_deref().unwrap_or("(default)"),
        "starting feeder-tui"
    );

    let feeder = Feeder::new(config)?;
    let mut app = App::new(feeder);
    app.run().await?;

    Ok(())
}
