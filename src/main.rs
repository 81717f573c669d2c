//! mapsync - headless driver for the map state synchronization core
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::{Path, PathBuf};

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::{info, warn};

use mapsync::link::resolve_fragment;
use mapsync::{run_headless, HeadlessOptions};
use mapsync_app::config::{self, DebounceEdge, Settings};
use mapsync_app::FileFragment;
use mapsync_core::logging;

/// mapsync - keeps a map UI's URL fragment in step with its state
#[derive(Parser, Debug)]
#[command(name = "mapsync")]
#[command(about = "Drive the map state core with NDJSON events on stdin", long_about = None)]
struct Args {
    /// Startup fragment (`#key=value&...`) or a full link containing one
    #[arg(long, value_name = "FRAGMENT|URL")]
    fragment: Option<String>,

    /// Persist the fragment to this file (overrides config)
    #[arg(long, value_name = "PATH")]
    fragment_file: Option<PathBuf>,

    /// Debounce window in milliseconds (overrides config)
    #[arg(long, value_name = "MS")]
    debounce_ms: Option<u64>,

    /// Write the first change of a burst immediately
    #[arg(long)]
    leading: bool,

    /// Directory holding `.mapsync/config.toml`
    #[arg(long, value_name = "DIR")]
    project: Option<PathBuf>,

    /// Create a default `.mapsync/config.toml` and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let log_options = logging::init()?;
    eprintln!("Logging to {}", log_options.log_file().display());

    let project = args
        .project
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    if args.init_config {
        config::init_config_dir(&project)?;
        eprintln!(
            "Wrote default config to {}",
            project.join(".mapsync").join("config.toml").display()
        );
        return Ok(());
    }

    let mut settings = config::load_settings(&project);
    apply_overrides(&mut settings, &args, &project);

    let fragment = match args.fragment.as_deref() {
        Some(input) => resolve_fragment(input)?,
        None => restore_persisted(&settings),
    };
    info!("Startup fragment: {:?}", fragment);

    run_headless(HeadlessOptions { fragment, settings }).await?;
    Ok(())
}

/// CLI flags win over `.mapsync/config.toml`. Relative fragment paths are
/// resolved against the project directory.
fn apply_overrides(settings: &mut Settings, args: &Args, project: &Path) {
    if let Some(path) = &args.fragment_file {
        settings.fragment.file = Some(path.clone());
    }
    if let Some(ms) = args.debounce_ms {
        settings.fragment.debounce_ms = ms;
    }
    if args.leading {
        settings.fragment.edge = DebounceEdge::Leading;
    }
    if let Some(path) = settings.fragment.file.take() {
        settings.fragment.file = Some(if path.is_relative() {
            project.join(path)
        } else {
            path
        });
    }
}

/// Resume from the fragment file left by a previous run
fn restore_persisted(settings: &Settings) -> Option<String> {
    let path = settings.fragment.file.as_ref()?;
    match FileFragment::new(path).read() {
        Ok(fragment) => fragment,
        Err(e) => {
            warn!("Could not read fragment file {}: {}", path.display(), e);
            None
        }
    }
}
