//! Stereo preview with periodic snapshots.
//!
//! Shows the right and left CSI cameras and saves both frames every few
//! seconds under `images/<Right|Left>/<date>/<time>.png`. Runs until a
//! window is closed or Escape is pressed.

use clap::Parser;
use csi_camera::{
    capture::default_backend,
    preview::default_display,
    snapshot::{open_pair, SystemClock},
    FileConfig, SnapshotSession,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(version, about = "Preview two CSI cameras and save image pairs periodically")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root folder for saved images (overrides the config file)
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };
    if let Some(output_dir) = args.output_dir {
        config.snapshot.output_dir = output_dir;
    }

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        if let Err(e) = ctrlc::set_handler(move || cancel.store(true, Ordering::SeqCst)) {
            warn!("Could not install Ctrl-C handler: {}", e);
        }
    }

    let backend = default_backend();
    let (right, left) = match open_pair(backend.as_ref(), &config.right, &config.left) {
        Ok(pair) => pair,
        Err(e) => {
            error!("{}", e);
            println!("Unable to open camera");
            return;
        }
    };

    let session = match SnapshotSession::new(
        right,
        left,
        default_display(cancel),
        SystemClock::new(),
        config.snapshot.clone(),
    ) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Failed to open preview windows: {}", e);
            std::process::exit(1);
        }
    };

    let saved = session.run();
    info!("Saved {} image pairs", saved);
}
