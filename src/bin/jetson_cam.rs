//! Single camera preview demo.
//!
//! Opens one CSI sensor, previews it for a fixed duration, then stops the
//! preview and closes the camera.

use clap::Parser;
use csi_camera::{
    capture::default_backend, preview::default_display, Camera, FileConfig,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(version, about = "Preview one CSI camera for a fixed duration")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// CSI sensor to open (overrides the config file)
    #[arg(long)]
    sensor_id: Option<u32>,

    /// How long to preview, in seconds
    #[arg(long, default_value_t = 20)]
    duration_secs: u64,
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

    let config = match &args.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        if let Err(e) = ctrlc::set_handler(move || cancel.store(true, Ordering::SeqCst)) {
            warn!("Could not install Ctrl-C handler: {}", e);
        }
    }

    let mut pipeline = config.camera.clone();
    if let Some(sensor_id) = args.sensor_id {
        pipeline.sensor_id = sensor_id;
    }

    info!("CSI camera demo v{}", csi_camera::VERSION);

    let backend = default_backend();
    let mut camera = match Camera::open_with(backend.as_ref(), &pipeline, config.reader.clone()) {
        Ok(camera) => camera,
        Err(e) => {
            eprintln!("Failed to open camera: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = camera.start_preview(default_display(Arc::clone(&cancel)), config.preview.clone()) {
        eprintln!("Failed to start preview: {}", e);
        camera.close();
        std::process::exit(1);
    }

    let deadline = Instant::now() + Duration::from_secs(args.duration_secs);
    while Instant::now() < deadline && !cancel.load(Ordering::SeqCst) && camera.is_previewing() {
        std::thread::sleep(Duration::from_millis(100));
    }

    camera.stop_preview();
    camera.close();
    info!("Done");
}
