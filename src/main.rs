use std::env;
use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use tokio::sync::mpsc;

use crate::config::settings::Settings;
use crate::config::DeviceCatalog;
use crate::input::pipeline::{Command, MotionSink, Pipeline};
use crate::input::sample::MotionSample;
use crate::service::ServiceGuard;

mod config;
mod drivers;
mod input;
mod service;

#[derive(Parser)]
#[command(name = "spacemoused", version, about = "6-DOF SpaceMouse input pipeline daemon")]
struct Args {
    /// Path to the device catalog file
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Path to the user settings file
    #[arg(long)]
    settings: Option<PathBuf>,

    /// List the devices in the catalog and exit
    #[arg(long)]
    list_devices: bool,

    /// Import a legacy devices.json catalog into the user catalog and exit
    #[arg(long, value_name = "FILE")]
    import: Option<PathBuf>,

    /// Only publish samples when the motion state changes
    #[arg(long)]
    change_only: bool,

    /// Leave a running host navigation service untouched
    #[arg(long)]
    no_service_guard: bool,
}

/// Writes published motion samples to stdout as JSON lines
struct StdoutSink {
    change_only: bool,
}

impl MotionSink for StdoutSink {
    fn publish(&mut self, sample: &MotionSample) {
        match serde_json::to_string(sample) {
            Ok(line) => println!("{line}"),
            Err(e) => log::error!("Unable to serialize sample: {e}"),
        }
    }

    fn change_only(&self) -> bool {
        self.change_only
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let log_level = match env::var("LOG_LEVEL") {
        Ok(value) => value,
        Err(_) => "info".to_string(),
    };
    env::set_var("RUST_LOG", log_level);
    env_logger::init();
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    log::info!("Starting spacemoused v{}", VERSION);

    let args = Args::parse();

    // Load the device catalog
    let mut catalog = match args.catalog.as_ref() {
        Some(path) => DeviceCatalog::from_yaml_file(path)?,
        None => DeviceCatalog::discover(),
    };
    for (name, reason) in catalog.rejected() {
        log::warn!("Catalog entry '{name}' was rejected: {reason}");
    }
    if catalog.is_empty() {
        log::warn!("Device catalog is empty; no device can be matched");
    }

    if args.list_devices {
        for profile in catalog.profiles() {
            println!(
                "{} ({:#06x}:{:#06x})",
                profile.name,
                profile.vendor_id(),
                profile.product_id()
            );
        }
        return Ok(());
    }

    if let Some(legacy_path) = args.import.as_ref() {
        if args.catalog.is_none() {
            // Imports land in the user catalog, not a shipped one
            if let Some(user_path) = config::path::place_catalog_file() {
                catalog.set_source(&user_path);
            }
        }
        let imported = catalog.import_legacy_json(legacy_path)?;
        log::info!("Imported {imported} device profiles from {legacy_path:?}");
        return Ok(());
    }

    // Load and validate user settings
    let settings = match args.settings.as_ref() {
        Some(path) => Settings::from_yaml_file(path)?,
        None => Settings::load_or_default(),
    };

    // Stop any conflicting navigation service before touching the device
    let guard = if args.no_service_guard {
        ServiceGuard::default()
    } else {
        match tokio::task::spawn_blocking(ServiceGuard::acquire).await? {
            Ok(guard) => guard,
            Err(e) => {
                // The service may already have released the device
                log::warn!("Unable to stop navigation service: {e}; continuing anyway");
                ServiceGuard::default()
            }
        }
    };

    let sink = StdoutSink {
        change_only: args.change_only,
    };
    let mut pipeline = Pipeline::new(settings, sink);
    let (command_tx, command_rx) = mpsc::channel(16);

    // Setup CTRL+C handler
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Unable to listen for shutdown signal: {e}");
            return;
        }
        log::info!("Shutting down");
        let _ = command_tx.send(Command::Stop).await;
    });

    let result = pipeline.run(catalog, command_rx).await;

    // The pipeline has stopped and the reader task has joined, so the
    // device is free; restore the navigation service as the last step.
    if let Err(e) = tokio::task::spawn_blocking(move || guard.release()).await? {
        log::warn!("Unable to restart navigation service: {e}");
    }

    log::info!("spacemoused stopped");

    result
}
