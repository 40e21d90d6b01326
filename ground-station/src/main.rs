mod config;
mod error;
mod station;

use crate::{config::Config, station::Station};
use clap::Parser;
use std::{
    process::ExitCode,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

pub use error::{Error, Result};

/// Hamlib tracking bridge between Gpredict and the ground station bus.
#[derive(Parser, Debug)]
#[command(name = "ground-station", version, about)]
struct Args {
    /// Configuration file, with or without extension
    #[arg(short, long, default_value = "ground-station/config")]
    config: String,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = Config::load(&args.config)?;
    config.validate()?;

    log::info!("Loaded configuration from {}", args.config);
    log::info!("  Ground Station: {}", config.ground_station.id);

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let mut station = Station::start(&config)?;
    for server in station.servers() {
        log::info!("  {}: {}", server.component(), server.local_addr());
    }

    while running.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(200));
    }

    station.stop();
    log::info!("ground-station shutdown complete");

    Ok(())
}
