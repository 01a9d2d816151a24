use std::{
    io::{BufRead, BufReader, ErrorKind},
    path::PathBuf,
    time::Duration,
};

use anyhow::Context;
use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod events;
mod monitor;
mod notify;

use crate::{
    config::{Config, RawConfig},
    events::{parse_line, Event},
    monitor::Monitor,
    notify::Notifier,
};

#[derive(Parser, Debug)]
#[command(about, author = "Danilo Bargen", version)]
struct Args {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error), unless RUST_LOG is set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Set up logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    // Parse config
    let raw_config = match RawConfig::load(&args.config) {
        Ok(val) => val,
        Err(e) => {
            error!("Failed to load config: {:#}", e);
            println!(
                "Example config:\n\n{}",
                toml::to_string(&RawConfig::example())?
            );
            return Ok(());
        }
    };
    let config: Config = raw_config.try_into()?;

    // Set up notifications
    let notifier = match config.threema {
        Some(threema) => Some(Notifier::new(threema)?),
        None => {
            warn!("No Threema config found, notifications are disabled");
            None
        }
    };
    let mut monitor = Monitor::new(config.notify);

    // Connect to serial device
    let raw_port = serialport::new(
        config.serial.port.to_string_lossy(),
        config.serial.baudrate,
    )
    .timeout(Duration::from_secs(30))
    .open()
    .context(format!(
        "Failed to open serial port at {:?}",
        config.serial.port
    ))?;
    info!("Listening on {:?}", config.serial.port);

    // Buffered reading
    let mut port = BufReader::new(raw_port);

    // Main loop
    let mut line_buffer = String::new();
    loop {
        match port.read_line(&mut line_buffer) {
            Ok(_size) => {
                if let Some(text) = process_line(line_buffer.trim(), &mut monitor) {
                    if let Some(notifier) = &notifier {
                        if let Err(e) = notifier.send(&text).await {
                            error!("Failed to send notification: {:#}", e);
                        }
                    }
                }
            }
            Err(e) if e.kind() == ErrorKind::TimedOut => debug!("No data from meter"),
            Err(e) => error!("Error while reading: {}", e),
        }
        line_buffer.clear();
    }
}

/// Log a line and return the notification it triggers, if any.
fn process_line(line: &str, monitor: &mut Monitor) -> Option<String> {
    let event = match parse_line(line) {
        Some(event) => event,
        None => {
            if !line.is_empty() {
                debug!("Unrecognized line: {:?}", line);
            }
            return None;
        }
    };

    match &event {
        Event::Update(update) => info!(
            cycle = update.cycle,
            lux = ?update.lux,
            smoothed = ?update.smoothed,
            bortle = ?update.bortle,
            indicator = %update.indicator,
            healthy = update.sensor_healthy,
            "Update"
        ),
        Event::StateTransition { from, to } => info!("State transition: {} -> {}", from, to),
        Event::IndicatorTransition { from, to } => {
            info!("Indicator transition: {} -> {}", from, to)
        }
        Event::Error { message } => warn!("Meter error: {}", message),
    }

    monitor.handle(&event)
}
