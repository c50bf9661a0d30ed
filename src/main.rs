use log::{error, info, warn};
use std::thread;
use time::OffsetDateTime;
use tokio::sync::mpsc;

use metriful_etl::config::SensorConfig;
use metriful_etl::database::{ensure_schema, store_measurement};
use metriful_etl::models::SensorData;
use metriful_etl::sensor::{RpiTransport, SensorError, Session};
use metriful_etl::utils::{format_datetime, format_fields};

// Readings buffered between the sampler thread and the database writer
const CHANNEL_CAPACITY: usize = 16;

type Sample = (OffsetDateTime, SensorData);

/// Drive the sensor in cycle mode and forward every reading.
///
/// Runs on a dedicated thread since every bus and GPIO call blocks.
fn run_sampler(config: SensorConfig, tx: mpsc::Sender<Sample>) -> Result<(), String> {
    let transport = RpiTransport::open(config.i2c_bus, &config.pins)
        .map_err(|e| format!("Failed to open sensor bus: {}", e))?;

    let mut session = Session::new(
        transport,
        config.address,
        config.pins,
        config.session_options(),
    )
    .map_err(|e| format!("Failed to reset sensor: {}", e))?;

    if let Some(sensor) = config.particle_sensor {
        session
            .enable_particle_sensor(sensor)
            .map_err(|e| format!("Failed to enable particle sensor: {}", e))?;
    }

    session
        .cycle(config.cycle_interval)
        .map_err(|e| format!("Failed to start cycle mode: {}", e))?;
    info!("Measuring every {}", config.cycle_interval);

    loop {
        match session.wait_for_ready() {
            Ok(()) => {}
            Err(SensorError::Timeout) => {
                warn!("No reading within the ready timeout");
                continue;
            }
            Err(e) => return Err(format!("Waiting for sensor failed: {}", e)),
        }

        let data = match session.read_all() {
            Ok(data) => data,
            Err(e) => {
                error!("Read failed: {}", e);
                continue;
            }
        };

        if tx.blocking_send((OffsetDateTime::now_utc(), data)).is_err() {
            // Writer is gone, leave the device idle
            if let Err(e) = session.standby() {
                warn!("Failed to return sensor to standby: {}", e);
            }
            return Ok(());
        }
    }
}

async fn main_loop(config: SensorConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting Metriful data collection service");

    ensure_schema(&config.database_url).await?;

    let database_url = config.database_url.clone();
    let (tx, mut rx) = mpsc::channel::<Sample>(CHANNEL_CAPACITY);

    thread::Builder::new()
        .name("sampler".into())
        .spawn(move || {
            if let Err(e) = run_sampler(config, tx) {
                error!("{}", e);
            }
        })?;

    while let Some((captured_at, data)) = rx.recv().await {
        let fields = data.fields();
        if fields.is_empty() {
            warn!("Reading at {} has no fields", format_datetime(&captured_at));
            continue;
        }
        info!(
            "Reading at {}: {}",
            format_datetime(&captured_at),
            format_fields(&fields)
        );

        match store_measurement(&data, captured_at, &database_url).await {
            Ok(()) => info!("Successfully stored {} fields", fields.len()),
            Err(e) => error!("Failed to store reading: {}", e),
        }
    }

    Err("Sampler stopped".into())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match SensorConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    // Handle Ctrl+C gracefully
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        let _ = tx.send(());
    });

    // Run main loop or wait for shutdown signal
    tokio::select! {
        result = main_loop(config) => {
            match result {
                Ok(_) => info!("Program completed successfully"),
                Err(e) => error!("Fatal error: {}", e),
            }
        }
        _ = &mut rx => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    Ok(())
}
