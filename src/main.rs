use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use drumbooth_ctl::config::Options;
use drumbooth_ctl::led_cmd::LedCommand;
use drumbooth_ctl::relay_bus::I2cSetBus;
use drumbooth_ctl::serial::SerialLink;
use drumbooth_ctl::serial::TtySerialLink;
use drumbooth_ctl::web;
use drumbooth_ctl::EventManager;
use log::error;
use log::info;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    let options = Options::parse();

    stderrlog::new()
        .module(module_path!())
        .quiet(options.quiet)
        .verbosity(options.log_level())
        .timestamp(stderrlog::Timestamp::Millisecond)
        .init()
        .context("Failed to initialize logging")?;

    info!("Starting application");

    let serial = match TtySerialLink::open(
        &options.serial_device,
        options.baud,
        options.write_timeout(),
    ) {
        Ok(link) => Some(Box::new(link) as Box<dyn SerialLink>),
        Err(e) => {
            error!("{}, continuing without LED control", e);
            None
        }
    };

    let bus = I2cSetBus::new(&options.i2cset, options.i2c_bus, options.write_timeout());
    let manager = Arc::new(EventManager::new(
        Box::new(bus),
        serial,
        options.channel_wait(),
    ));

    let server = match TcpListener::bind(options.listen).await {
        Ok(listener) => {
            info!("Control API listening on {}", options.listen);
            let app = web::router(manager.clone());
            Some(tokio::spawn(async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(shutdown_signal())
                    .await
            }))
        }
        Err(e) => {
            error!("Could not start web server on {}: {}", options.listen, e);
            None
        }
    };

    let startup = manager.clone();
    tokio::task::spawn_blocking(move || {
        // Relays must match the idle state before anything else happens.
        if let Err(e) = startup.set_all_off() {
            error!("Initial relay reset incomplete: {}", e);
        }
        info!("All relays in initial state");

        if let Err(e) = startup.send_serial_command(&LedCommand::initial()) {
            error!("Could not set LED strips to their initial state: {}", e);
        }
    })
    .await
    .context("Startup sequence panicked")?;

    info!("Control panel ready");

    match server {
        Some(server) => server
            .await
            .context("Web server task panicked")?
            .context("Web server failed")?,
        None => shutdown_signal().await,
    }

    info!("Shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}
