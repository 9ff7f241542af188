mod channel;
mod command;
mod config;
mod led;
mod network;
mod scheduler;
mod session;

use anyhow::Result;
use channel::{AppState, CommandChannel};
use command::{CommandExecutor, MirrorHandle, MIRROR_DEPTH};
use config::ControllerConfig;
use led::{LedState, SimulatedStrip};
use network::{BringupOutcome, NetworkBringup, NetworkMode, SimulatedRadio, WifiRadio};
use pixel_commander_shared::CommandQueue;
use scheduler::Scheduler;
use session::SessionRegistry;
use std::sync::Arc;
use tokio::net::TcpListener;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = ControllerConfig::from_env()?;

    info!("Pixel controller starting");
    info!("  Pixels: {} on pin {}", config.pixel_count, config.pin);
    info!("  Queue: {} slots, {} commands per tick", config.queue_capacity, config.commands_per_tick);

    // Blank the strip before anything can reach it
    let mut led = LedState::new(SimulatedStrip::new(config.pin, config.pixel_count), config.pixel_count);
    led.clear();
    led.show()?;

    let mut radio = SimulatedRadio::new(config.simulation.clone());
    bring_up_network(&mut radio, &config).await;

    let queue = Arc::new(CommandQueue::with_capacity(config.queue_capacity));
    let sessions = Arc::new(SessionRegistry::new());
    let (mirror, mirror_rx) = MirrorHandle::channel(config.pixel_count, MIRROR_DEPTH);

    let executor = CommandExecutor::new(queue.clone(), sessions.clone(), led, config.commands_per_tick);
    let scheduler = Scheduler::new(executor, sessions.clone(), mirror_rx, config.tick_interval);

    let control = mirror.clone();
    let state = AppState::new(CommandChannel::new(queue, config.pixel_count), sessions, mirror);

    let listener = TcpListener::bind(config.listen_addr).await?;
    let local = listener.local_addr()?;
    info!("WebSocket endpoint: ws://{}/ws", local);
    info!("HTTP endpoint: http://{}/ping", local);

    tokio::spawn(async move {
        if let Err(e) = channel::serve(listener, state).await {
            error!("Server stopped: {:#}", e);
        }
    });

    if let Some(level) = config.initial_brightness {
        tokio::spawn(async move {
            let applied = match control.set_brightness(level).await {
                Ok(()) => control.show().await,
                Err(e) => Err(e),
            };
            match applied {
                Ok(()) => info!("Initial brightness {} applied", level),
                Err(e) => error!("Initial brightness not applied: {}", e),
            }
        });
    }

    scheduler.run().await;
    Ok(())
}

/// One-time connectivity phase; startup continues whatever the outcome
async fn bring_up_network(radio: &mut dyn WifiRadio, config: &ControllerConfig) {
    let outcome: BringupOutcome = NetworkBringup::default()
        .bring_up(
            radio,
            &config.network_name,
            &config.network_credential,
            config.connect_timeout,
        )
        .await;

    match (outcome.mode, outcome.address) {
        (NetworkMode::Unreachable, _) => {
            warn!("Serving without a network; clients are unlikely to reach the controller")
        }
        (mode, Some(address)) => info!("Network mode: {} at {}", mode, address),
        (mode, None) => warn!("Network mode: {} (no address)", mode),
    }
}
