//! Controller configuration

use pixel_commander_shared::limits;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;

/// Invalid configuration, reported at startup
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("pixel count must be at least 1")]
    NoPixels,

    #[error("queue capacity must be at least 2, got {0}")]
    QueueTooSmall(usize),

    #[error("commands per tick must be at least 1")]
    EmptyBatch,

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Behaviour of the simulated radio used on host builds
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Station join completes after this delay; `None` never joins
    pub station_join_after: Option<Duration>,
    /// Protected access point start fails
    pub protected_ap_fails: bool,
    /// Open access point start fails
    pub open_ap_fails: bool,
    /// Address leased when joined as a station
    pub station_address: Ipv4Addr,
    /// Address of the self-hosted access point
    pub ap_address: Ipv4Addr,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            station_join_after: None,
            protected_ap_fails: false,
            open_ap_fails: false,
            station_address: Ipv4Addr::new(192, 168, 1, 50),
            ap_address: Ipv4Addr::new(192, 168, 4, 1),
        }
    }
}

/// Construction-time configuration for the controller
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Network name for station join and for the fallback access point
    pub network_name: String,
    /// Network credential; shorter than 8 bytes forces an open access point
    pub network_credential: String,
    /// Pixel-driver data pin
    pub pin: u8,
    /// Number of pixels on the strip
    pub pixel_count: u16,
    /// Brightness applied once after startup
    pub initial_brightness: Option<u8>,
    /// Station join timeout
    pub connect_timeout: Duration,
    /// HTTP / WebSocket listen address
    pub listen_addr: SocketAddr,
    /// Command queue slots (one is held back)
    pub queue_capacity: usize,
    /// Commands applied per scheduler tick
    pub commands_per_tick: usize,
    /// Scheduler period
    pub tick_interval: Duration,
    /// Simulated radio behaviour
    pub simulation: SimulationConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            network_name: "pixel-commander".into(),
            network_credential: String::new(),
            pin: 5,
            pixel_count: 64,
            initial_brightness: None,
            connect_timeout: Duration::from_millis(limits::CONNECT_TIMEOUT_MS),
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 80)),
            queue_capacity: limits::QUEUE_CAPACITY,
            commands_per_tick: limits::COMMANDS_PER_TICK,
            tick_interval: Duration::from_millis(5),
            simulation: SimulationConfig::default(),
        }
    }
}

impl ControllerConfig {
    /// Defaults overridden by `PIXEL_*` environment variables, validated
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(name) = lookup("PIXEL_SSID") {
            config.network_name = name;
        }
        if let Some(credential) = lookup("PIXEL_PASSWORD") {
            config.network_credential = credential;
        }
        if let Some(value) = lookup("PIXEL_COUNT") {
            config.pixel_count = parse("PIXEL_COUNT", value)?;
        }
        if let Some(value) = lookup("PIXEL_PIN") {
            config.pin = parse("PIXEL_PIN", value)?;
        }
        if let Some(value) = lookup("PIXEL_BRIGHTNESS") {
            config.initial_brightness = Some(parse("PIXEL_BRIGHTNESS", value)?);
        }
        if let Some(value) = lookup("PIXEL_CONNECT_TIMEOUT_MS") {
            config.connect_timeout = Duration::from_millis(parse("PIXEL_CONNECT_TIMEOUT_MS", value)?);
        }
        if let Some(value) = lookup("PIXEL_LISTEN") {
            config.listen_addr = parse("PIXEL_LISTEN", value)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pixel_count == 0 {
            return Err(ConfigError::NoPixels);
        }
        if self.queue_capacity < 2 {
            return Err(ConfigError::QueueTooSmall(self.queue_capacity));
        }
        if self.commands_per_tick == 0 {
            return Err(ConfigError::EmptyBatch);
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(15));
        assert_eq!(config.queue_capacity, 512);
        assert_eq!(config.commands_per_tick, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = ControllerConfig::from_lookup(lookup(&[
            ("PIXEL_SSID", "attic"),
            ("PIXEL_PASSWORD", "hunter22"),
            ("PIXEL_COUNT", "150"),
            ("PIXEL_BRIGHTNESS", "40"),
            ("PIXEL_LISTEN", "127.0.0.1:8080"),
        ]))
        .unwrap();
        assert_eq!(config.network_name, "attic");
        assert_eq!(config.network_credential, "hunter22");
        assert_eq!(config.pixel_count, 150);
        assert_eq!(config.initial_brightness, Some(40));
        assert_eq!(config.listen_addr.port(), 8080);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = ControllerConfig::from_lookup(lookup(&[("PIXEL_COUNT", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: "PIXEL_COUNT", .. }));

        let err = ControllerConfig::from_lookup(lookup(&[("PIXEL_COUNT", "0")])).unwrap_err();
        assert_eq!(err, ConfigError::NoPixels);

        let config = ControllerConfig {
            queue_capacity: 1,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::QueueTooSmall(1)));
    }
}
