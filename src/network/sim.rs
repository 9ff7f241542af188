//! Simulated radio for host builds and tests

use crate::config::SimulationConfig;
use crate::network::radio::WifiRadio;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use pixel_commander_shared::state_machine::ApSecurity;
use std::net::Ipv4Addr;
use tokio::time::Instant;
use tracing::debug;

/// Radio whose join and access point behaviour comes from configuration
pub struct SimulatedRadio {
    config: SimulationConfig,
    join_started: Option<Instant>,
    hosting: Option<ApSecurity>,
    ap_attempts: Vec<ApSecurity>,
}

impl SimulatedRadio {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            join_started: None,
            hosting: None,
            ap_attempts: Vec::new(),
        }
    }

    /// Access point starts attempted so far, in order
    #[cfg(test)]
    pub fn ap_attempts(&self) -> &[ApSecurity] {
        &self.ap_attempts
    }

    fn joined(&self) -> bool {
        match (self.join_started, self.config.station_join_after) {
            (Some(started), Some(after)) => started.elapsed() >= after,
            _ => false,
        }
    }
}

#[async_trait]
impl WifiRadio for SimulatedRadio {
    async fn begin_station(&mut self, name: &str, _credential: &str) -> Result<()> {
        debug!("[SIM] station join to '{}' started", name);
        self.join_started = Some(Instant::now());
        Ok(())
    }

    async fn is_station_connected(&mut self) -> bool {
        self.joined()
    }

    async fn start_access_point(&mut self, name: &str, credential: Option<&str>) -> Result<()> {
        let security = if credential.is_some() {
            ApSecurity::Protected
        } else {
            ApSecurity::Open
        };
        self.ap_attempts.push(security);
        debug!("[SIM] access point attempt {} ({:?})", self.ap_attempts.len(), security);

        let fails = match security {
            ApSecurity::Protected => self.config.protected_ap_fails,
            ApSecurity::Open => self.config.open_ap_fails,
        };
        if fails {
            return Err(anyhow!("simulated {:?} access point '{}' failed to start", security, name));
        }

        debug!("[SIM] {:?} access point '{}' up", security, name);
        self.hosting = Some(security);
        Ok(())
    }

    fn station_address(&self) -> Option<Ipv4Addr> {
        self.joined().then_some(self.config.station_address)
    }

    fn access_point_address(&self) -> Option<Ipv4Addr> {
        self.hosting.map(|_| self.config.ap_address)
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}
