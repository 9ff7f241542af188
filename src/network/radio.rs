//! Radio trait abstraction for pluggable wireless backends

use anyhow::Result;
use async_trait::async_trait;
use std::net::Ipv4Addr;

/// A wireless radio that can join a network or host one
#[async_trait]
pub trait WifiRadio: Send {
    /// Start joining `name` as a station; completion is observed by polling
    async fn begin_station(&mut self, name: &str, credential: &str) -> Result<()>;

    /// Whether the station join has completed
    async fn is_station_connected(&mut self) -> bool;

    /// Host an access point; `credential` of `None` starts an open network
    async fn start_access_point(&mut self, name: &str, credential: Option<&str>) -> Result<()>;

    /// Address leased while joined as a station
    fn station_address(&self) -> Option<Ipv4Addr>;

    /// Address of the hosted access point
    fn access_point_address(&self) -> Option<Ipv4Addr>;

    /// Human-readable name for this radio
    fn name(&self) -> &'static str;
}
