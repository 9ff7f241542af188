//! Station join with staged access point fallback

use crate::network::radio::WifiRadio;
use pixel_commander_shared::{
    limits,
    state_machine::{ApSecurity, BringupEvent, BringupState, BringupStateMachine, TransitionResult},
};
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

/// How the device ended up on the network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkMode {
    /// Joined an existing network
    Station,
    /// Hosting its own network
    AccessPoint(ApSecurity),
    /// No usable network path
    Unreachable,
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkMode::Station => write!(f, "station"),
            NetworkMode::AccessPoint(ApSecurity::Protected) => write!(f, "access point (WPA2)"),
            NetworkMode::AccessPoint(ApSecurity::Open) => write!(f, "access point (open)"),
            NetworkMode::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// Result of bring-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BringupOutcome {
    pub mode: NetworkMode,
    pub address: Option<Ipv4Addr>,
}

/// Runs the one-time blocking connectivity phase
#[derive(Debug, Clone)]
pub struct NetworkBringup {
    poll_interval: Duration,
    settle_delay: Duration,
}

impl Default for NetworkBringup {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(limits::STATION_POLL_INTERVAL_MS),
            settle_delay: Duration::from_millis(limits::AP_SETTLE_MS),
        }
    }
}

impl NetworkBringup {
    /// Join `name` as a station, falling back to a self-hosted network after
    /// `timeout`. Never fails; total failure yields `NetworkMode::Unreachable`.
    pub async fn bring_up<R>(
        &self,
        radio: &mut R,
        name: &str,
        credential: &str,
        timeout: Duration,
    ) -> BringupOutcome
    where
        R: WifiRadio + ?Sized,
    {
        let mut fsm = BringupStateMachine::new();
        advance(&mut fsm, BringupEvent::Begin);

        info!("Trying station connect to '{}' via {} radio", name, radio.name());
        let started = Instant::now();

        match radio.begin_station(name, credential).await {
            Ok(()) => {
                if self.wait_for_station(radio, started + timeout).await {
                    advance(&mut fsm, BringupEvent::StationJoined);
                }
            }
            Err(e) => warn!("Station join could not start: {:#}", e),
        }

        if fsm.state() == BringupState::Joining {
            warn!(
                "Station connect failed after {} ms, starting access point '{}'",
                started.elapsed().as_millis(),
                name
            );
            let protected_allowed = credential.len() >= limits::MIN_PROTECTED_CREDENTIAL_LEN;
            if !protected_allowed {
                info!("Credential too short for WPA2, starting open access point");
            }
            advance(&mut fsm, BringupEvent::StationTimedOut { protected_allowed });
        }

        loop {
            match fsm.state() {
                BringupState::Station => {
                    let address = radio.station_address();
                    info!("Connected as station, address {}", display_addr(address));
                    return BringupOutcome {
                        mode: NetworkMode::Station,
                        address,
                    };
                }
                BringupState::StartingProtectedAp => {
                    let event = match radio.start_access_point(name, Some(credential)).await {
                        Ok(()) => BringupEvent::ApStarted,
                        Err(e) => {
                            warn!("Protected access point failed ({:#}), attempting open access point", e);
                            BringupEvent::ApFailed
                        }
                    };
                    advance(&mut fsm, event);
                }
                BringupState::StartingOpenAp => {
                    let event = match radio.start_access_point(name, None).await {
                        Ok(()) => BringupEvent::ApStarted,
                        Err(e) => {
                            error!("Open access point failed: {:#}", e);
                            BringupEvent::ApFailed
                        }
                    };
                    advance(&mut fsm, event);
                }
                BringupState::AccessPoint(security) => {
                    sleep(self.settle_delay).await;
                    let address = radio.access_point_address();
                    let mode = NetworkMode::AccessPoint(security);
                    info!("Access point active ({}), address {}", mode, display_addr(address));
                    return BringupOutcome { mode, address };
                }
                BringupState::Unreachable => {
                    error!("No network path available; device is likely unreachable, continuing startup");
                    return BringupOutcome {
                        mode: NetworkMode::Unreachable,
                        address: None,
                    };
                }
                BringupState::Idle | BringupState::Joining => {
                    // advance() only leaves these on a logic error
                    error!("Bring-up stalled in {:?}", fsm.state());
                    return BringupOutcome {
                        mode: NetworkMode::Unreachable,
                        address: None,
                    };
                }
            }
        }
    }

    /// Poll the station status until connected or `deadline` passes
    async fn wait_for_station<R>(&self, radio: &mut R, deadline: Instant) -> bool
    where
        R: WifiRadio + ?Sized,
    {
        loop {
            if radio.is_station_connected().await {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}

fn advance(fsm: &mut BringupStateMachine, event: BringupEvent) {
    match fsm.process_event(event) {
        TransitionResult::Success(state) => debug!("[BRINGUP] -> {:?}", state),
        TransitionResult::Invalid { from, event } => {
            warn!("[BRINGUP] ignored {:?} in {:?}", event, from)
        }
    }
}

fn display_addr(address: Option<Ipv4Addr>) -> String {
    address.map_or_else(|| "unassigned".into(), |a| a.to_string())
}
