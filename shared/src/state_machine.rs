//! Network bring-up state machine
//!
//! Station join first; on timeout a self-hosted access point, protected when
//! the credential allows it, degrading once to an open access point.

/// Security of a self-hosted access point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApSecurity {
    /// WPA2 with the configured credential
    Protected,
    /// No password
    Open,
}

/// Bring-up states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BringupState {
    /// Nothing attempted yet
    Idle,
    /// Waiting for the station join to complete
    Joining,
    /// Joined an existing network as a client
    Station,
    /// Starting a password-protected access point
    StartingProtectedAp,
    /// Starting an open access point
    StartingOpenAp,
    /// Hosting an access point
    AccessPoint(ApSecurity),
    /// Every option failed; the device likely has no usable network
    Unreachable,
}

impl BringupState {
    /// True once no further events are expected
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BringupState::Station | BringupState::AccessPoint(_) | BringupState::Unreachable
        )
    }
}

/// Events that drive bring-up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BringupEvent {
    /// Station join started
    Begin,
    /// Station reported connected
    StationJoined,
    /// Station join timed out; `protected_allowed` when the credential is
    /// long enough for WPA2
    StationTimedOut { protected_allowed: bool },
    /// Access point start succeeded
    ApStarted,
    /// Access point start failed
    ApFailed,
}

/// Result of a transition attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition was valid and state changed
    Success(BringupState),
    /// Transition was invalid from current state
    Invalid { from: BringupState, event: BringupEvent },
}

#[derive(Debug)]
pub struct BringupStateMachine {
    current_state: BringupState,
}

impl Default for BringupStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl BringupStateMachine {
    pub fn new() -> Self {
        Self {
            current_state: BringupState::Idle,
        }
    }

    pub fn state(&self) -> BringupState {
        self.current_state
    }

    /// Process an event and return the transition result
    pub fn process_event(&mut self, event: BringupEvent) -> TransitionResult {
        match self.get_next_state(&event) {
            Some(state) => {
                self.current_state = state;
                TransitionResult::Success(state)
            }
            None => TransitionResult::Invalid {
                from: self.current_state,
                event,
            },
        }
    }

    fn get_next_state(&self, event: &BringupEvent) -> Option<BringupState> {
        use BringupEvent::*;
        use BringupState::*;

        match (self.current_state, event) {
            (Idle, Begin) => Some(Joining),

            (Joining, StationJoined) => Some(Station),
            (Joining, StationTimedOut { protected_allowed: true }) => Some(StartingProtectedAp),
            (Joining, StationTimedOut { protected_allowed: false }) => Some(StartingOpenAp),

            (StartingProtectedAp, ApStarted) => Some(AccessPoint(ApSecurity::Protected)),
            // Degrade once to an open network
            (StartingProtectedAp, ApFailed) => Some(StartingOpenAp),

            (StartingOpenAp, ApStarted) => Some(AccessPoint(ApSecurity::Open)),
            (StartingOpenAp, ApFailed) => Some(Unreachable),

            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joining() -> BringupStateMachine {
        let mut fsm = BringupStateMachine::new();
        fsm.process_event(BringupEvent::Begin);
        fsm
    }

    #[test]
    fn test_initial_state() {
        let fsm = BringupStateMachine::new();
        assert_eq!(fsm.state(), BringupState::Idle);
        assert!(!fsm.state().is_terminal());
    }

    #[test]
    fn test_station_join() {
        let mut fsm = joining();
        let result = fsm.process_event(BringupEvent::StationJoined);
        assert_eq!(result, TransitionResult::Success(BringupState::Station));
        assert!(fsm.state().is_terminal());
    }

    #[test]
    fn test_protected_then_open_fallback() {
        let mut fsm = joining();
        fsm.process_event(BringupEvent::StationTimedOut {
            protected_allowed: true,
        });
        assert_eq!(fsm.state(), BringupState::StartingProtectedAp);

        fsm.process_event(BringupEvent::ApFailed);
        assert_eq!(fsm.state(), BringupState::StartingOpenAp);

        fsm.process_event(BringupEvent::ApStarted);
        assert_eq!(fsm.state(), BringupState::AccessPoint(ApSecurity::Open));
    }

    #[test]
    fn test_short_credential_skips_protected() {
        let mut fsm = joining();
        fsm.process_event(BringupEvent::StationTimedOut {
            protected_allowed: false,
        });
        assert_eq!(fsm.state(), BringupState::StartingOpenAp);
    }

    #[test]
    fn test_open_failure_is_unreachable() {
        let mut fsm = joining();
        fsm.process_event(BringupEvent::StationTimedOut {
            protected_allowed: false,
        });
        let result = fsm.process_event(BringupEvent::ApFailed);
        assert_eq!(result, TransitionResult::Success(BringupState::Unreachable));
        assert!(fsm.state().is_terminal());
    }

    #[test]
    fn test_invalid_transition() {
        let mut fsm = BringupStateMachine::new();

        // Can't join before beginning
        let result = fsm.process_event(BringupEvent::StationJoined);
        assert!(matches!(result, TransitionResult::Invalid { .. }));
        assert_eq!(fsm.state(), BringupState::Idle);

        // Only one degrade step: an open AP failure does not loop back
        let mut fsm = joining();
        fsm.process_event(BringupEvent::StationJoined);
        let result = fsm.process_event(BringupEvent::ApFailed);
        assert!(matches!(result, TransitionResult::Invalid { .. }));
        assert_eq!(fsm.state(), BringupState::Station);
    }
}
