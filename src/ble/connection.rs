//! Per-device connection state machine.
//!
//! State changes are driven only by the radio driver's state tokens
//! (`STATE_CONNECTED`, `STATE_DISCONNECTED`, ...). Requests from the caller
//! never move the state locally.

use tracing::{debug, trace};

/// Connection state for a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConnectionState {
    /// Nothing reported yet, or an unrecognized token.
    #[default]
    Unknown,
    /// Currently attempting to connect.
    Connecting,
    /// Connected to the device.
    Connected,
    /// Currently disconnecting.
    Disconnecting,
    /// Not connected to the device.
    Disconnected,
}

impl ConnectionState {
    /// Token prefix used by radio drivers.
    pub const TOKEN_PREFIX: &'static str = "STATE_";

    /// Parse a state token.
    ///
    /// The `STATE_` prefix is optional and case is ignored. Unrecognized
    /// tokens map to [`ConnectionState::Unknown`].
    pub fn from_token(token: &str) -> Self {
        let token = token.trim();
        let name = match token.get(..Self::TOKEN_PREFIX.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(Self::TOKEN_PREFIX) => {
                &token[Self::TOKEN_PREFIX.len()..]
            }
            _ => token,
        };

        match name.to_ascii_uppercase().as_str() {
            "CONNECTING" => Self::Connecting,
            "CONNECTED" => Self::Connected,
            "DISCONNECTING" => Self::Disconnecting,
            "DISCONNECTED" => Self::Disconnected,
            _ => Self::Unknown,
        }
    }

    /// The driver token for this state.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Unknown => "STATE_UNKNOWN",
            Self::Connecting => "STATE_CONNECTING",
            Self::Connected => "STATE_CONNECTED",
            Self::Disconnecting => "STATE_DISCONNECTING",
            Self::Disconnected => "STATE_DISCONNECTED",
        }
    }

    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if in a transitional state.
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Connecting | Self::Disconnecting)
    }

    /// Check if a connect request would change anything.
    pub fn can_connect(&self) -> bool {
        !matches!(self, Self::Connecting | Self::Connected)
    }

    /// Check if a disconnect request would change anything.
    pub fn can_disconnect(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "Unknown"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Disconnecting => write!(f, "Disconnecting"),
            Self::Disconnected => write!(f, "Disconnected"),
        }
    }
}

/// A single state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// State before the change.
    pub from: ConnectionState,
    /// State after the change.
    pub to: ConnectionState,
}

/// Outcome of applying a state token.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateUpdate {
    /// Transitions taken, in order. Empty if the state did not change.
    pub transitions: Vec<Transition>,
    /// The device just became connected: its profiles must be cleared and
    /// service discovery started.
    pub rediscover: bool,
}

impl StateUpdate {
    /// Check if the state changed.
    pub fn changed(&self) -> bool {
        !self.transitions.is_empty()
    }
}

/// Connection state machine for one device.
///
/// `Connected` is only ever entered from `Connecting`; a driver reporting
/// `Connected` directly produces an implicit `Connecting` step first.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConnectionStateMachine {
    state: ConnectionState,
}

impl ConnectionStateMachine {
    /// Create a machine in the `Unknown` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Apply a driver state token.
    pub fn apply_token(&mut self, token: &str) -> StateUpdate {
        let target = ConnectionState::from_token(token);
        if target == ConnectionState::Unknown {
            debug!("Unrecognized state token {:?}", token);
        }
        self.apply(target)
    }

    /// Move to `target`.
    pub fn apply(&mut self, target: ConnectionState) -> StateUpdate {
        let mut update = StateUpdate::default();
        if target == self.state {
            trace!("State already {}", target);
            return update;
        }

        if target == ConnectionState::Connected && self.state != ConnectionState::Connecting {
            update.transitions.push(self.step(ConnectionState::Connecting));
        }
        update.transitions.push(self.step(target));
        update.rediscover = target == ConnectionState::Connected;

        update
    }

    fn step(&mut self, to: ConnectionState) -> Transition {
        let from = std::mem::replace(&mut self.state, to);
        debug!("Connection state changed: {} -> {}", from, to);
        Transition { from, to }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(from: ConnectionState, to: ConnectionState) -> Transition {
        Transition { from, to }
    }

    #[test]
    fn test_connection_state() {
        assert!(!ConnectionState::Disconnected.is_connected());
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());

        assert!(ConnectionState::Connecting.is_transitioning());
        assert!(ConnectionState::Disconnecting.is_transitioning());
        assert!(!ConnectionState::Connected.is_transitioning());

        assert!(ConnectionState::Unknown.can_connect());
        assert!(ConnectionState::Disconnected.can_connect());
        assert!(!ConnectionState::Connecting.can_connect());
        assert!(ConnectionState::Connected.can_disconnect());
        assert!(!ConnectionState::Disconnected.can_disconnect());
    }

    #[test]
    fn test_from_token() {
        use ConnectionState::*;
        assert_eq!(ConnectionState::from_token("STATE_CONNECTED"), Connected);
        assert_eq!(ConnectionState::from_token("state_connecting"), Connecting);
        assert_eq!(ConnectionState::from_token("DISCONNECTING"), Disconnecting);
        assert_eq!(ConnectionState::from_token("STATE_DISCONNECTED"), Disconnected);
        assert_eq!(ConnectionState::from_token("STATE_BONDED"), Unknown);
        assert_eq!(ConnectionState::from_token(""), Unknown);

        for state in [Unknown, Connecting, Connected, Disconnecting, Disconnected] {
            assert_eq!(ConnectionState::from_token(state.token()), state);
        }
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(format!("{}", ConnectionState::Connected), "Connected");
        assert_eq!(format!("{}", ConnectionState::Unknown), "Unknown");
    }

    #[test]
    fn test_connect_flow() {
        use ConnectionState::*;
        let mut machine = ConnectionStateMachine::new();
        assert_eq!(machine.state(), Unknown);

        let update = machine.apply_token("STATE_CONNECTING");
        assert_eq!(update.transitions, vec![t(Unknown, Connecting)]);
        assert!(!update.rediscover);

        let update = machine.apply_token("STATE_CONNECTED");
        assert_eq!(update.transitions, vec![t(Connecting, Connected)]);
        assert!(update.rediscover);

        // Repeated token is a no-op.
        let update = machine.apply_token("STATE_CONNECTED");
        assert!(!update.changed());
        assert!(!update.rediscover);
    }

    #[test]
    fn test_connected_always_passes_through_connecting() {
        use ConnectionState::*;
        let mut machine = ConnectionStateMachine::new();
        machine.apply(Disconnected);

        let update = machine.apply_token("STATE_CONNECTED");
        assert_eq!(
            update.transitions,
            vec![t(Disconnected, Connecting), t(Connecting, Connected)]
        );
        assert!(update.rediscover);
        assert_eq!(machine.state(), Connected);
    }

    #[test]
    fn test_reconnect_after_disconnect() {
        use ConnectionState::*;
        let mut machine = ConnectionStateMachine::new();
        machine.apply_token("STATE_CONNECTING");
        machine.apply_token("STATE_CONNECTED");
        machine.apply_token("STATE_DISCONNECTING");
        machine.apply_token("STATE_DISCONNECTED");
        assert_eq!(machine.state(), Disconnected);

        let update = machine.apply_token("STATE_CONNECTING");
        assert_eq!(update.transitions, vec![t(Disconnected, Connecting)]);
        assert!(machine.apply_token("STATE_CONNECTED").rediscover);
    }

    #[test]
    fn test_unknown_token() {
        use ConnectionState::*;
        let mut machine = ConnectionStateMachine::new();
        machine.apply_token("STATE_CONNECTING");

        let update = machine.apply_token("garbage");
        assert_eq!(update.transitions, vec![t(Connecting, Unknown)]);
        assert_eq!(machine.state(), Unknown);
    }
}
