use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Agent lifecycle state.
///
/// ```text
/// Created -> Initialized -> Running <-> Stopped
///                              |           |
///                              +--> Shutdown <--+
/// ```
///
/// `Shutdown` is reachable from every state and is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Created,
    Initialized,
    Running,
    Stopped,
    Shutdown,
}

/// Lifecycle requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Init,
    Start,
    Stop,
    Shutdown,
}

impl AgentState {
    /// Apply a transition, returning the new state or an error naming the
    /// states the transition is valid from.
    pub fn apply(&self, transition: Transition) -> Result<AgentState, Error> {
        match (self, transition) {
            (AgentState::Created, Transition::Init) => Ok(AgentState::Initialized),

            (AgentState::Initialized, Transition::Start) => Ok(AgentState::Running),
            (AgentState::Stopped, Transition::Start) => Ok(AgentState::Running),

            (AgentState::Running, Transition::Stop) => Ok(AgentState::Stopped),
            // Already stopped
            (AgentState::Stopped, Transition::Stop) => Ok(AgentState::Stopped),

            (AgentState::Shutdown, Transition::Shutdown) => Ok(AgentState::Shutdown),
            (AgentState::Shutdown, _) => Err(Error::AgentState {
                expected: transition.valid_from().to_string(),
                actual: "shut down".to_string(),
            }),
            (_, Transition::Shutdown) => Ok(AgentState::Shutdown),

            _ => Err(Error::AgentState {
                expected: transition.valid_from().to_string(),
                actual: self.label().to_string(),
            }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentState::Shutdown)
    }

    /// Requests are only served while running.
    pub fn is_serving(&self) -> bool {
        matches!(self, AgentState::Running)
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgentState::Created => "created",
            AgentState::Initialized => "initialized",
            AgentState::Running => "running",
            AgentState::Stopped => "stopped",
            AgentState::Shutdown => "shutdown",
        }
    }
}

impl Transition {
    /// The states this transition may be applied in, for error messages.
    pub fn valid_from(&self) -> &'static str {
        match self {
            Transition::Init => "created",
            Transition::Start => "initialized or stopped",
            Transition::Stop => "running or stopped",
            Transition::Shutdown => "any state",
        }
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transition::Init => write!(f, "Init"),
            Transition::Start => write!(f, "Start"),
            Transition::Stop => write!(f, "Stop"),
            Transition::Shutdown => write!(f, "Shutdown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Forward path ----

    #[test]
    fn created_to_initialized() {
        let next = AgentState::Created.apply(Transition::Init).unwrap();
        assert_eq!(next, AgentState::Initialized);
    }

    #[test]
    fn initialized_to_running() {
        let next = AgentState::Initialized.apply(Transition::Start).unwrap();
        assert_eq!(next, AgentState::Running);
        assert!(next.is_serving());
    }

    #[test]
    fn running_stop_start_cycle() {
        let stopped = AgentState::Running.apply(Transition::Stop).unwrap();
        assert_eq!(stopped, AgentState::Stopped);
        assert!(!stopped.is_serving());
        let running = stopped.apply(Transition::Start).unwrap();
        assert_eq!(running, AgentState::Running);
    }

    #[test]
    fn stop_is_idempotent() {
        let next = AgentState::Stopped.apply(Transition::Stop).unwrap();
        assert_eq!(next, AgentState::Stopped);
    }

    // ---- Invalid transitions ----

    #[test]
    fn created_rejects_start() {
        let err = AgentState::Created.apply(Transition::Start).unwrap_err();
        assert!(err.to_string().contains("initialized or stopped"));
        assert!(err.to_string().contains("created"));
    }

    #[test]
    fn init_only_once() {
        assert!(AgentState::Initialized.apply(Transition::Init).is_err());
        assert!(AgentState::Running.apply(Transition::Init).is_err());
    }

    #[test]
    fn created_rejects_stop() {
        assert!(AgentState::Created.apply(Transition::Stop).is_err());
    }

    // ---- Shutdown ----

    #[test]
    fn shutdown_from_every_state() {
        for state in [
            AgentState::Created,
            AgentState::Initialized,
            AgentState::Running,
            AgentState::Stopped,
            AgentState::Shutdown,
        ] {
            let next = state.apply(Transition::Shutdown).unwrap();
            assert!(next.is_terminal());
        }
    }

    #[test]
    fn shutdown_is_terminal() {
        for t in [Transition::Init, Transition::Start, Transition::Stop] {
            let err = AgentState::Shutdown.apply(t).unwrap_err();
            assert!(matches!(err, Error::AgentState { .. }));
        }
    }

    #[test]
    fn labels() {
        assert_eq!(AgentState::Running.to_string(), "running");
        assert_eq!(Transition::Start.to_string(), "Start");
    }
}
