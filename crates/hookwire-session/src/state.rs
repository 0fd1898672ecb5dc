// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session lifecycle states and the transitions allowed between them.

use serde::Serialize;

use hookwire_core::HookwireError;

/// Where a tenant session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No linked identity; the pairing channel is about to open.
    Unpaired,
    /// Connected to the service and waiting for a scan or linking code.
    AwaitingPairing,
    /// Linked identity exists; the connection is being opened.
    Connecting,
    /// Linked and connected.
    Connected,
    /// The controller has finished. Terminal.
    Terminated,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Unpaired => write!(f, "unpaired"),
            SessionState::AwaitingPairing => write!(f, "awaiting_pairing"),
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Connected => write!(f, "connected"),
            SessionState::Terminated => write!(f, "terminated"),
        }
    }
}

impl SessionState {
    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Unpaired, AwaitingPairing)
                | (Unpaired, Connecting)
                | (AwaitingPairing, Connected)
                | (Connecting, Connected)
                | (Connecting, AwaitingPairing)
                | (Unpaired | AwaitingPairing | Connecting | Connected, Terminated)
        )
    }

    /// Returns `next` if the transition is legal.
    pub fn transition(self, next: SessionState) -> Result<SessionState, HookwireError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(HookwireError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }

    /// Phone pairing is only meaningful before the device is linked.
    pub fn accepts_phone_pairing(self) -> bool {
        matches!(self, SessionState::Unpaired | SessionState::AwaitingPairing)
    }

    pub fn is_terminal(self) -> bool {
        self == SessionState::Terminated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionState::*;

    const ALL: [SessionState; 5] = [Unpaired, AwaitingPairing, Connecting, Connected, Terminated];

    #[test]
    fn allowed_transitions() {
        assert!(Unpaired.can_transition_to(AwaitingPairing));
        assert!(Unpaired.can_transition_to(Connecting));
        assert!(AwaitingPairing.can_transition_to(Connected));
        assert!(Connecting.can_transition_to(Connected));
        assert!(Connecting.can_transition_to(AwaitingPairing));
        for state in [Unpaired, AwaitingPairing, Connecting, Connected] {
            assert!(state.can_transition_to(Terminated), "{state} -> terminated");
        }
    }

    #[test]
    fn terminated_is_terminal() {
        for next in ALL {
            assert!(!Terminated.can_transition_to(next));
        }
    }

    #[test]
    fn rejected_transition_is_typed() {
        let err = Connected.transition(AwaitingPairing).unwrap_err();
        match err {
            HookwireError::InvalidTransition { from, to } => {
                assert_eq!(from, "connected");
                assert_eq!(to, "awaiting_pairing");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn exactly_nine_edges() {
        let edges = ALL
            .iter()
            .flat_map(|a| ALL.iter().map(move |b| (*a, *b)))
            .filter(|(a, b)| a.can_transition_to(*b))
            .count();
        assert_eq!(edges, 9);
    }
}
