//! Signer session state machine for one hardware-signed transaction
use crate::device::LedgerErrorCode;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    AwaitingDevice,
    Ready,
    Submitted,
    Error,
}

/// Inputs to [`SignerSession::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The hardware-tx flow was opened
    Enter { device_id: Option<String> },
    /// Success signal from the hardware-connect collaborator
    DeviceReady,
    /// Failure signal from the hardware-connect collaborator
    DeviceFailed(LedgerErrorCode),
    /// The flow was closed, successfully or not
    Exit,
}

/// Work the session owner must carry out after a transition.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    Submit,
    PersistTxError {
        value: bool,
    },
    ShowRecovery {
        error: LedgerErrorCode,
        device_id: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub session: SignerSession,
    /// States entered, in order. Empty when the event was ignored.
    pub path: Vec<SessionState>,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn ignored(session: &SignerSession) -> Self {
        Self {
            session: session.clone(),
            path: Vec::new(),
            effects: Vec::new(),
        }
    }

    pub fn is_ignored(&self) -> bool {
        self.path.is_empty()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SignerSession {
    pub state: SessionState,
    pub is_ready: bool,
    pub ready_for_polling: bool,
    pub last_error: Option<LedgerErrorCode>,
    pub device_id: Option<String>,
}

impl Default for SignerSession {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
            is_ready: false,
            ready_for_polling: true,
            last_error: None,
            device_id: None,
        }
    }
}

impl SignerSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }

    /// Compute the session that follows `event`, and the effects it implies.
    ///
    /// `self` is left untouched. A success signal runs the guarded
    /// `Ready -> Submitted` step in the same transition, so repeated success
    /// signals yield a single [`Effect::Submit`].
    pub fn apply(&self, event: SessionEvent) -> Transition {
        match (self.state, event) {
            (_, SessionEvent::Exit) => Transition {
                session: Self::default(),
                path: vec![SessionState::Idle],
                effects: vec![Effect::PersistTxError { value: false }],
            },

            (SessionState::Idle, SessionEvent::Enter { device_id }) => Transition {
                session: Self {
                    state: SessionState::AwaitingDevice,
                    ready_for_polling: true,
                    device_id,
                    ..Self::default()
                },
                path: vec![SessionState::AwaitingDevice],
                effects: Vec::new(),
            },

            (SessionState::AwaitingDevice | SessionState::Error, SessionEvent::DeviceReady)
                if !self.is_ready =>
            {
                Transition {
                    session: Self {
                        state: SessionState::Submitted,
                        is_ready: true,
                        ready_for_polling: false,
                        last_error: None,
                        device_id: self.device_id.clone(),
                    },
                    path: vec![SessionState::Ready, SessionState::Submitted],
                    // cleared first so a failed submit can set it again
                    effects: vec![Effect::PersistTxError { value: false }, Effect::Submit],
                }
            }

            (SessionState::AwaitingDevice | SessionState::Ready, SessionEvent::DeviceFailed(code)) => {
                let mut effects = vec![Effect::PersistTxError { value: true }];
                if code.shows_recovery() {
                    effects.push(Effect::ShowRecovery {
                        error: code,
                        device_id: self.device_id.clone(),
                    });
                }
                Transition {
                    session: Self {
                        state: SessionState::Error,
                        last_error: Some(code),
                        ..self.clone()
                    },
                    path: vec![SessionState::Error],
                    effects,
                }
            }

            // Repeated failures keep the session in Error and only update the code
            (SessionState::Error, SessionEvent::DeviceFailed(code)) => {
                let mut effects = Vec::new();
                if code.shows_recovery() && self.last_error != Some(code) {
                    effects.push(Effect::ShowRecovery {
                        error: code,
                        device_id: self.device_id.clone(),
                    });
                }
                Transition {
                    session: Self {
                        last_error: Some(code),
                        ..self.clone()
                    },
                    path: vec![SessionState::Error],
                    effects,
                }
            }

            _ => Transition::ignored(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entered() -> SignerSession {
        SignerSession::new()
            .apply(SessionEvent::Enter {
                device_id: Some("nano-x-1".to_string()),
            })
            .session
    }

    fn reachable_sessions() -> Vec<SignerSession> {
        let idle = SignerSession::new();
        let awaiting = entered();
        let submitted = awaiting.apply(SessionEvent::DeviceReady).session;
        let errored = awaiting
            .apply(SessionEvent::DeviceFailed(LedgerErrorCode::OffOrLocked))
            .session;
        let silent = awaiting
            .apply(SessionEvent::DeviceFailed(LedgerErrorCode::Unknown))
            .session;
        let recovered = errored.apply(SessionEvent::DeviceReady).session;
        vec![idle, awaiting, submitted, errored, silent, recovered]
    }

    #[test]
    fn test_initial_session() {
        let session = SignerSession::new();
        assert_eq!(session.state, SessionState::Idle);
        assert!(!session.is_ready);
        assert!(session.ready_for_polling);
        assert_eq!(session.last_error, None);
        assert_eq!(session.device_id, None);
        assert!(session.is_idle());
    }

    #[test]
    fn test_idle_only_reaches_awaiting_device() {
        let idle = SignerSession::new();
        for event in [
            SessionEvent::DeviceReady,
            SessionEvent::DeviceFailed(LedgerErrorCode::NoEthApp),
        ] {
            let transition = idle.apply(event);
            assert!(transition.is_ignored());
            assert_eq!(transition.session, idle);
            assert!(transition.effects.is_empty());
        }

        let transition = idle.apply(SessionEvent::Enter {
            device_id: Some("nano-x-1".to_string()),
        });
        assert_eq!(transition.path, vec![SessionState::AwaitingDevice]);
        assert!(transition.session.ready_for_polling);
        assert_eq!(transition.session.device_id.as_deref(), Some("nano-x-1"));
    }

    #[test]
    fn test_enter_is_ignored_outside_idle() {
        let awaiting = entered();
        let transition = awaiting.apply(SessionEvent::Enter { device_id: None });
        assert!(transition.is_ignored());
        assert_eq!(transition.session.device_id.as_deref(), Some("nano-x-1"));
    }

    #[test]
    fn test_success_submits_through_ready() {
        let transition = entered().apply(SessionEvent::DeviceReady);
        assert_eq!(
            transition.path,
            vec![SessionState::Ready, SessionState::Submitted]
        );
        assert_eq!(
            transition.effects,
            vec![Effect::PersistTxError { value: false }, Effect::Submit]
        );
        let session = transition.session;
        assert_eq!(session.state, SessionState::Submitted);
        assert!(session.is_ready);
        assert!(!session.ready_for_polling);
    }

    #[test]
    fn test_duplicate_success_submits_once() {
        let mut session = entered();
        let mut submits = 0;
        for _ in 0..3 {
            let transition = session.apply(SessionEvent::DeviceReady);
            submits += transition
                .effects
                .iter()
                .filter(|e| **e == Effect::Submit)
                .count();
            session = transition.session;
        }
        assert_eq!(submits, 1);
        assert_eq!(session.state, SessionState::Submitted);
    }

    #[test]
    fn test_apply_does_not_mutate() {
        let session = entered();
        let snapshot = session.clone();
        let _ = session.apply(SessionEvent::DeviceReady);
        assert_eq!(session, snapshot);
    }

    #[test]
    fn test_visible_failures_route_to_recovery() {
        for code in [LedgerErrorCode::NoEthApp, LedgerErrorCode::OffOrLocked] {
            let transition = entered().apply(SessionEvent::DeviceFailed(code));
            assert_eq!(transition.session.state, SessionState::Error);
            assert_eq!(transition.session.last_error, Some(code));
            assert!(transition.session.ready_for_polling);
            assert_eq!(
                transition.effects,
                vec![
                    Effect::PersistTxError { value: true },
                    Effect::ShowRecovery {
                        error: code,
                        device_id: Some("nano-x-1".to_string()),
                    },
                ]
            );
        }
    }

    #[test]
    fn test_other_failures_are_silent() {
        for code in [LedgerErrorCode::Disconnected, LedgerErrorCode::Unknown] {
            let transition = entered().apply(SessionEvent::DeviceFailed(code));
            assert_eq!(transition.session.state, SessionState::Error);
            assert_eq!(
                transition.effects,
                vec![Effect::PersistTxError { value: true }]
            );
        }
    }

    #[test]
    fn test_repeated_failure_shows_recovery_once() {
        let errored = entered()
            .apply(SessionEvent::DeviceFailed(LedgerErrorCode::NoEthApp))
            .session;
        let again = errored.apply(SessionEvent::DeviceFailed(LedgerErrorCode::NoEthApp));
        assert!(again.effects.is_empty());

        let locked = errored.apply(SessionEvent::DeviceFailed(LedgerErrorCode::OffOrLocked));
        assert_eq!(locked.session.last_error, Some(LedgerErrorCode::OffOrLocked));
        assert_eq!(locked.effects.len(), 1);
    }

    #[test]
    fn test_recovery_after_error_submits() {
        let errored = entered()
            .apply(SessionEvent::DeviceFailed(LedgerErrorCode::OffOrLocked))
            .session;
        let transition = errored.apply(SessionEvent::DeviceReady);
        assert_eq!(transition.session.state, SessionState::Submitted);
        assert_eq!(transition.session.last_error, None);
        assert!(transition.effects.contains(&Effect::Submit));
    }

    #[test]
    fn test_failure_after_submit_is_ignored() {
        let submitted = entered().apply(SessionEvent::DeviceReady).session;
        let transition = submitted.apply(SessionEvent::DeviceFailed(LedgerErrorCode::NoEthApp));
        assert!(transition.is_ignored());
        assert_eq!(transition.session.state, SessionState::Submitted);
    }

    #[test]
    fn test_exit_resets_every_reachable_state() {
        for session in reachable_sessions() {
            let transition = session.apply(SessionEvent::Exit);
            let reset = transition.session;
            assert_eq!(reset.state, SessionState::Idle);
            assert!(!reset.is_ready);
            assert!(reset.ready_for_polling);
            assert_eq!(reset.last_error, None);
            assert_eq!(reset.device_id, None);
            assert_eq!(
                transition.effects,
                vec![Effect::PersistTxError { value: false }]
            );
        }
    }

    #[test]
    fn test_reenter_after_exit() {
        let errored = entered()
            .apply(SessionEvent::DeviceFailed(LedgerErrorCode::Unknown))
            .session;
        let idle = errored.apply(SessionEvent::Exit).session;
        let transition = idle.apply(SessionEvent::Enter {
            device_id: Some("nano-x-2".to_string()),
        });
        assert_eq!(transition.session.state, SessionState::AwaitingDevice);
        assert_eq!(transition.session.last_error, None);
    }
}
