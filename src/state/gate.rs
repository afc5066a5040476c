//! Visitor gate state machine: `Locked` -> `Gated` -> `Joined`.

use thiserror::Error;

use crate::state::session::SessionState;

/// Number of decimal digits a passcode must have.
pub const PASSCODE_DIGITS: usize = 6;

/// Phase a visitor is in, derived from their persisted session flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatePhase {
    /// Password not yet accepted.
    Locked,
    /// Password accepted (or no gate configured), alias not chosen yet.
    Gated,
    /// Alias chosen and recorded on the roster.
    Joined { alias: String },
}

/// Events that move a visitor through the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateEvent {
    /// Visitor typed a passcode.
    SubmitPassword(String),
    /// Join controller accepted the alias.
    Join { alias: String },
    /// Visitor asked to pick another alias.
    ChangeAlias,
    /// Local state wiped by the burn action.
    Burn,
}

/// Error returned when an event cannot be applied from the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    pub from: GatePhase,
    pub event: GateEvent,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("The Family does not recognise that code.")]
    InvalidPassword,
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

/// Whether `input` has the shape of a passcode: exactly six ASCII digits.
pub fn passcode_accepted(input: &str) -> bool {
    input.len() == PASSCODE_DIGITS && input.bytes().all(|b| b.is_ascii_digit())
}

impl GatePhase {
    /// Initial phase for a visitor, derived from persisted flags.
    ///
    /// Without a configured gate nobody is ever `Locked`.
    pub fn derive(session: &SessionState, gate_enabled: bool) -> Self {
        if gate_enabled && !session.password_accepted {
            return GatePhase::Locked;
        }
        match (&session.current_alias, session.has_joined) {
            (Some(alias), true) => GatePhase::Joined {
                alias: alias.clone(),
            },
            _ => GatePhase::Gated,
        }
    }

    /// Compute the phase reached by applying `event`. Never mutates `self`.
    pub fn apply(&self, event: GateEvent, gate_enabled: bool) -> Result<GatePhase, GateError> {
        match (self, event) {
            (GatePhase::Locked, GateEvent::SubmitPassword(input)) => {
                if passcode_accepted(&input) {
                    Ok(GatePhase::Gated)
                } else {
                    Err(GateError::InvalidPassword)
                }
            }
            (GatePhase::Gated, GateEvent::Join { alias }) => Ok(GatePhase::Joined { alias }),
            (GatePhase::Joined { .. }, GateEvent::ChangeAlias) => Ok(GatePhase::Gated),
            (_, GateEvent::Burn) => Ok(if gate_enabled {
                GatePhase::Locked
            } else {
                GatePhase::Gated
            }),
            (from, event) => Err(InvalidTransition {
                from: from.clone(),
                event,
            }
            .into()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GatePhase::Locked => "locked",
            GatePhase::Gated => "gated",
            GatePhase::Joined { .. } => "joined",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(phase: &GatePhase, event: GateEvent) -> GatePhase {
        phase.apply(event, true).unwrap()
    }

    #[test]
    fn passcode_shape() {
        assert!(passcode_accepted("123456"));
        assert!(passcode_accepted("000000"));
        assert!(!passcode_accepted("12345"));
        assert!(!passcode_accepted("1234567"));
        assert!(!passcode_accepted("abcdef"));
        assert!(!passcode_accepted("12 456"));
        assert!(!passcode_accepted("١٢٣٤٥٦"));
    }

    #[test]
    fn full_happy_path() {
        let locked = GatePhase::Locked;
        let gated = apply(&locked, GateEvent::SubmitPassword("123456".into()));
        assert_eq!(gated, GatePhase::Gated);
        let joined = apply(
            &gated,
            GateEvent::Join {
                alias: "Vito".into(),
            },
        );
        assert_eq!(
            joined,
            GatePhase::Joined {
                alias: "Vito".into()
            }
        );
        assert_eq!(apply(&joined, GateEvent::ChangeAlias), GatePhase::Gated);
    }

    #[test]
    fn wrong_passcode_stays_locked() {
        let err = GatePhase::Locked
            .apply(GateEvent::SubmitPassword("abcdef".into()), true)
            .unwrap_err();
        assert_eq!(err, GateError::InvalidPassword);
    }

    #[test]
    fn join_requires_the_gate() {
        let err = GatePhase::Locked
            .apply(
                GateEvent::Join {
                    alias: "Vito".into(),
                },
                true,
            )
            .unwrap_err();
        match err {
            GateError::InvalidTransition(InvalidTransition { from, .. }) => {
                assert_eq!(from, GatePhase::Locked)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn burn_returns_to_start_from_anywhere() {
        for phase in [
            GatePhase::Locked,
            GatePhase::Gated,
            GatePhase::Joined {
                alias: "Vito".into(),
            },
        ] {
            assert_eq!(phase.apply(GateEvent::Burn, true).unwrap(), GatePhase::Locked);
            assert_eq!(phase.apply(GateEvent::Burn, false).unwrap(), GatePhase::Gated);
        }
    }

    #[test]
    fn derive_from_persisted_flags() {
        let mut session = SessionState::default();
        assert_eq!(GatePhase::derive(&session, true), GatePhase::Locked);
        assert_eq!(GatePhase::derive(&session, false), GatePhase::Gated);

        session.password_accepted = true;
        assert_eq!(GatePhase::derive(&session, true), GatePhase::Gated);

        session.current_alias = Some("Vito".into());
        session.has_joined = true;
        assert_eq!(
            GatePhase::derive(&session, true),
            GatePhase::Joined {
                alias: "Vito".into()
            }
        );
    }
}
