use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::validation::validate_key_name,
    state::{
        gate::GatePhase,
        session::{SessionState, ViewFlags},
    },
};

/// Gate phase as exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VisibleGatePhase {
    /// Passcode prompt.
    Locked,
    /// Join form.
    Gated,
    /// Welcome panel.
    Joined,
}

impl From<&GatePhase> for VisibleGatePhase {
    fn from(phase: &GatePhase) -> Self {
        match phase {
            GatePhase::Locked => VisibleGatePhase::Locked,
            GatePhase::Gated => VisibleGatePhase::Gated,
            GatePhase::Joined { .. } => VisibleGatePhase::Joined,
        }
    }
}

/// Everything the page needs to render one visitor's panels.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub visitor_id: Uuid,
    pub phase: VisibleGatePhase,
    pub current_alias: Option<String>,
    pub has_joined: bool,
    pub password_accepted: bool,
    pub poster_visible: bool,
    /// Hidden role text, present once the reveal sequence was typed.
    pub role: Option<String>,
    /// A burn is pending; local state is wiped once it fires.
    pub burning: bool,
}

impl SessionResponse {
    pub fn new(
        visitor_id: Uuid,
        phase: &GatePhase,
        session: SessionState,
        view: &ViewFlags,
        role: &str,
    ) -> Self {
        Self {
            visitor_id,
            phase: phase.into(),
            current_alias: session.current_alias,
            has_joined: session.has_joined,
            password_accepted: session.password_accepted,
            poster_visible: view.poster_visible,
            role: view.role_revealed.then(|| role.to_string()),
            burning: view.burning,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PasswordRequest {
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct KeyPressRequest {
    /// Key name as reported by the browser (`ArrowUp`, `b`, ...).
    pub key: String,
}

impl Validate for KeyPressRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validate_key_name(&self.key) {
            errors.add("key", e);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Acknowledges a scheduled burn.
#[derive(Debug, Serialize, ToSchema)]
pub struct BurnResponse {
    /// Delay before local state is wiped.
    pub burn_in_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_only_shown_once_revealed() {
        let session = SessionState {
            current_alias: Some("Vito".into()),
            has_joined: true,
            password_accepted: true,
        };
        let phase = GatePhase::Joined {
            alias: "Vito".into(),
        };
        let mut view = ViewFlags::default();

        let hidden = SessionResponse::new(Uuid::nil(), &phase, session.clone(), &view, "Don");
        assert_eq!(hidden.phase, VisibleGatePhase::Joined);
        assert_eq!(hidden.role, None);

        view.role_revealed = true;
        let shown = SessionResponse::new(Uuid::nil(), &phase, session, &view, "Don");
        assert_eq!(shown.role.as_deref(), Some("Don"));
    }
}
