use serde::{Deserialize, Serialize};
use time::UtcOffset;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{dto::validation::validate_alias_input, state::roster::PlayerEntry};

/// Roster entry as broadcast over SSE.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub nickname: String,
    /// Milliseconds since the Unix epoch.
    pub joined_at: i64,
    /// Join time of day, `hh:mm AM/PM`.
    pub joined_time: String,
}

impl PlayerSummary {
    pub fn new(entry: &PlayerEntry, offset: UtcOffset) -> Self {
        Self {
            id: entry.id.clone(),
            nickname: entry.nickname.clone(),
            joined_at: entry.joined_at,
            joined_time: super::format_time_of_day(entry.joined_at, offset),
        }
    }
}

/// One row of the roster table.
#[derive(Debug, Serialize, ToSchema)]
pub struct RosterRow {
    /// 1-based position by join time.
    pub rank: usize,
    #[serde(flatten)]
    pub player: PlayerSummary,
    /// Whether this row is the requesting visitor's current alias.
    pub is_current: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RosterResponse {
    pub players: Vec<RosterRow>,
    pub count: usize,
}

impl RosterResponse {
    /// Build the table, highlighting `current_alias` when given.
    pub fn new(roster: &[PlayerEntry], offset: UtcOffset, current_alias: Option<&str>) -> Self {
        let players: Vec<RosterRow> = roster
            .iter()
            .enumerate()
            .map(|(index, entry)| RosterRow {
                rank: index + 1,
                player: PlayerSummary::new(entry, offset),
                is_current: current_alias.is_some_and(|alias| alias == entry.nickname),
            })
            .collect();
        Self {
            count: players.len(),
            players,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RosterQuery {
    /// Visitor whose alias should be highlighted.
    pub visitor: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinRequest {
    /// Raw alias as typed; surrounding whitespace is trimmed.
    pub alias: String,
}

impl Validate for JoinRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validate_alias_input(&self.alias) {
            errors.add("alias", e);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JoinResponse {
    pub player: PlayerSummary,
    pub session: super::session::SessionResponse,
}
