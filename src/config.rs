//! Application-level configuration loading: event details, gate options and roster backend.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use time::{OffsetDateTime, UtcOffset};
use tracing::{info, warn};

use crate::{
    dao::roster_store::BackendKind,
    state::{
        countdown::{ScheduleError, event_target, parse_offset},
        session::KeySequence,
    },
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "FAMILY_SUMMONS_CONFIG_PATH";
const DEFAULT_LOCAL_ROSTER_PATH: &str = "data/roster.json";
const DEFAULT_BURN_DELAY_MS: u64 = 3_000;
const DEFAULT_REVEAL_ROLE: &str = "You are the Don. The table answers to you.";

/// Static event details shown on the invitation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDetails {
    /// Day of the event, `DD.MM.YYYY`.
    pub date: String,
    /// Start time, `HH:MM`.
    pub time: String,
    pub location: String,
    pub dress_code: String,
    pub rules: Vec<String>,
}

impl Default for EventDetails {
    fn default() -> Self {
        Self {
            date: "10.12.2025".into(),
            time: "20:00".into(),
            location: "Filip Micevski's Town".into(),
            dress_code: "Sharp suits, dark colors, fedoras optional".into(),
            rules: vec![
                "Arrive on time - the Family waits for no one".into(),
                "Keep your identity secret until the game begins".into(),
                "No phones during the game - full immersion required".into(),
                "Respect the Don's decisions - they are final".into(),
            ],
        }
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    event: EventDetails,
    utc_offset: UtcOffset,
    password_gate: bool,
    burn_delay: Duration,
    reveal_sequence: KeySequence,
    reveal_role: String,
    roster_backend: BackendKind,
    local_roster_path: PathBuf,
    preferences_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to the built-in invitation.
    ///
    /// Call before the async runtime starts worker threads: resolving the host's
    /// local offset is refused once the process is multi-threaded.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        backend = %config.roster_backend,
                        "loaded invitation config"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a JSON configuration document. Missing fields take their defaults.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    pub fn event(&self) -> &EventDetails {
        &self.event
    }

    /// Offset used to interpret the event date/time and to display join times.
    pub fn utc_offset(&self) -> UtcOffset {
        self.utc_offset
    }

    pub fn password_gate(&self) -> bool {
        self.password_gate
    }

    pub fn burn_delay(&self) -> Duration {
        self.burn_delay
    }

    pub fn reveal_sequence(&self) -> &KeySequence {
        &self.reveal_sequence
    }

    pub fn reveal_role(&self) -> &str {
        &self.reveal_role
    }

    pub fn roster_backend(&self) -> BackendKind {
        self.roster_backend
    }

    pub fn local_roster_path(&self) -> &PathBuf {
        &self.local_roster_path
    }

    pub fn preferences_path(&self) -> Option<&PathBuf> {
        self.preferences_path.as_ref()
    }

    /// Instant the countdown runs towards.
    pub fn countdown_target(&self) -> Result<OffsetDateTime, ScheduleError> {
        event_target(&self.event.date, &self.event.time, self.utc_offset)
    }

    pub fn with_password_gate(mut self, enabled: bool) -> Self {
        self.password_gate = enabled;
        self
    }

    pub fn with_burn_delay(mut self, delay: Duration) -> Self {
        self.burn_delay = delay;
        self
    }

    pub fn with_utc_offset(mut self, offset: UtcOffset) -> Self {
        self.utc_offset = offset;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    event: RawEvent,
    utc_offset: Option<String>,
    password_gate: Option<bool>,
    burn_delay_ms: Option<u64>,
    reveal_sequence: Option<Vec<String>>,
    reveal_role: Option<String>,
    roster_backend: Option<BackendKind>,
    local_roster_path: Option<PathBuf>,
    preferences_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the `event` section. Absent fields keep the built-in text.
struct RawEvent {
    date: Option<String>,
    time: Option<String>,
    location: Option<String>,
    dress_code: Option<String>,
    rules: Option<Vec<String>>,
}

impl From<RawEvent> for EventDetails {
    fn from(value: RawEvent) -> Self {
        let defaults = EventDetails::default();
        Self {
            date: value.date.unwrap_or(defaults.date),
            time: value.time.unwrap_or(defaults.time),
            location: value.location.unwrap_or(defaults.location),
            dress_code: value.dress_code.unwrap_or(defaults.dress_code),
            rules: value.rules.unwrap_or(defaults.rules),
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            event: value.event.into(),
            utc_offset: resolve_offset(value.utc_offset.as_deref()),
            password_gate: value.password_gate.unwrap_or(true),
            burn_delay: Duration::from_millis(value.burn_delay_ms.unwrap_or(DEFAULT_BURN_DELAY_MS)),
            reveal_sequence: value
                .reveal_sequence
                .filter(|steps| !steps.is_empty())
                .map(KeySequence::new)
                .unwrap_or_else(KeySequence::konami),
            reveal_role: value
                .reveal_role
                .unwrap_or_else(|| DEFAULT_REVEAL_ROLE.to_string()),
            roster_backend: value.roster_backend.unwrap_or(BackendKind::Memory),
            local_roster_path: value
                .local_roster_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCAL_ROSTER_PATH)),
            preferences_path: value.preferences_path,
        }
    }
}

/// Use the configured offset, else the host's local offset, else UTC.
fn resolve_offset(configured: Option<&str>) -> UtcOffset {
    if let Some(raw) = configured {
        match parse_offset(raw) {
            Ok(offset) => return offset,
            Err(err) => warn!(error = %err, "ignoring configured utc_offset"),
        }
    }

    UtcOffset::current_local_offset().unwrap_or_else(|err| {
        warn!(error = %err, "local UTC offset unavailable; using UTC");
        UtcOffset::UTC
    })
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
