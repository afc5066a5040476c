//! Visitor sessions: persisted gate flags plus cosmetic view toggles.

use dashmap::DashMap;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::dao::preferences::{
    KEY_CURRENT_ALIAS, KEY_HAS_JOINED, KEY_PASSWORD_ACCEPTED, PreferenceStore, VisitorPreferences,
};

const TRUE: &str = "true";

/// Persisted state of one visitor, independent from the roster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub current_alias: Option<String>,
    pub has_joined: bool,
    pub password_accepted: bool,
}

impl SessionState {
    pub fn from_preferences(preferences: &VisitorPreferences) -> Self {
        let flag = |key: &str| preferences.get(key).is_some_and(|value| value == TRUE);
        Self {
            current_alias: preferences
                .get(KEY_CURRENT_ALIAS)
                .filter(|alias| !alias.is_empty())
                .cloned(),
            has_joined: flag(KEY_HAS_JOINED),
            password_accepted: flag(KEY_PASSWORD_ACCEPTED),
        }
    }
}

/// Cosmetic toggles that only live as long as the process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewFlags {
    pub poster_visible: bool,
    pub role_revealed: bool,
    pub burning: bool,
    /// Number of keys of the reveal sequence matched so far.
    pub sequence_progress: usize,
}

/// Fixed key sequence unlocking the hidden role panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySequence {
    steps: Vec<String>,
}

impl KeySequence {
    pub fn new(steps: Vec<String>) -> Self {
        Self { steps }
    }

    /// The classic up-up-down-down-left-right-left-right-b-a sequence.
    pub fn konami() -> Self {
        Self::new(
            [
                "ArrowUp",
                "ArrowUp",
                "ArrowDown",
                "ArrowDown",
                "ArrowLeft",
                "ArrowRight",
                "ArrowLeft",
                "ArrowRight",
                "b",
                "a",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn matches(&self, index: usize, key: &str) -> bool {
        self.steps
            .get(index)
            .is_some_and(|step| step.eq_ignore_ascii_case(key))
    }

    /// Feed one key press. Returns the new progress, or `None` when the
    /// sequence was just completed.
    pub fn advance(&self, progress: usize, key: &str) -> Option<usize> {
        if self.is_empty() {
            return Some(0);
        }

        let next = if self.matches(progress, key) {
            progress + 1
        } else {
            // Longest prefix of the sequence that still ends the keys seen so far.
            let mut fallback = progress.min(self.len());
            while fallback > 0 {
                let prefix_ok = (0..fallback - 1).all(|i| {
                    self.steps[progress + 1 - fallback + i].eq_ignore_ascii_case(&self.steps[i])
                });
                if prefix_ok && self.matches(fallback - 1, key) {
                    break;
                }
                fallback -= 1;
            }
            fallback
        };

        if next == self.len() { None } else { Some(next) }
    }
}

/// Registry of visitor sessions backed by the preference store.
pub struct SessionRegistry {
    preferences: PreferenceStore,
    views: DashMap<Uuid, ViewFlags>,
    burns: DashMap<Uuid, JoinHandle<()>>,
}

impl SessionRegistry {
    pub fn new(preferences: PreferenceStore) -> Self {
        Self {
            preferences,
            views: DashMap::new(),
            burns: DashMap::new(),
        }
    }

    /// Issue a fresh visitor identifier with empty preferences.
    pub fn create(&self) -> Uuid {
        let visitor = Uuid::new_v4();
        self.preferences.register(visitor);
        self.views.insert(visitor, ViewFlags::default());
        visitor
    }

    /// Persisted state of `visitor`, `None` for unknown visitors.
    pub fn session(&self, visitor: Uuid) -> Option<SessionState> {
        self.preferences
            .snapshot(visitor)
            .map(|prefs| SessionState::from_preferences(&prefs))
    }

    pub fn view(&self, visitor: Uuid) -> ViewFlags {
        self.views
            .get(&visitor)
            .map(|flags| flags.clone())
            .unwrap_or_default()
    }

    pub async fn accept_password(&self, visitor: Uuid) {
        self.preferences
            .set(visitor, KEY_PASSWORD_ACCEPTED, TRUE)
            .await;
    }

    /// Record a successful join. Leaves the password flag alone.
    pub async fn record_join(&self, visitor: Uuid, alias: &str) {
        self.preferences
            .set_many(
                visitor,
                &[
                    (KEY_CURRENT_ALIAS, alias.to_string()),
                    (KEY_HAS_JOINED, TRUE.to_string()),
                ],
            )
            .await;
    }

    /// Forget the alias so the visitor can pick another one.
    pub async fn forget_alias(&self, visitor: Uuid) {
        self.preferences
            .remove_many(visitor, &[KEY_CURRENT_ALIAS, KEY_HAS_JOINED])
            .await;
    }

    /// Flip the poster panel, returning the new visibility.
    pub fn toggle_poster(&self, visitor: Uuid) -> bool {
        let mut flags = self.views.entry(visitor).or_default();
        flags.poster_visible = !flags.poster_visible;
        flags.poster_visible
    }

    /// Feed a key press to the reveal detector, returning whether the role is revealed.
    pub fn press_key(&self, visitor: Uuid, key: &str, sequence: &KeySequence) -> bool {
        let mut flags = self.views.entry(visitor).or_default();
        match sequence.advance(flags.sequence_progress, key) {
            Some(progress) => flags.sequence_progress = progress,
            None => {
                flags.sequence_progress = 0;
                flags.role_revealed = true;
            }
        }
        flags.role_revealed
    }

    /// Mark a burn as pending. Returns `false` when one already is.
    pub fn start_burn(&self, visitor: Uuid) -> bool {
        let mut flags = self.views.entry(visitor).or_default();
        if flags.burning {
            return false;
        }
        flags.burning = true;
        true
    }

    /// Keep the handle of the delayed wipe scheduled for `visitor`.
    pub fn track_burn(&self, visitor: Uuid, task: JoinHandle<()>) {
        if let Some(previous) = self.burns.insert(visitor, task) {
            previous.abort();
        }
    }

    pub fn pending_burns(&self) -> usize {
        self.burns.iter().filter(|task| !task.is_finished()).count()
    }

    /// Abort every scheduled wipe, returning how many were still pending.
    pub fn cancel_burns(&self) -> usize {
        let visitors: Vec<Uuid> = self.burns.iter().map(|task| *task.key()).collect();
        let mut cancelled = 0;
        for visitor in visitors {
            if let Some((_, task)) = self.burns.remove(&visitor) {
                if !task.is_finished() {
                    cancelled += 1;
                }
                task.abort();
            }
        }
        cancelled
    }

    /// Wipe every piece of local state held for `visitor`.
    pub async fn reset(&self, visitor: Uuid) {
        self.burns.remove(&visitor);
        self.views.insert(visitor, ViewFlags::default());
        self.preferences.clear(visitor).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press_all(sequence: &KeySequence, keys: &[&str]) -> (usize, bool) {
        let mut progress = 0;
        for key in keys {
            match sequence.advance(progress, key) {
                Some(next) => progress = next,
                None => return (0, true),
            }
        }
        (progress, false)
    }

    #[test]
    fn konami_unlocks_only_when_complete() {
        let konami = KeySequence::konami();
        let full = [
            "ArrowUp",
            "ArrowUp",
            "ArrowDown",
            "ArrowDown",
            "ArrowLeft",
            "ArrowRight",
            "ArrowLeft",
            "ArrowRight",
            "B",
            "a",
        ];
        assert_eq!(press_all(&konami, &full), (0, true));
        assert_eq!(press_all(&konami, &full[..9]), (9, false));
    }

    #[test]
    fn extra_leading_key_does_not_break_the_sequence() {
        let konami = KeySequence::konami();
        let keys = [
            "ArrowUp",
            "ArrowUp",
            "ArrowUp",
            "ArrowDown",
            "ArrowDown",
            "ArrowLeft",
            "ArrowRight",
            "ArrowLeft",
            "ArrowRight",
            "b",
            "a",
        ];
        assert_eq!(press_all(&konami, &keys), (0, true));
    }

    #[test]
    fn wrong_key_restarts() {
        let konami = KeySequence::konami();
        assert_eq!(press_all(&konami, &["ArrowUp", "ArrowUp", "x"]), (0, false));
        assert_eq!(press_all(&konami, &["ArrowUp", "x", "ArrowUp"]), (1, false));
    }

    #[test]
    fn session_flags_decode_from_preferences() {
        let mut prefs = VisitorPreferences::new();
        assert_eq!(SessionState::from_preferences(&prefs), SessionState::default());

        prefs.insert(KEY_PASSWORD_ACCEPTED.into(), "true".into());
        prefs.insert(KEY_CURRENT_ALIAS.into(), "Vito".into());
        prefs.insert(KEY_HAS_JOINED.into(), "true".into());
        assert_eq!(
            SessionState::from_preferences(&prefs),
            SessionState {
                current_alias: Some("Vito".into()),
                has_joined: true,
                password_accepted: true,
            }
        );
    }

    #[tokio::test]
    async fn change_alias_keeps_gate_flag() {
        let registry = SessionRegistry::new(PreferenceStore::in_memory());
        let visitor = registry.create();
        registry.accept_password(visitor).await;
        registry.record_join(visitor, "Vito").await;
        registry.forget_alias(visitor).await;

        let session = registry.session(visitor).unwrap();
        assert!(session.password_accepted);
        assert!(!session.has_joined);
        assert_eq!(session.current_alias, None);
    }

    #[tokio::test]
    async fn reset_wipes_preferences_and_view() {
        let registry = SessionRegistry::new(PreferenceStore::in_memory());
        let visitor = registry.create();
        registry.accept_password(visitor).await;
        registry.toggle_poster(visitor);
        assert!(registry.start_burn(visitor));
        assert!(!registry.start_burn(visitor));

        registry.reset(visitor).await;
        assert_eq!(registry.session(visitor), Some(SessionState::default()));
        assert_eq!(registry.view(visitor), ViewFlags::default());
    }
}
