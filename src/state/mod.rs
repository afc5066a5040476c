pub mod countdown;
pub mod gate;
pub mod join;
pub mod roster;
pub mod session;
mod sse;

use std::{
    sync::{Arc, Mutex as StdMutex},
    time::Duration,
};

use time::OffsetDateTime;
use tokio::{
    sync::{Mutex, MutexGuard, watch},
    task::JoinHandle,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{preferences::PreferenceStore, roster_store::RosterStore, storage::StorageResult},
    error::ServiceError,
    services::{countdown_service, sse_events, storage_supervisor},
};

pub use self::sse::SseHub;
use self::{
    countdown::{CountdownState, tick},
    gate::GatePhase,
    roster::{Roster, RosterView},
    session::{SessionRegistry, SessionState},
};

pub type SharedState = Arc<AppState>;

const SSE_CAPACITY: usize = 32;

/// Central application state: configuration, roster mirror, visitor sessions
/// and the background tasks feeding the SSE stream.
///
/// Lifecycle: [`AppState::new`] opens the roster subscription,
/// [`AppState::spawn_background`] starts the countdown ticker and the storage
/// health monitor, [`AppState::teardown`] cancels all of them, along with any
/// scheduled burn, exactly once.
pub struct AppState {
    config: AppConfig,
    target: OffsetDateTime,
    store: Arc<dyn RosterStore>,
    offline_fallback: bool,
    roster: RosterView,
    sessions: SessionRegistry,
    countdown: watch::Sender<CountdownState>,
    sse: SseHub,
    degraded: watch::Sender<bool>,
    join_gate: Mutex<()>,
    background: StdMutex<Vec<JoinHandle<()>>>,
}

impl AppState {
    /// Construct the shared state and open the live roster subscription.
    ///
    /// `offline_fallback` marks a store that only stands in for an unreachable
    /// remote backend; the state then stays degraded.
    pub async fn new(
        config: AppConfig,
        target: OffsetDateTime,
        store: Arc<dyn RosterStore>,
        preferences: PreferenceStore,
        offline_fallback: bool,
    ) -> StorageResult<SharedState> {
        let sse = SseHub::new(SSE_CAPACITY);
        let offset = config.utc_offset();

        let hub = sse.clone();
        let roster = RosterView::open(
            store.as_ref(),
            Box::new(move |roster: &Roster| sse_events::broadcast_roster(&hub, roster, offset)),
        )
        .await?;

        let (countdown, _rx) = watch::channel(tick(OffsetDateTime::now_utc(), target));
        let (degraded, _rx) = watch::channel(offline_fallback);

        Ok(Arc::new(Self {
            config,
            target,
            store,
            offline_fallback,
            roster,
            sessions: SessionRegistry::new(preferences),
            countdown,
            sse,
            degraded,
            join_gate: Mutex::new(()),
            background: StdMutex::new(Vec::new()),
        }))
    }

    /// Start the countdown ticker and storage health monitor.
    pub fn spawn_background(self: &Arc<Self>) {
        let ticker = tokio::spawn(countdown_service::run(self.clone()));
        let monitor = tokio::spawn(storage_supervisor::monitor(self.clone()));
        self.with_background(|tasks| tasks.extend([ticker, monitor]));
    }

    /// Cancel background tasks and pending burns, then release the roster subscription.
    pub fn teardown(&self) {
        let tasks = self.with_background(std::mem::take);
        for task in &tasks {
            task.abort();
        }
        let burns = self.sessions.cancel_burns();
        let released = self.roster.teardown();
        if released || !tasks.is_empty() || burns > 0 {
            info!(tasks = tasks.len(), burns, "application state torn down");
        }
    }

    fn with_background<T>(&self, f: impl FnOnce(&mut Vec<JoinHandle<()>>) -> T) -> T {
        match self.background.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Instant the countdown runs towards, computed once at startup.
    pub fn countdown_target(&self) -> OffsetDateTime {
        self.target
    }

    pub fn store(&self) -> &Arc<dyn RosterStore> {
        &self.store
    }

    pub fn roster(&self) -> &RosterView {
        &self.roster
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn public_sse(&self) -> &SseHub {
        &self.sse
    }

    /// Latest countdown value published by the ticker.
    pub fn countdown(&self) -> CountdownState {
        *self.countdown.borrow()
    }

    /// Replace the countdown value, returning whether it changed.
    pub fn publish_countdown(&self, next: CountdownState) -> bool {
        self.countdown.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        })
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Record the outcome of a storage health check. A fallback store keeps the
    /// state degraded regardless.
    pub fn update_degraded(&self, healthy: bool) {
        let value = self.offline_fallback || !healthy;
        let changed = self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
        if changed {
            sse_events::broadcast_status(self);
        }
    }

    /// Serializes join validation and the roster write within this process.
    pub async fn join_gate(&self) -> MutexGuard<'_, ()> {
        self.join_gate.lock().await
    }

    /// Persisted session of `visitor`, or `NotFound`.
    pub fn require_session(&self, visitor: Uuid) -> Result<SessionState, ServiceError> {
        self.sessions
            .session(visitor)
            .ok_or_else(|| ServiceError::NotFound(format!("unknown visitor {visitor}")))
    }

    /// Gate phase of `visitor`, derived from persisted flags.
    pub fn gate_phase(&self, session: &SessionState) -> GatePhase {
        GatePhase::derive(session, self.config.password_gate())
    }

    /// Wait until the roster view reflects `predicate`, logging when it does not in time.
    pub async fn settle_roster<F>(&self, limit: Duration, predicate: F) -> bool
    where
        F: FnMut(&[roster::PlayerEntry]) -> bool,
    {
        let settled = self.roster.wait_until(limit, predicate).await;
        if !settled {
            debug!(?limit, "roster view did not settle in time");
        }
        settled
    }
}

impl Drop for AppState {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::roster_store::memory::MemoryRosterStore;

    async fn state(offline_fallback: bool) -> SharedState {
        let config = AppConfig::default();
        let target = OffsetDateTime::now_utc() + time::Duration::hours(1);
        AppState::new(
            config,
            target,
            Arc::new(MemoryRosterStore::new()),
            PreferenceStore::in_memory(),
            offline_fallback,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn countdown_is_published_on_change_only() {
        let state = state(false).await;
        let mut events = state.public_sse().subscribe();
        let next = CountdownState {
            days: 0,
            hours: 0,
            minutes: 0,
            seconds: 7,
        };

        assert!(state.publish_countdown(next));
        assert!(!state.publish_countdown(next));
        assert_eq!(state.countdown(), next);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn degraded_flag_follows_health_and_broadcasts_changes() {
        let state = state(false).await;
        let mut events = state.public_sse().subscribe();

        state.update_degraded(true);
        assert!(events.try_recv().is_err());

        state.update_degraded(false);
        assert!(state.is_degraded());
        let status = events.try_recv().unwrap();
        assert_eq!(status.event.as_deref(), Some("status"));
        assert!(status.data.contains("\"degraded\":true"));

        state.update_degraded(true);
        assert!(!state.is_degraded());
        assert!(events.try_recv().is_ok());
    }

    #[tokio::test]
    async fn fallback_store_stays_degraded() {
        let state = state(true).await;
        assert!(state.is_degraded());
        state.update_degraded(true);
        assert!(state.is_degraded());
    }

    #[tokio::test]
    async fn teardown_cancels_a_pending_burn() {
        let config = AppConfig::default()
            .with_password_gate(false)
            .with_burn_delay(Duration::from_millis(50));
        let target = OffsetDateTime::now_utc() + time::Duration::hours(1);
        let state = AppState::new(
            config,
            target,
            Arc::new(MemoryRosterStore::new()),
            PreferenceStore::in_memory(),
            false,
        )
        .await
        .unwrap();
        let visitor = state.sessions().create();

        crate::services::session_service::burn(&state, visitor).unwrap();
        assert_eq!(state.sessions().pending_burns(), 1);
        assert_eq!(Arc::strong_count(&state), 1);

        state.teardown();
        assert_eq!(state.sessions().pending_burns(), 0);

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(state.sessions().view(visitor).burning);
    }

    #[tokio::test]
    async fn teardown_stops_background_tasks() {
        let state = state(false).await;
        state.spawn_background();
        state.teardown();
        state.teardown();
        assert!(!state.roster().teardown());
    }
}
