use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

#[cfg(feature = "couch-store")]
use crate::dao::roster_store::couchdb::{CouchConfig, CouchRosterStore};
use crate::{
    config::AppConfig,
    dao::{
        roster_store::{BackendKind, RosterStore, local::LocalRosterStore, memory::MemoryRosterStore},
        storage::{StorageError, StorageResult},
    },
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_CONNECT_ATTEMPTS: u32 = 3;

/// Open the configured roster backend.
///
/// Returns the store and whether it is an offline stand-in for an unreachable
/// remote backend. Only the local fallback itself failing is fatal.
pub async fn connect_roster_store(
    config: &AppConfig,
) -> StorageResult<(Arc<dyn RosterStore>, bool)> {
    match config.roster_backend() {
        BackendKind::Memory => {
            info!("using in-process roster store");
            Ok((Arc::new(MemoryRosterStore::new()), false))
        }
        BackendKind::Local => Ok((open_local(config).await?, false)),
        BackendKind::CouchDb => connect_remote(config).await,
    }
}

#[cfg(feature = "couch-store")]
async fn connect_remote(config: &AppConfig) -> StorageResult<(Arc<dyn RosterStore>, bool)> {
    let remote = match CouchConfig::from_env() {
        Ok(couch) => {
            retry_with_backoff(MAX_CONNECT_ATTEMPTS, INITIAL_DELAY, || {
                CouchRosterStore::connect(couch.clone())
            })
            .await
        }
        Err(err) => Err(err),
    };

    match remote {
        Ok(store) => {
            info!("connected to CouchDB roster store");
            Ok((Arc::new(store), false))
        }
        Err(err) => {
            warn!(error = %err, "CouchDB unreachable; falling back to the local roster (degraded mode)");
            Ok((open_local(config).await?, true))
        }
    }
}

#[cfg(not(feature = "couch-store"))]
async fn connect_remote(config: &AppConfig) -> StorageResult<(Arc<dyn RosterStore>, bool)> {
    warn!("built without CouchDB support; falling back to the local roster (degraded mode)");
    Ok((open_local(config).await?, true))
}

async fn open_local(config: &AppConfig) -> StorageResult<Arc<dyn RosterStore>> {
    let path = config.local_roster_path();
    let store = LocalRosterStore::open(path).await?;
    info!(path = %path.display(), "using local roster file");
    Ok(Arc::new(store))
}

/// Call `connect` up to `attempts` times, doubling the pause between failures.
pub async fn retry_with_backoff<T, E, F, Fut>(
    attempts: u32,
    initial_delay: Duration,
    mut connect: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = initial_delay;
    let mut attempt = 1;

    loop {
        match connect().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= attempts => return Err(err),
            Err(err) => {
                warn!(attempt, error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
                attempt += 1;
            }
        }
    }
}

/// Poll the active store and keep the shared degraded flag current.
///
/// Runs until aborted by [`crate::state::AppState::teardown`].
pub async fn monitor(state: SharedState) {
    loop {
        let healthy = match state.store().health_check().await {
            Ok(()) => true,
            Err(err) => {
                log_unhealthy(&state, &err);
                false
            }
        };

        let was_degraded = state.is_degraded();
        state.update_degraded(healthy);
        if was_degraded && !state.is_degraded() {
            info!("storage healthy again; leaving degraded mode");
        }

        sleep(HEALTH_POLL_INTERVAL).await;
    }
}

fn log_unhealthy(state: &SharedState, err: &StorageError) {
    if state.is_degraded() {
        warn!(error = %err, "storage health check still failing");
    } else {
        warn!(error = %err, "storage health check failed; entering degraded mode");
    }
}
