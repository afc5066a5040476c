use std::time::Duration;

use time::OffsetDateTime;
use tokio::time::{MissedTickBehavior, interval};
use tracing::info;

use crate::{
    services::sse_events,
    state::{SharedState, countdown::tick},
};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Recompute the countdown every second and broadcast it when it changes.
///
/// Runs until aborted by [`crate::state::AppState::teardown`].
pub async fn run(state: SharedState) {
    let target = state.countdown_target();
    let mut ticker = interval(TICK_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut announced_finish = false;

    loop {
        ticker.tick().await;
        let next = tick(OffsetDateTime::now_utc(), target);
        if state.publish_countdown(next) {
            sse_events::broadcast_countdown(&state, next);
        }
        if next.is_finished() && !announced_finish {
            announced_finish = true;
            info!(%target, "countdown reached the event");
        }
    }
}
