//! Background reclamation of idle per-user state.

use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::store::QuizStore;

/// Every `interval`, drop users idle for at least `ttl`. Stops when `cancel` fires.
pub fn spawn(
    store: Arc<QuizStore>,
    ttl: Duration,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; nobody can be idle yet.
        tick.tick().await;

        debug!(?ttl, ?interval, "session reaper started");
        loop {
            tokio::select! {
              _ = cancel.cancelled() => break,
              _ = tick.tick() => {
                let removed = store.purge_idle(ttl);
                if removed > 0 {
                  info!(removed, remaining = store.user_count(), "expired idle user sessions");
                }
              }
            }
        }
        debug!("session reaper stopped");
    })
}
