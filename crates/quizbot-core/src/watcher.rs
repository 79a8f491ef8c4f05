//! Polls the bank source and reloads the question bank when it appears or changes.

use std::{sync::Arc, time::Duration, time::SystemTime};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::store::QuizStore;

/// Tracks the last seen modification time of the bank source.
#[derive(Clone, Debug, Default)]
pub struct ChangeTracker {
    last_modified: Option<SystemTime>,
    waiting_logged: bool,
}

impl ChangeTracker {
    /// Decide whether a reload is due.
    ///
    /// - not loaded yet and the source exists: load it;
    /// - loaded, first observation: remember the mtime without reloading;
    /// - loaded, mtime changed (an older one counts too): reload.
    pub fn should_reload(&mut self, modified: Option<SystemTime>, loaded: bool) -> bool {
        let Some(modified) = modified else {
            return false;
        };

        match self.last_modified {
            _ if !loaded => {
                self.last_modified = Some(modified);
                true
            }
            None => {
                self.last_modified = Some(modified);
                false
            }
            Some(prev) if modified != prev => {
                self.last_modified = Some(modified);
                true
            }
            Some(_) => false,
        }
    }
}

pub fn spawn(store: Arc<QuizStore>, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tracker = ChangeTracker::default();
        let mut tick = tokio::time::interval(interval);
        info!(source = %store.source().describe(), "question bank watcher started");

        loop {
            tokio::select! {
              _ = cancel.cancelled() => break,
              _ = tick.tick() => {
                let modified = store.source().modified();
                let loaded = store.is_loaded();

                if modified.is_none() && !loaded && !tracker.waiting_logged {
                  info!(source = %store.source().describe(), "waiting for question bank file");
                  tracker.waiting_logged = true;
                }

                if !tracker.should_reload(modified, loaded) {
                  continue;
                }

                // Give a writer a moment to finish the file.
                tokio::time::sleep(Duration::from_millis(100)).await;
                if store.load_from_source() {
                  info!("question bank reloaded after file change");
                  tracker.waiting_logged = false;
                } else {
                  warn!("question bank reload failed; keeping current bank");
                }
              }
            }
        }
        debug!("question bank watcher stopped");
    })
}
