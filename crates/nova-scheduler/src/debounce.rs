//! Per-key debounced job scheduling, used to coalesce rapid-fire
//! `didChange` notifications for the same file before kicking off
//! diagnostics or re-indexing.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{PoolKind, Scheduler};

/// Coalesces repeated [`debounce`](Self::debounce) calls for the same key:
/// only the most recent job scheduled within `delay` of the previous one for
/// that key actually runs.
pub struct KeyedDebouncer {
    scheduler: Scheduler,
    pool: PoolKind,
    delay: Duration,
    pending: Mutex<HashMap<String, CancellationToken>>,
}

/// Handle returned by [`KeyedDebouncer::debounce`]; reflects whether this
/// specific scheduling has since been superseded by a later call for the
/// same key.
pub struct DebounceHandle {
    token: CancellationToken,
}

impl DebounceHandle {
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl KeyedDebouncer {
    pub fn new(scheduler: Scheduler, pool: PoolKind, delay: Duration) -> Self {
        Self {
            scheduler,
            pool,
            delay,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Schedule `job` to run after the debounce delay, cancelling any job
    /// previously scheduled under the same `key` that hasn't run yet.
    pub fn debounce<F, E>(&self, key: impl Into<String>, job: F) -> DebounceHandle
    where
        F: FnOnce(CancellationToken) -> Result<(), E> + Send + 'static,
        E: Send + 'static,
    {
        let key = key.into();
        let token = CancellationToken::new();

        {
            let mut pending = self.pending.lock();
            if let Some(previous) = pending.insert(key.clone(), token.clone()) {
                previous.cancel();
            }
        }

        let delay = self.delay;
        let fire_token = token.clone();
        let run = {
            let pool = self.pool;
            let scheduler = self.scheduler.clone();
            move || match pool {
                PoolKind::Compute => {
                    scheduler.spawn_compute_with_token(fire_token, move |token| {
                        let _ = job(token);
                    });
                }
                PoolKind::Io => {
                    scheduler.spawn_io_with_token(fire_token, move |token| async move {
                        let _ = job(token);
                    });
                }
            }
        };

        let watch_token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !watch_token.is_cancelled() {
                run();
            }
        });

        DebounceHandle { token }
    }
}
