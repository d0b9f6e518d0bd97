//! Background expiry sweep task.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::store::SessionStore;

/// Spawn a `tokio` task that calls [`SessionStore::sweep_expired`] every
/// `interval_secs`, independent of any single request's lifecycle. Aborting
/// the returned handle stops the sweep.
pub fn spawn_sweep_task(store: Arc<SessionStore>, interval_secs: u64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        loop {
            ticker.tick().await;
            let swept = store.sweep_expired().await;
            debug!(swept, "expiry sweep tick");
        }
    })
}
