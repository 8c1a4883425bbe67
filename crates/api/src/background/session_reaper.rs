//! Periodic cleanup of abandoned import sessions.
//!
//! Closes flows nobody has touched for longer than the configured TTL so
//! parsed files do not pile up in memory. Runs on a fixed interval using
//! `tokio::time::interval`.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::registry::SessionRegistry;

/// Upper bound on how often the reaper runs.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Run the reaper loop until `cancel` is triggered.
pub async fn run(registry: Arc<SessionRegistry>, ttl: Duration, cancel: CancellationToken) {
    let every = ttl.min(MAX_SWEEP_INTERVAL).max(Duration::from_secs(1));
    tracing::info!(
        ttl_secs = ttl.as_secs(),
        interval_secs = every.as_secs(),
        "Import session reaper started"
    );

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Import session reaper stopping");
                break;
            }
            _ = interval.tick() => {
                let removed = registry.reap_idle(ttl).await;
                if removed > 0 {
                    tracing::info!(removed, "Import session reaper: closed idle sessions");
                } else {
                    tracing::debug!("Import session reaper: nothing to close");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use painel_core::messages::Locale;
    use painel_db::models::media_item::MediaCollection;
    use painel_pipeline::ImportFlow;
    use uuid::Uuid;

    #[tokio::test(start_paused = true)]
    async fn sweeps_idle_sessions_and_stops_on_cancel() {
        let registry = Arc::new(SessionRegistry::new());
        registry
            .insert(ImportFlow::new(Uuid::new_v4(), Locale::En), MediaCollection::Games)
            .await;

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(
            Arc::clone(&registry),
            Duration::from_secs(5),
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(12)).await;
        assert!(registry.is_empty().await);

        cancel.cancel();
        task.await.unwrap();
    }
}
