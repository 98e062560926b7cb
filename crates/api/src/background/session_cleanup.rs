//! Periodic purge of expired and revoked refresh-token sessions.

use std::time::Duration;

use authapi_db::repositories::SessionRepo;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

/// Run one purge pass, logging the outcome. Returns the number of deleted rows.
pub async fn purge_once(pool: &PgPool) -> u64 {
    match SessionRepo::cleanup_expired(pool).await {
        Ok(deleted) => {
            if deleted > 0 {
                tracing::info!(deleted, "Session cleanup: purged stale sessions");
            } else {
                tracing::debug!("Session cleanup: nothing to purge");
            }
            deleted
        }
        Err(e) => {
            tracing::error!(error = %e, "Session cleanup failed");
            0
        }
    }
}

/// Purge stale sessions every `interval` until `cancel` is triggered.
///
/// The first pass runs immediately.
pub async fn run(pool: PgPool, interval: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = interval.as_secs(), "Session cleanup job started");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session cleanup job stopping");
                break;
            }
            _ = ticker.tick() => {
                purge_once(&pool).await;
            }
        }
    }
}
