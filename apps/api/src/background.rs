//! Timer-driven maintenance. Each timer runs independently; backups only
//! run when an interval is configured.
//!
//! Every sweep is advisory. Failures are logged and the next tick runs as
//! usual.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::state::AppState;

/// Spawns one task per enabled timer.
pub fn spawn_all(state: &AppState, config: &Config) -> Vec<JoinHandle<()>> {
    let mut handles = vec![
        spawn_every(config.prediction_interval, {
            let state = state.clone();
            move || predict_and_prefetch(state.clone())
        }),
        spawn_every(config.cleanup_interval, {
            let state = state.clone();
            move || cleanup(state.clone())
        }),
    ];
    if let Some(period) = config.backup_interval {
        handles.push(spawn_every(period, {
            let state = state.clone();
            move || backup(state.clone())
        }));
    }
    handles
}

fn spawn_every<F, Fut>(period: Duration, mut job: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            job().await;
        }
    })
}

pub async fn predict_and_prefetch(state: AppState) {
    let predicted = state.store.refresh_predictions();
    let loaded = state.store.prefetch().await;
    debug!("Prediction sweep: {predicted} keys predicted, {loaded} prefetched");
}

pub async fn cleanup(state: AppState) {
    match state.store.cleanup().await {
        Ok(report) => info!(
            "Cleanup: forgot {} idle keys, pruned {} locks",
            report.forgotten_keys, report.pruned_locks
        ),
        Err(e) => warn!("Cleanup failed: {e}"),
    }
    if let Err(e) = state.aggregator.reconcile().await {
        warn!("Counter reconciliation failed: {e}");
    }
}

pub async fn backup(state: AppState) {
    match state.store.backup().await {
        Ok(report) => info!(
            "Scheduled backup {} wrote {} files",
            report.backup_id, report.files_copied
        ),
        Err(e) => warn!("Scheduled backup failed: {e}"),
    }
}
