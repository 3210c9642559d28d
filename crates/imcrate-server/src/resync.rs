//! Periodic resync driver

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use imcrate_core::ResyncReport;

use crate::AppState;

/// Run one resync pass under the syncer lock
///
/// Errors are logged and swallowed so the driver keeps going.
pub async fn run_pass(state: &AppState) -> Option<ResyncReport> {
    let mut syncer = state.syncer.lock().await;
    match syncer.resync() {
        Ok(report) => {
            tracing::info!(
                releases = report.releases,
                duplicates = report.duplicates,
                elapsed_ms = report.elapsed_ms,
                "Resync pass complete"
            );
            Some(report)
        }
        Err(e) => {
            tracing::warn!(error = %e, kind = e.kind().name(), "Resync pass failed");
            None
        }
    }
}

/// Spawn the background driver
///
/// The first pass runs immediately, then once per `period`. Abort the
/// returned handle to stop it.
pub fn spawn(state: Arc<AppState>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            run_pass(&state).await;
        }
    })
}
