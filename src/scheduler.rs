// src/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::pipeline::NewsPipeline;

/// Spawn a background task that runs one cycle per `interval`, first tick immediately.
pub fn spawn_refresh_task(pipeline: Arc<NewsPipeline>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match pipeline.run_cycle().await {
                Ok(report) => tracing::info!(
                    target: "refresh",
                    new_count = report.new_count,
                    corpus = report.corpus.len(),
                    "scheduled refresh tick"
                ),
                Err(e) => tracing::error!(target: "refresh", error = ?e, "scheduled refresh failed"),
            }
        }
    })
}
