//! NCC AI News: binary entrypoint.
//! Boots the Axum HTTP server, wiring the tagging pipeline, routes and metrics.

use std::sync::Arc;
use std::time::Duration;

use ncc_ai_news::config::{ai::AiConfig, news::NewsConfig};
use ncc_ai_news::metrics::Metrics;
use ncc_ai_news::{api, build_pipeline, init_tracing, scheduler, AppState};
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let news_cfg = NewsConfig::load_default()?;
    let ai_cfg = AiConfig::load_default();
    let pipeline = Arc::new(build_pipeline(&news_cfg, &ai_cfg)?);

    if news_cfg.refresh_interval_secs > 0 {
        scheduler::spawn_refresh_task(
            pipeline.clone(),
            Duration::from_secs(news_cfg.refresh_interval_secs),
        );
    }

    let mut router = api::router(AppState { pipeline }, &news_cfg.static_dir);
    match Metrics::init() {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => tracing::warn!(error = ?e, "metrics recorder not installed"),
    }

    Ok(router.into())
}
