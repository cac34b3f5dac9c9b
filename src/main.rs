use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use betrun::api_football::ApiFootball;
use betrun::audit::PickStore;
use betrun::config::AppConfig;
use betrun::fixtures::build_fetch_pool;
use betrun::server::{AppState, router};

fn open_pick_store(cfg: &AppConfig) -> Result<PickStore> {
    let Some(path) = cfg.picks_db.as_ref().filter(|p| p.as_os_str() != ":memory:") else {
        return PickStore::in_memory();
    };
    match PickStore::open(path) {
        Ok(store) => {
            info!(path = %path.display(), "pick store opened");
            Ok(store)
        }
        Err(err) => {
            warn!(error = %format!("{err:#}"), "pick store unavailable, keeping picks in memory");
            PickStore::in_memory()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = AppConfig::from_env();
    if cfg.apisports_key.is_none() {
        warn!("APISPORTS_KEY not set; upstream routes will fail");
    }

    let pool = build_fetch_pool(cfg.fetch_parallelism).map(Arc::new);
    let state = AppState {
        source: Arc::new(ApiFootball::new(&cfg)),
        picks: Arc::new(open_pick_store(&cfg)?),
        pool,
        config: Arc::new(cfg),
    };
    let bind = state.config.bind_addr.clone();

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("bind {bind}"))?;
    info!(addr = %bind, brand = %state.config.brand, "betrun listening");
    axum::serve(listener, router(state))
        .await
        .context("server error")?;
    Ok(())
}
