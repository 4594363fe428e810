pub mod analytics;
pub mod api;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod content;
pub mod error;
pub mod state;
pub mod storage;

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt::time::ChronoLocal};

use clock::{Clock, SystemClock};
use config::Config;
use error::StartupError;
use state::AppState;
use storage::{ContentStore, MemoryStore, PgStore};

pub async fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
        .with_env_filter(EnvFilter::from_env("MEDIACORE_LOG"))
        .init();

    let config = Config::from_env()?;

    match config.database_url.as_deref() {
        Some(url) => {
            let db = storage::new_db_pool(url).await?;
            serve(PgStore::new(db), &config).await
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            serve(MemoryStore::new(), &config).await
        }
    }
}

async fn serve<S: ContentStore>(store: S, config: &Config) -> Result<(), StartupError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = AppState::new(store, clock, config);

    tokio::spawn(
        Arc::clone(state.analytics().tracker()).run_retention_sweep(config.retention_sweep_interval),
    );

    api::run_server(state, config.bind_address).await?;
    Ok(())
}
