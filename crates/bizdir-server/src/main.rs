mod api;
mod middleware;

use std::sync::Arc;

use bizdir_search::{SearchOptions, SearchOrchestrator};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = bizdir_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = bizdir_db::PoolConfig::from_app_config(&config);
    let pool = bizdir_db::connect_pool(&config.database_url, pool_config).await?;
    bizdir_db::run_migrations(&pool).await?;

    let store = Arc::new(bizdir_db::PgStore::new(pool.clone()));
    let options = SearchOptions::from_config(&config);
    tracing::info!(
        env = %config.env,
        store_timeout_ms = config.store_timeout_ms,
        max_page_size = options.max_page_size,
        cache = options.directory_cache_ttl.is_some(),
        "search engine ready"
    );
    let search = Arc::new(SearchOrchestrator::new(store.clone(), store, options));

    let auth = AuthState::from_env(matches!(
        config.env,
        bizdir_core::Environment::Development
    ))?;
    let app = build_app(AppState { pool, search }, auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
