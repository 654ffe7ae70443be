use crate::auth::{AuthConfig, AuthService};
use crate::config::Config;
use crate::db::RedisDB;
use crate::error::Error;
use crate::generation::GeminiClient;
use crate::model::{EventStore, InMemoryDb};
use crate::routes::{router, AppState};
use crate::shutdown;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load the application config
pub fn load_config() -> miette::Result<Config> {
    match Config::load() {
        Ok(config) => Ok(config),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Pick the event store: Redis when configured and reachable, memory otherwise
pub async fn init_store(config: &Config) -> Arc<dyn EventStore> {
    let Some(redis_url) = config.redis_url.as_deref() else {
        info!("REDIS_URL not set, using in-memory store");
        return Arc::new(InMemoryDb::default());
    };

    match RedisDB::connect(redis_url).await {
        Ok(db) => {
            info!("Connected to Redis successfully");
            Arc::new(db)
        }
        Err(e) => {
            error!("Failed to connect to Redis: {}", e);
            info!("Using in-memory store as fallback");
            Arc::new(InMemoryDb::default())
        }
    }
}

/// Assemble shared state from the config
pub async fn build_state(config: &Config) -> miette::Result<AppState> {
    let auth_service = Arc::new(AuthService::new(AuthConfig::from_config(config)));
    let generator = Arc::new(GeminiClient::new(config)?);
    let db = init_store(config).await;

    Ok(AppState {
        auth_service,
        db,
        generator,
    })
}

/// Bind the listener and serve until a shutdown signal arrives
pub async fn start_server(config: Config) -> miette::Result<()> {
    let state = build_state(&config).await?;
    let app = router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(Error::from)?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::wait_for_signal())
        .await
        .map_err(Error::from)?;

    info!("Server stopped");
    Ok(())
}
