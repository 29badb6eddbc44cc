use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use empresas_api::config::Config;
use empresas_api::db::Database;
use empresas_api::handlers::AppState;
use empresas_api::routes;
use empresas_api::storage::{MemoryStore, PgStore, Storage};

/// Main entry point for the application.
///
/// Initializes logging, loads configuration, selects the storage backend
/// (Postgres when `DATABASE_URL` is set, in-memory otherwise) and starts the
/// Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "empresas_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let storage: Arc<dyn Storage> = match config.database_url {
        Some(ref url) => {
            let db = Database::new(url).await?;
            tracing::info!("Database connection pool established");
            db.ensure_schema().await?;
            Arc::new(PgStore::new(db.pool))
        }
        None => Arc::new(MemoryStore::new()),
    };
    tracing::info!("Storage backend: {}", storage.backend());

    let port = config.port;
    let app_state = Arc::new(AppState::new(storage, config));
    let app = routes::build_router(app_state)?;

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
