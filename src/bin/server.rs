//! Server binary: loads settings and resources, connects the pool, serves until shutdown.

use resource_crud::{
    apply_migrations,
    build_router,
    ensure_database_exists,
    load_resources,
    resolve,
    shutdown_signal,
    AppState,
    PgStorage,
    Settings,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("resource_crud=info,tower_http=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let resources = load_resources(settings.resources_path.as_deref()).await?;
    let model = resolve(&resources)?;

    if settings.auto_migrate {
        ensure_database_exists(&settings.database_url).await?;
    }
    let pool = match sqlx::postgres::PgPoolOptions::new()
        .max_connections(settings.db_max_connections)
        .connect(&settings.database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "failed to connect to database");
            return Err(e.into());
        }
    };
    tracing::info!("database connected");

    if settings.auto_migrate {
        apply_migrations(&pool, &model).await?;
    }

    let api_base = settings.api_base();
    let state = AppState::new(Arc::new(PgStorage::new(pool.clone())), model);
    let app = build_router(state, &settings)?;

    let listener = TcpListener::bind(settings.socket_addr()).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        api_base = %api_base,
        environment = %settings.environment,
        "listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("database pool closed");
    Ok(())
}
