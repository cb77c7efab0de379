use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::app::{router, AppState};
use crate::config::AppConfig;
use crate::database::{DatabaseManager, PgStore, Store};
use crate::services::{CommandRenderer, SmtpMailer};

pub async fn handle(config: AppConfig) -> anyhow::Result<()> {
    let db = DatabaseManager::connect(&config.database_url()?, config.database.max_connections)
        .await
        .context("can't connect to the database")?;
    db.health_check().await?;
    db.ensure_schema().await?;

    let store: Arc<dyn Store> = Arc::new(PgStore::new(db.pool().clone()));
    let mailer = Arc::new(SmtpMailer::new(&config.mail).context("invalid mail configuration")?);
    let renderer = Arc::new(CommandRenderer::new(&config.certificate));

    let state = AppState::new(&config, store, mailer, renderer);
    let janitor = state.availability.cache().spawn_janitor(config.cache.purge);

    let app = router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Sponsorship API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    janitor.abort();
    db.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("can't listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
