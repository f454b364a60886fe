use std::net::SocketAddr;
use std::sync::Arc;
use anyhow::Context;

// ri-utilizziamo le funzioni e strutture definite in lib.rs
use bacheca_server::{build_sqlite_url, connect_pool, routes, run_migrations, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Log: RUST_LOG ha la precedenza, poi BACHECA_LOG, altrimenti "info"
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(
            std::env::var("BACHECA_LOG").unwrap_or_else(|_| "info".to_string()),
        ))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();

    // Costruisci l'URL del database SQLite
    let db_url = build_sqlite_url().context("build sqlite DATABASE_URL")?;
    tracing::info!(database_url = %db_url, "using database");
    // Connetti al database
    let pool = connect_pool(&db_url).await.context("connect to sqlite")?;
    // Esegui le migrazioni del database
    run_migrations(&pool).await.context("run migrations")?;

    // apikey opzionale: senza, lo store è aperto (uso locale)
    let api_key = std::env::var("BACHECA_API_KEY").ok();
    if api_key.is_none() {
        tracing::warn!("BACHECA_API_KEY not set: REST and realtime endpoints are unauthenticated");
    }
    // Crea lo stato dell'applicazione condiviso
    let state = Arc::new(AppState::new(pool, api_key));
    let app = routes::router(state);

    // Ottieni l'indirizzo di binding dal env o usa il default
    let bind = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    let addr: SocketAddr = bind.parse().context("parse BIND_ADDR")?;
    tracing::info!("listening on http://{}", addr);
    // Crea il listener TCP; il bind è non bloccante e compatibile con Tokio
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("bind tcp listener")?;
    // Avvia il server Axum
    axum::serve(listener, app.into_make_service())
        .await
        .context("server shutdown")?;

    Ok(())
}
