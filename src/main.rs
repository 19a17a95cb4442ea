pub mod auth;
pub mod config;
pub mod contact;
pub mod courses;
pub mod enrollment;
pub mod err;
pub mod models;
pub mod progress;
pub mod routes;
pub mod store;

use std::sync::Arc;

use serde::Serialize;

use crate::config::Config;
use crate::err::{Error, Fine, Success};
use crate::store::{MemoryStore, PgStore, SharedStore};

pub type Payload<T> = axum::response::Result<Success<T>, Error>;

pub fn proceeds<V>(value: V) -> Payload<V>
where
    V: Serialize,
{
    Ok(Fine(value))
}

/// Unwraps a request field, treating absent and blank values alike.
pub fn required(value: Option<String>, field: &str) -> Result<String, Error> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::invalid(format!("`{}` is required", field))),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load()?;
    let store: SharedStore = match &config.database_url {
        Some(url) => Arc::new(PgStore::connect(url, config.max_connections).await?),
        None => {
            log::warn!("DATABASE_URL not set, data will only live in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let app = routes::app(store);

    let addr = config.address();
    log::info!("Starting e-learning HTTP server on http://{}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
        log::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                log::error!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
