//! focus-crew binary entrypoint wiring the timer, team sessions, REST and SSE layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use focus_crew::{
    config::AppConfig,
    dao::{backend::SessionBackend, memory::MemorySessionBackend},
    routes,
    services::{observer::LoggingObserver, sync_agent},
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let backend = select_backend(&config)?;
    let app_state = AppState::new(config, backend, Arc::new(LoggingObserver));

    // Prime the session cache; the UI may list sessions before joining one.
    if let Err(err) = sync_agent::poll_once(&app_state).await {
        warn!(error = %err, "initial session fetch failed");
    }

    let app = build_router(app_state);

    let port = env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Use the remote backend when one is configured, otherwise run the
/// authoritative copy in-process.
fn select_backend(config: &AppConfig) -> anyhow::Result<Arc<dyn SessionBackend>> {
    #[cfg(feature = "http-backend")]
    {
        use focus_crew::dao::http::{HttpBackendConfig, HttpBackendError, HttpSessionBackend};

        match HttpBackendConfig::from_env(config.request_timeout()) {
            Ok(http_config) => {
                info!(url = %http_config.base_url, "using remote session backend");
                let backend = HttpSessionBackend::new(http_config)
                    .context("building session backend client")?;
                return Ok(Arc::new(backend));
            }
            Err(HttpBackendError::MissingEnvVar { .. }) => {}
            Err(err) => return Err(err).context("reading session backend configuration"),
        }
    }

    info!("no remote session backend configured; running sessions in-process");
    let backend = Arc::new(MemorySessionBackend::new(
        config.durations(),
        config.sessions_until_long_break(),
    ));
    backend.clone().spawn_clock();
    Ok(backend)
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
