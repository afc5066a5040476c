//! Family Summons binary entrypoint wiring REST, SSE and the roster store.

use std::{env, net::SocketAddr};

use anyhow::Context;
use axum::Router;
use family_summons::{
    config::AppConfig,
    dao::preferences::PreferenceStore,
    routes,
    services::storage_supervisor,
    state::{AppState, SharedState},
};
use time::OffsetDateTime;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    init_tracing();

    // Loaded before the runtime spawns worker threads so the host offset can be read.
    let config = AppConfig::load();
    let target = config
        .countdown_target()
        .context("computing countdown target")?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?
        .block_on(run(config, target))
}

async fn run(config: AppConfig, target: OffsetDateTime) -> anyhow::Result<()> {
    let (store, offline_fallback) = storage_supervisor::connect_roster_store(&config)
        .await
        .context("opening roster store")?;

    let preferences = match config.preferences_path() {
        Some(path) => PreferenceStore::open(path)
            .await
            .context("opening visitor preferences")?,
        None => PreferenceStore::in_memory(),
    };

    let app_state = AppState::new(config, target, store, preferences, offline_fallback)
        .await
        .context("subscribing to the roster")?;
    app_state.spawn_background();

    let app = build_router(app_state.clone());

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, %target, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let served = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum");

    app_state.teardown();
    served
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
                warn!(error = %err, "SIGTERM handler unavailable; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("shutdown requested");
}
