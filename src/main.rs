mod archive;
mod board;
mod config;
mod constants;
mod feed;
mod handlers;
mod models;
mod reconcile;
mod server;
mod session;
mod state;
mod util;


use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use rustls::crypto::ring::default_provider;
use rustls::crypto::CryptoProvider;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::archive::load_archives;
use crate::config::Config;
use crate::constants::DEFAULT_STATIC_DIR;
use crate::feed::run_feed;
use crate::reconcile::Reconciler;
use crate::server::build_router;
use crate::session::run_session;
use crate::state::AppState;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "score_stream=info".into()),
        )
        .init();

    CryptoProvider::install_default(default_provider())
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    let config = Config::from_env()?;

    // Archives are resolved before the UI offers switching; failures degrade
    // to empty datasets inside load_archives.
    let archives = load_archives(&config).await;

    let (reconciler, initial_effects) = Reconciler::new(archives);
    let sources = reconciler.sources();

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let state = AppState::new(
        config.clone(),
        events_tx,
        sources,
        "/api/board-stream".to_string(),
    );

    tokio::spawn(run_session(
        Arc::clone(&state),
        events_rx,
        reconciler,
        initial_effects,
    ));

    let disable_feed = env::var("DISABLE_FEED")
        .map(|value| {
            let trimmed = value.trim();
            !trimmed.is_empty() && trimmed != "0"
        })
        .unwrap_or(false);

    if disable_feed {
        warn!("live feed disabled via DISABLE_FEED");
    } else {
        tokio::spawn(run_feed(
            config.clone(),
            state.events.clone(),
            state.subscribe_shutdown(),
        ));
    }

    let static_dir = env::var("STATIC_DIR").unwrap_or_else(|_| DEFAULT_STATIC_DIR.to_string());

    let app = build_router(Arc::clone(&state), static_dir);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("score-stream listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(Arc::clone(&state)))
    .await
    .context("server error")?;

    Ok(())
}

async fn shutdown_signal(state: Arc<AppState>) {
    #[cfg(unix)]
    {
        let ctrl_c = tokio::signal::ctrl_c();
        let terminate = match signal(SignalKind::terminate()) {
            Ok(signal) => Some(signal),
            Err(err) => {
                warn!(?err, "failed to install SIGTERM handler");
                None
            }
        };
        let quit = match signal(SignalKind::quit()) {
            Ok(signal) => Some(signal),
            Err(err) => {
                warn!(?err, "failed to install SIGQUIT handler");
                None
            }
        };

        tokio::select! {
            _ = ctrl_c => {},
            _ = async {
                if let Some(mut signal) = terminate {
                    signal.recv().await;
                } else {
                    std::future::pending::<()>().await;
                }
            } => {},
            _ = async {
                if let Some(mut signal) = quit {
                    signal.recv().await;
                } else {
                    std::future::pending::<()>().await;
                }
            } => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    state.shutdown();
}
