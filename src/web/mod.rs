pub mod api;
pub mod error;
pub mod pages;
pub mod views;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use chrono_tz::Tz;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config;
use crate::models::Config;
use crate::store::Store;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) config: Arc<Config>,
    pub(crate) store: Arc<Store>,
    pub(crate) tz: Tz,
}

impl AppState {
    pub(crate) fn new(config: Config, store: Store) -> Result<Self> {
        let tz = config::timezone(&config)?;
        Ok(Self {
            config: Arc::new(config),
            store: Arc::new(store),
            tz,
        })
    }
}

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::dashboard_handler))
        .route("/event/{id}", get(pages::event_handler))
        .route("/health", get(|| async { "ok" }))
        .route("/api/events", get(api::list_events).post(api::create_event))
        .route("/api/events/{id}", get(api::get_event))
        .route(
            "/api/events/{id}/participants",
            get(api::list_participants).post(api::join_event),
        )
        .route("/api/events/{id}/results", get(api::event_results))
        .route("/api/availability", post(api::save_availability))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

pub async fn serve(config: Config, addr: &str) -> Result<()> {
    let store = match &config.server.data_file {
        Some(path) => Store::open(path)
            .with_context(|| format!("Failed to open data file {}", path.display()))?,
        None => {
            info!("No data_file configured, keeping events in memory");
            Store::in_memory()
        }
    };
    let state = AppState::new(config, store)?;
    info!(
        "Results use the '{}' consensus rule",
        state.config.results.consensus
    );

    let app = router(state);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Planner listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
