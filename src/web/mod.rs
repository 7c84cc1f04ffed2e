//! HTTP surface: the relay endpoint, health check and static files.

use std::num::NonZeroU16;
use std::path::Path;

use axum::Json;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::header::CACHE_CONTROL;
use axum::http::{HeaderValue, Response};
use serde_json::{Value, json};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_header::SetResponseHeader;
use tracing::{error, info};

use crate::constants::{
    FORM_OVERHEAD_BYTES, GENERATE_ADS_PATH, RESULT_CACHE_CONTROL, RESULTS_URL_PREFIX,
};
use crate::relay::AdRelay;
use crate::rules::{MAX_IMAGE_BYTES, MAX_IMAGES};

mod generate;

use generate::generate_ads_handler;

#[derive(Clone, Debug)]
pub(crate) struct AppState {
    relay: AdRelay,
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Generated images never change once written, successful reads may be cached forever.
fn result_cache_control<B>(response: &Response<B>) -> Option<HeaderValue> {
    response
        .status()
        .is_success()
        .then(|| HeaderValue::from_static(RESULT_CACHE_CONTROL))
}

fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", axum::routing::get(health_handler))
        .route(GENERATE_ADS_PATH, axum::routing::post(generate_ads_handler))
}

/// Builds the full application: API routes, `/results/*` and the UI with its
/// `index.html` fallback for client-side routes.
pub fn app(relay: AdRelay, frontend_dir: &Path) -> Router {
    let results = SetResponseHeader::overriding(
        ServeDir::new(relay.storage().results_dir()),
        CACHE_CONTROL,
        result_cache_control,
    );
    let frontend =
        ServeDir::new(frontend_dir).fallback(ServeFile::new(frontend_dir.join("index.html")));

    create_router()
        .nest_service(RESULTS_URL_PREFIX, results)
        .fallback_service(frontend)
        .layer(DefaultBodyLimit::max(
            MAX_IMAGES * MAX_IMAGE_BYTES + FORM_OVERHEAD_BYTES,
        ))
        .with_state(AppState { relay })
}

/// Binds the listener and serves until the server stops.
pub async fn setup_server(
    listen_addr: &str,
    port: NonZeroU16,
    relay: AdRelay,
    frontend_dir: &Path,
) -> Result<(), anyhow::Error> {
    info!("Uploads: {}", relay.storage().uploads_dir().display());
    info!("Results: {}", relay.storage().results_dir().display());
    let app = app(relay, frontend_dir);

    let addr = format!("{}:{}", listen_addr, port);
    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, app).await {
        error!("Server error: {}", err);
    }
    Ok(())
}
