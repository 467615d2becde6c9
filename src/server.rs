use crate::api::MapBackend;
use crate::config::AppConfig;
use crate::coordinator::CoordinatorHandle;
use crate::data::{districts_to_geojson, schools_to_geojson};
use crate::selection::Action;
use crate::stats::{province_table, ProvinceStats};
use crate::types::{District, LatLng};
use crate::view::ViewModel;
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{info, warn};

pub struct AppState {
    pub coordinator: CoordinatorHandle,
    pub backend: Arc<dyn MapBackend>,
}

#[derive(Deserialize)]
pub struct QueryParams {
    lat: f64,
    lon: f64,
}

#[derive(Deserialize)]
pub struct SearchParams {
    q: String,
}

#[derive(Serialize)]
pub struct QueryResponse {
    id: String,
    name: String,
    province_name: Option<String>,
}

pub fn router(state: Arc<AppState>, static_dir: &Path) -> Router {
    Router::new()
        .route("/api/view", get(view_handler))
        .route("/api/actions", post(action_handler))
        .route("/api/query", get(query_handler))
        .route("/api/provinces", get(provinces_handler))
        .route("/api/schools", get(schools_handler))
        .route("/api/districts", get(districts_handler))
        .route("/api/districts/search", get(district_search_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(
    config: &AppConfig,
    coordinator: CoordinatorHandle,
    backend: Arc<dyn MapBackend>,
) -> Result<()> {
    let state = Arc::new(AppState {
        coordinator,
        backend,
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    info!("Starting server on http://{}", addr);

    let app = router(state, &config.server.static_dir);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn view_handler(State(state): State<Arc<AppState>>) -> Json<ViewModel> {
    Json(state.coordinator.snapshot().view.clone())
}

async fn action_handler(
    State(state): State<Arc<AppState>>,
    Json(action): Json<Action>,
) -> StatusCode {
    match state.coordinator.dispatch(action).await {
        Ok(()) => StatusCode::ACCEPTED,
        Err(e) => {
            warn!("Rejecting action: {}", e);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Json<Option<QueryResponse>> {
    let snapshot = state.coordinator.snapshot();
    let hit = snapshot
        .dataset
        .district_at(LatLng::new(params.lat, params.lon))
        .map(|district| QueryResponse {
            id: district.id.clone(),
            name: district.name.clone(),
            province_name: district.province_name.clone(),
        });
    Json(hit)
}

async fn provinces_handler(
    State(state): State<Arc<AppState>>,
) -> Json<BTreeMap<String, ProvinceStats>> {
    Json(province_table(&state.coordinator.snapshot().dataset))
}

async fn schools_handler(State(state): State<Arc<AppState>>) -> Json<FeatureCollection> {
    Json(schools_to_geojson(&state.coordinator.snapshot().dataset.schools))
}

async fn districts_handler(State(state): State<Arc<AppState>>) -> Json<FeatureCollection> {
    Json(districts_to_geojson(&state.coordinator.snapshot().dataset.districts))
}

/// Asks the backend rather than the cache, so results reflect its own matching.
async fn district_search_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<FeatureCollection>, StatusCode> {
    let districts: Vec<District> = state
        .backend
        .search_districts(&params.q)
        .await
        .map_err(|e| {
            warn!("District search for {:?} failed: {}", params.q, e);
            StatusCode::BAD_GATEWAY
        })?;
    Ok(Json(districts_to_geojson(&districts)))
}
