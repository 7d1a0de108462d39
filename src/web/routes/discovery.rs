use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::error::RadarError;
use crate::models::{Developer, Region};
use crate::services::discovery_service::{SessionPhase, SessionView};
use crate::services::live_channel::ChannelStatus;
use crate::web::AppState;

type ApiError = (StatusCode, Json<Value>);

fn error_response(err: RadarError) -> ApiError {
    (
        err.status_code(),
        Json(json!({ "error": err.kind(), "detail": err.to_string() })),
    )
}

#[derive(Debug, Serialize)]
pub struct MarkerView {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub avatar_url: Option<String>,
    pub name: String,
    pub bio: Option<String>,
    /// Callout text, e.g. "go, rust".
    pub techs: String,
    pub profile_url: Option<String>,
}

impl From<Developer> for MarkerView {
    fn from(dev: Developer) -> Self {
        Self {
            techs: dev.techs_label(),
            profile_url: dev.profile_url(),
            id: dev.id,
            latitude: dev.latitude,
            longitude: dev.longitude,
            avatar_url: dev.avatar_url,
            name: dev.name,
            bio: dev.bio,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DiscoveryResponse {
    pub phase: SessionPhase,
    pub channel: ChannelStatus,
    pub region: Option<Region>,
    pub tech_filter: String,
    pub markers: Vec<MarkerView>,
}

impl From<SessionView> for DiscoveryResponse {
    fn from(view: SessionView) -> Self {
        Self {
            phase: view.phase,
            channel: view.channel,
            region: view.region,
            tech_filter: view.tech_filter,
            markers: view.developers.into_iter().map(MarkerView::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchBody {
    #[serde(default)]
    techs: Option<String>,
}

pub async fn discovery_handler(State(state): State<AppState>) -> Json<DiscoveryResponse> {
    let session = state.session.lock().await;
    Json(session.view().into())
}

pub async fn locate_handler(
    State(state): State<AppState>,
) -> Result<Json<DiscoveryResponse>, ApiError> {
    let mut session = state.session.lock().await;
    session
        .locate(state.location.as_ref())
        .await
        .map_err(error_response)?;
    Ok(Json(session.view().into()))
}

pub async fn region_handler(
    State(state): State<AppState>,
    Json(region): Json<Region>,
) -> Result<Json<DiscoveryResponse>, ApiError> {
    let mut session = state.session.lock().await;
    session.update_region(region).map_err(error_response)?;
    Ok(Json(session.view().into()))
}

pub async fn search_handler(
    State(state): State<AppState>,
    Json(body): Json<SearchBody>,
) -> Result<Json<DiscoveryResponse>, ApiError> {
    let mut session = state.session.lock().await;
    if let Some(techs) = body.techs {
        session.set_tech_filter(techs);
    }
    let count = session.search().await.map_err(error_response)?;
    info!(count, "🔎 Search served");
    Ok(Json(session.view().into()))
}

pub async fn resume_handler(
    State(state): State<AppState>,
) -> Result<Json<DiscoveryResponse>, ApiError> {
    let mut session = state.session.lock().await;
    session.resume_live().await.map_err(error_response)?;
    Ok(Json(session.view().into()))
}
