pub mod routes;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use http::header::{HeaderValue, CACHE_CONTROL};
use tokio::sync::Mutex;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::services::discovery_service::DiscoverySession;
use crate::services::live_channel::LiveChannel;
use crate::services::location_service::LocationProvider;
use crate::services::search_service::DiscoveryApi;
use routes::{discovery, profile};

pub type RadarSession = DiscoverySession<Box<dyn DiscoveryApi>, Box<dyn LiveChannel>>;

/// The shell owns exactly one discovery session for its lifetime.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Mutex<RadarSession>>,
    pub location: Arc<dyn LocationProvider>,
}

impl AppState {
    pub fn new(session: RadarSession, location: Arc<dyn LocationProvider>) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            location,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/discovery", get(discovery::discovery_handler))
        .route("/discovery/locate", post(discovery::locate_handler))
        .route("/discovery/region", put(discovery::region_handler))
        .route("/discovery/search", post(discovery::search_handler))
        .route("/discovery/resume", post(discovery::resume_handler))
        .route("/profile/:github_username", get(profile::profile_handler))
        .layer(SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .with_state(state)
}
