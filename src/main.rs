use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use tracing::{info, warn};

use devradar::services::discovery_service::DiscoverySession;
use devradar::services::live_channel::{LiveChannel, SocketIoChannel};
use devradar::services::location_service::{FixedLocation, LocationProvider};
use devradar::services::search_service::{DiscoveryApi, HttpSearchClient};
use devradar::web::{self, AppState};
use devradar::RadarConfig;

#[tokio::main]
async fn main() {
    // Load .env
    dotenv().ok();

    // 1. Start logging
    tracing_subscriber::fmt::init();

    // 2. Config + discovery collaborators
    let config = RadarConfig::from_env().expect("invalid radar configuration");
    info!(api_url = %config.api_url, "Using discovery server");

    let api: Box<dyn DiscoveryApi> =
        Box::new(HttpSearchClient::new(&config).expect("cannot build discovery client"));
    let channel: Box<dyn LiveChannel> = Box::new(SocketIoChannel::new(&config));
    let location: Arc<dyn LocationProvider> =
        Arc::new(FixedLocation::new(config.device_position));

    let state = AppState::new(DiscoverySession::new(api, channel), location.clone());

    // 3. Resolve the initial region like the map does on mount
    if let Err(e) = state.session.lock().await.locate(location.as_ref()).await {
        warn!("Starting without a location: {}", e);
    }

    let app = web::router(state.clone());

    // 4. Start the shell (with fallback port)
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("cannot parse host/port");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            let fallback: SocketAddr = format!("{}:{}", config.host, config.port + 1)
                .parse()
                .expect("cannot parse fallback host/port");
            warn!("Could not bind {}: {}. Trying fallback {}", addr, e, fallback);
            tokio::net::TcpListener::bind(fallback)
                .await
                .expect("cannot bind fallback port")
        }
    };

    match listener.local_addr() {
        Ok(bound) => info!("📡 Radar shell running on http://{}/discovery", bound),
        Err(e) => warn!("Radar shell running, local address unknown: {}", e),
    }

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    // Screen teardown closes the live session.
    state.session.lock().await.close().await;

    if let Err(e) = served {
        warn!("Radar shell stopped with error: {}", e);
    }
}
