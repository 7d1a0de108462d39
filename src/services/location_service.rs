use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{RadarError, RadarResult};
use crate::models::Region;

/// Device position source. Denial is reported as `PermissionDenied`.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> RadarResult<(f64, f64)>;
}

/// Position pinned by configuration (`RADAR_LATITUDE` / `RADAR_LONGITUDE`).
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation {
    position: Option<(f64, f64)>,
}

impl FixedLocation {
    pub fn new(position: Option<(f64, f64)>) -> Self {
        Self { position }
    }

    pub fn denied() -> Self {
        Self { position: None }
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(&self) -> RadarResult<(f64, f64)> {
        self.position.ok_or(RadarError::PermissionDenied)
    }
}

pub async fn initial_region(provider: &dyn LocationProvider) -> RadarResult<Region> {
    let (latitude, longitude) = match provider.current_position().await {
        Ok(pos) => pos,
        Err(e) => {
            warn!("📍 Location unavailable: {}", e);
            return Err(e);
        }
    };
    let region = Region::around(latitude, longitude)?;
    info!(latitude, longitude, "📍 Initial region resolved");
    Ok(region)
}
