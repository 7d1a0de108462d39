use serde::{Deserialize, Serialize};

use crate::error::RadarError;
use crate::models::developer::valid_position;

/// Span of the first viewport around the device position.
pub const INITIAL_REGION_DELTA: f64 = 0.04;

// Map viewport. Only the center goes to the server; the radius is implicit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub latitude: f64,
    pub longitude: f64,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl Region {
    pub fn around(latitude: f64, longitude: f64) -> Result<Self, RadarError> {
        Region {
            latitude,
            longitude,
            latitude_delta: INITIAL_REGION_DELTA,
            longitude_delta: INITIAL_REGION_DELTA,
        }
        .validated()
    }

    pub fn validated(self) -> Result<Self, RadarError> {
        if !valid_position(self.latitude, self.longitude) {
            return Err(RadarError::InvalidCoordinates {
                latitude: self.latitude,
                longitude: self.longitude,
            });
        }
        Ok(self)
    }
}

/// Parameters shared by a search and the live session opened after it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionParams {
    pub latitude: f64,
    pub longitude: f64,
    /// Comma-delimited filter exactly as typed; matching is server-side.
    pub techs: String,
}

impl SessionParams {
    pub fn new(region: &Region, techs: impl Into<String>) -> Self {
        Self {
            latitude: region.latitude,
            longitude: region.longitude,
            techs: techs.into(),
        }
    }

    pub fn query_pairs(&self) -> [(&'static str, String); 3] {
        [
            ("latitude", self.latitude.to_string()),
            ("longitude", self.longitude.to_string()),
            ("techs", self.techs.clone()),
        ]
    }
}
