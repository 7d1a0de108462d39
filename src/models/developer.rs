use serde::{Deserialize, Serialize};

use crate::error::RadarError;

// Profile announced by the discovery server, validated for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Developer {
    pub id: String,
    pub name: String,
    pub bio: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub techs: Vec<String>,
    pub avatar_url: Option<String>,
    pub github_username: String,
}

#[derive(Debug, Deserialize)]
struct GeoPoint {
    coordinates: Option<Vec<f64>>,
}

/// Developer object as sent by `/search` and the `new-dev` event.
#[derive(Debug, Deserialize)]
pub struct DeveloperPayload {
    #[serde(rename = "_id")]
    id: Option<String>,
    name: Option<String>,
    bio: Option<String>,
    techs: Option<Vec<String>>,
    location: Option<GeoPoint>,
    avatar_url: Option<String>,
    github_username: Option<String>,
}

const GITHUB_PROFILE_BASE: &str = "https://github.com/";

/// Profile deep link for a GitHub handle, `None` when the handle could not be one.
pub fn github_profile_url(handle: &str) -> Option<String> {
    let handle = handle.trim();
    let valid = !handle.is_empty()
        && handle.len() <= 39
        && !handle.starts_with('-')
        && handle.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    valid.then(|| format!("{}{}", GITHUB_PROFILE_BASE, handle))
}

pub fn valid_position(latitude: f64, longitude: f64) -> bool {
    (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude)
}

impl TryFrom<DeveloperPayload> for Developer {
    type Error = RadarError;

    fn try_from(payload: DeveloperPayload) -> Result<Self, Self::Error> {
        let id = payload
            .id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| RadarError::MalformedPayload("missing _id".to_string()))?;

        let github_username = payload
            .github_username
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                RadarError::MalformedPayload(format!("developer {} has no github_username", id))
            })?;

        // GeoJSON order: [longitude, latitude]
        let coords = payload
            .location
            .and_then(|l| l.coordinates)
            .unwrap_or_default();
        let (longitude, latitude) = match coords.as_slice() {
            [lon, lat] => (*lon, *lat),
            _ => {
                return Err(RadarError::MalformedPayload(format!(
                    "developer {} has no [longitude, latitude] pair",
                    id
                )))
            }
        };
        if !valid_position(latitude, longitude) {
            return Err(RadarError::InvalidCoordinates {
                latitude,
                longitude,
            });
        }

        let techs = payload
            .techs
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        let name = payload
            .name
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| github_username.clone());

        Ok(Developer {
            id,
            name,
            bio: payload.bio.filter(|s| !s.trim().is_empty()),
            latitude,
            longitude,
            techs,
            avatar_url: payload.avatar_url.filter(|s| !s.trim().is_empty()),
            github_username,
        })
    }
}

impl Developer {
    pub fn from_json(value: serde_json::Value) -> Result<Self, RadarError> {
        let payload: DeveloperPayload = serde_json::from_value(value)
            .map_err(|e| RadarError::MalformedPayload(e.to_string()))?;
        Developer::try_from(payload)
    }

    pub fn profile_url(&self) -> Option<String> {
        github_profile_url(&self.github_username)
    }

    /// Technologies as shown in the marker callout.
    pub fn techs_label(&self) -> String {
        self.techs.join(", ")
    }
}
