use std::env;
use std::time::Duration;

use url::Url;

use crate::error::{RadarError, RadarResult};

const DEFAULT_API_URL: &str = "http://127.0.0.1:3333";

#[derive(Debug, Clone)]
pub struct RadarConfig {
    /// Base URL for both the discovery endpoint and the live channel.
    pub api_url: Url,
    pub request_timeout: Duration,
    pub reconnect_attempts: u32,
    pub reconnect_base: Duration,
    /// Fixed device position; `None` means location access is denied.
    pub device_position: Option<(f64, f64)>,
    pub host: String,
    pub port: u16,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            api_url: Url::parse(DEFAULT_API_URL).expect("default api url is valid"),
            request_timeout: Duration::from_secs(10),
            reconnect_attempts: 5,
            reconnect_base: Duration::from_millis(500),
            device_position: None,
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl RadarConfig {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> RadarResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> RadarResult<Self> {
        let defaults = Self::default();

        let api_url = match lookup("RADAR_API_URL") {
            Some(raw) => Url::parse(raw.trim())
                .map_err(|e| RadarError::Config(format!("RADAR_API_URL: {}", e)))?,
            None => defaults.api_url,
        };
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(RadarError::Config(format!(
                "RADAR_API_URL must be http(s), got {}",
                api_url.scheme()
            )));
        }

        let request_timeout = lookup("RADAR_REQUEST_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);
        let reconnect_attempts = lookup("RADAR_RECONNECT_ATTEMPTS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.reconnect_attempts);
        let reconnect_base = lookup("RADAR_RECONNECT_BASE_MS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.reconnect_base);

        let latitude = lookup("RADAR_LATITUDE").and_then(|v| v.trim().parse::<f64>().ok());
        let longitude = lookup("RADAR_LONGITUDE").and_then(|v| v.trim().parse::<f64>().ok());

        Ok(Self {
            api_url,
            request_timeout,
            reconnect_attempts,
            reconnect_base,
            device_position: latitude.zip(longitude),
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
        })
    }
}
