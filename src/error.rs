use axum::http::StatusCode;
use thiserror::Error;

/// Failures of a discovery session. None of them clear markers that are
/// already on the board.
#[derive(Debug, Error)]
pub enum RadarError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("discovery request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("discovery request returned status {status}")]
    SearchStatus { status: u16 },

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("invalid coordinates: latitude={latitude}, longitude={longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("operation not allowed while {0}")]
    InvalidState(&'static str),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RadarError {
    /// Status the radar shell answers with when an operation fails.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RadarError::PermissionDenied => StatusCode::FORBIDDEN,
            RadarError::Network(_) | RadarError::SearchStatus { .. } => StatusCode::BAD_GATEWAY,
            RadarError::MalformedPayload(_) => StatusCode::BAD_GATEWAY,
            RadarError::InvalidCoordinates { .. } => StatusCode::BAD_REQUEST,
            RadarError::InvalidState(_) => StatusCode::CONFLICT,
            RadarError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable tag used in JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            RadarError::PermissionDenied => "permission_denied",
            RadarError::Network(_) | RadarError::SearchStatus { .. } => "network_failure",
            RadarError::MalformedPayload(_) => "malformed_payload",
            RadarError::InvalidCoordinates { .. } => "invalid_coordinates",
            RadarError::InvalidState(_) => "invalid_state",
            RadarError::Config(_) => "config",
        }
    }
}

pub type RadarResult<T> = Result<T, RadarError>;
