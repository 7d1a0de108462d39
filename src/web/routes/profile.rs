use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use tracing::warn;

use crate::models::github_profile_url;

// Deep link from a marker callout; the handle is the only parameter.
pub async fn profile_handler(Path(github_username): Path<String>) -> impl IntoResponse {
    match github_profile_url(&github_username) {
        Some(url) => Redirect::temporary(&url).into_response(),
        None => {
            warn!("Rejected profile handle '{}'", github_username);
            StatusCode::BAD_REQUEST.into_response()
        }
    }
}
