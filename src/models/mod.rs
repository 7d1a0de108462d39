pub mod developer;
pub mod region;

pub use developer::{github_profile_url, Developer, DeveloperPayload};
pub use region::{Region, SessionParams, INITIAL_REGION_DELTA};
