pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod web;

pub use config::RadarConfig;
pub use error::{RadarError, RadarResult};
