pub mod discovery;
pub mod profile;
