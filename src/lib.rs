pub mod catalog;
pub mod config;
pub mod db;
pub mod engine;
pub mod questionnaire;
pub mod scoring;

/// Application name for XDG paths
pub const APP_NAME: &str = "playlist-expert";
