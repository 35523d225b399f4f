//! Error types for ar_experience

use thiserror::Error;

/// Main error type for experience viewing
#[derive(Error, Debug)]
pub enum ExperienceError {
    #[error("Environment error: {0}")]
    Environment(#[from] crate::environment::EnvironmentError),

    #[error("Viewer error: {0}")]
    Viewer(#[from] crate::viewer::ViewerError),

    #[error("Asset error: {0}")]
    Asset(#[from] crate::asset::AssetError),

    #[error("Invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias for experience operations
pub type Result<T> = std::result::Result<T, ExperienceError>;
