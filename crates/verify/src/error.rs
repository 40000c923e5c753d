//! Error types for verification runs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("target server unreachable at {url} after {attempts} attempt(s)")]
    ServerUnreachable { url: String, attempts: usize },

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("timed out waiting for: {0}")]
    AssertionTimeout(String),

    #[error("assertion failed: {0}")]
    AssertionFailed(String),

    #[error("driver error: {0}")]
    Driver(String),

    #[error("invalid flow '{flow}': {reason}")]
    InvalidFlow { flow: String, reason: String },

    #[error("flow not found: {0}")]
    FlowNotFound(String),

    #[error("artifact error: {0}")]
    Artifact(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type VerifyResult<T> = Result<T, VerifyError>;
