//! Error types for the impact simulation core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid body radius {0}: must be finite and positive")]
    InvalidRadius(f32),

    #[error("atmosphere radius {atmosphere} must exceed body radius {body}")]
    InvalidShell { body: f32, atmosphere: f32 },

    #[error("invalid launch request: {0}")]
    InvalidLaunch(String),

    #[error("no impactor with id {0}")]
    UnknownImpactor(u64),

    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
