//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] gasfeed_ws::WsError),

    #[error("Registry error: {0}")]
    Registry(#[from] gasfeed_registry::RegistryError),
}

pub type AppResult<T> = Result<T, AppError>;
