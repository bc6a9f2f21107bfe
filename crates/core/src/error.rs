//! Error types shared across the engine.

use thiserror::Error;

/// Top-level error type for the engine.
#[derive(Error, Debug)]
pub enum Error {
    /// Vulkan-related errors surfaced outside the RHI crate
    #[error("Vulkan error: {0}")]
    Vulkan(String),

    /// Window creation or management errors
    #[error("Window error: {0}")]
    Window(String),

    /// Asset loading errors
    #[error("Asset error: {0}")]
    Asset(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using the engine's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
