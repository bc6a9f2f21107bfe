//! Asset-loading error types.

use thiserror::Error;

/// Asset-loading error type.
#[derive(Error, Debug)]
pub enum AssetError {
    /// IO error while reading an asset file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding error
    #[error("Image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// OBJ parsing error
    #[error("OBJ load error: {0}")]
    ObjLoad(#[from] tobj::LoadError),

    /// Structurally invalid asset data
    #[error("Invalid asset: {0}")]
    Invalid(String),
}

/// Result type alias for asset operations.
pub type AssetResult<T> = std::result::Result<T, AssetError>;
