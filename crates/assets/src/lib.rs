//! CPU-side mesh and texture data for the Helio renderer.
//!
//! This crate decodes assets into plain buffers the upload path can consume:
//! - [`MeshData`] — interleaved vertices + indices, from the built-in quad
//!   geometry or an OBJ file
//! - [`TextureData`] — decoded RGBA8 pixels, from an image file or a
//!   procedural checkerboard fallback

mod error;
mod mesh;
mod texture;

pub use error::{AssetError, AssetResult};
pub use mesh::MeshData;
pub use texture::TextureData;
