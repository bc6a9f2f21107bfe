//! Texture data: image decoding and the checkerboard fallback.

use std::path::Path;

use tracing::{info, warn};

use crate::error::AssetResult;

/// Decoded RGBA8 pixel data.
#[derive(Debug, Clone)]
pub struct TextureData {
    /// Tightly-packed RGBA8 pixels, `width * height * 4` bytes.
    pub pixels: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl TextureData {
    /// Decodes an image file into RGBA8 pixels.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded.
    pub fn load(path: &Path) -> AssetResult<Self> {
        let decoded = image::open(path)?.into_rgba8();
        let (width, height) = decoded.dimensions();

        info!("Decoded texture {:?}: {}x{}", path, width, height);

        Ok(Self {
            pixels: decoded.into_raw(),
            width,
            height,
        })
    }

    /// Loads a texture file, falling back to a checkerboard when missing.
    ///
    /// A missing texture is not fatal for the test geometry; decode errors
    /// on a file that exists still are.
    pub fn load_or_checkerboard(path: &Path) -> AssetResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!("Texture {:?} not found, using checkerboard", path);
            Ok(Self::checkerboard())
        }
    }

    /// Generates a 256x256 magenta/black checkerboard with 16-pixel cells.
    pub fn checkerboard() -> Self {
        const SIZE: u32 = 256;
        const CELL: u32 = 16;

        let mut pixels = Vec::with_capacity((SIZE * SIZE * 4) as usize);
        for y in 0..SIZE {
            for x in 0..SIZE {
                let magenta = ((x / CELL) + (y / CELL)) % 2 == 0;
                if magenta {
                    pixels.extend_from_slice(&[255, 0, 255, 255]);
                } else {
                    pixels.extend_from_slice(&[0, 0, 0, 255]);
                }
            }
        }

        Self {
            pixels,
            width: SIZE,
            height: SIZE,
        }
    }

    /// Size of the pixel payload in bytes.
    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkerboard_dimensions() {
        let tex = TextureData::checkerboard();
        assert_eq!(tex.width, 256);
        assert_eq!(tex.height, 256);
        assert_eq!(tex.byte_len(), 256 * 256 * 4);
    }

    #[test]
    fn test_checkerboard_alternates_cells() {
        let tex = TextureData::checkerboard();
        let pixel = |x: u32, y: u32| {
            let offset = ((y * tex.width + x) * 4) as usize;
            &tex.pixels[offset..offset + 4]
        };

        // First cell is magenta, its right neighbor black.
        assert_eq!(pixel(0, 0), &[255, 0, 255, 255]);
        assert_eq!(pixel(16, 0), &[0, 0, 0, 255]);
        assert_eq!(pixel(16, 16), &[255, 0, 255, 255]);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let tex = TextureData::load_or_checkerboard(Path::new("does/not/exist.png")).unwrap();
        assert_eq!(tex.width, 256);
    }
}
