//! Mesh data: built-in geometry and OBJ loading.

use std::path::Path;

use glam::{Vec2, Vec3};
use tracing::info;

use helio_rhi::vertex::Vertex;

use crate::error::{AssetError, AssetResult};

/// CPU-side mesh: interleaved vertices plus a u32 index buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    /// Interleaved vertex data.
    pub vertices: Vec<Vertex>,
    /// Triangle list indices.
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Two stacked textured rectangles, the built-in test geometry.
    ///
    /// The second rectangle sits behind the first so depth testing is
    /// visibly exercised.
    pub fn quad() -> Self {
        let vertices = vec![
            Vertex::new(Vec3::new(-0.5, -0.5, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec2::new(1.0, 0.0)),
            Vertex::new(Vec3::new(0.5, -0.5, 0.0), Vec3::new(0.0, 1.0, 0.0), Vec2::new(0.0, 0.0)),
            Vertex::new(Vec3::new(0.5, 0.5, 0.0), Vec3::new(0.0, 0.0, 1.0), Vec2::new(0.0, 1.0)),
            Vertex::new(Vec3::new(-0.5, 0.5, 0.0), Vec3::new(1.0, 1.0, 1.0), Vec2::new(1.0, 1.0)),
            Vertex::new(Vec3::new(-0.5, -0.5, -0.8), Vec3::new(1.0, 0.0, 0.0), Vec2::new(1.0, 0.0)),
            Vertex::new(Vec3::new(0.5, -0.5, -0.8), Vec3::new(0.0, 1.0, 0.0), Vec2::new(0.0, 0.0)),
            Vertex::new(Vec3::new(0.5, 0.5, -0.8), Vec3::new(0.0, 0.0, 1.0), Vec2::new(0.0, 1.0)),
            Vertex::new(Vec3::new(-0.5, 0.5, -0.8), Vec3::new(1.0, 1.0, 1.0), Vec2::new(1.0, 1.0)),
        ];

        let indices = vec![0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4];

        Self { vertices, indices }
    }

    /// Loads a triangulated OBJ file.
    ///
    /// All meshes in the file are merged into one vertex/index pair. Vertex
    /// colors default to white; missing texture coordinates default to the
    /// origin.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or contains
    /// no geometry.
    pub fn load_obj(path: &Path) -> AssetResult<Self> {
        let (models, _materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )?;

        if models.is_empty() {
            return Err(AssetError::Invalid(format!(
                "OBJ file {:?} contains no meshes",
                path
            )));
        }

        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for model in &models {
            let mesh = &model.mesh;
            let base_vertex = vertices.len() as u32;
            let vertex_count = mesh.positions.len() / 3;

            for i in 0..vertex_count {
                let position = Vec3::new(
                    mesh.positions[3 * i],
                    mesh.positions[3 * i + 1],
                    mesh.positions[3 * i + 2],
                );

                let tex_coord = if mesh.texcoords.len() >= 2 * (i + 1) {
                    // OBJ uses a bottom-left UV origin; Vulkan samples from
                    // the top left.
                    Vec2::new(mesh.texcoords[2 * i], 1.0 - mesh.texcoords[2 * i + 1])
                } else {
                    Vec2::ZERO
                };

                vertices.push(Vertex::new(position, Vec3::ONE, tex_coord));
            }

            indices.extend(mesh.indices.iter().map(|&i| base_vertex + i));
        }

        info!(
            "Loaded OBJ {:?}: {} vertices, {} triangles",
            path,
            vertices.len(),
            indices.len() / 3
        );

        Ok(Self { vertices, indices })
    }

    /// Returns the vertex payload as raw bytes for the upload path.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Returns the index payload as raw bytes for the upload path.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Number of indices to draw.
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_counts() {
        let quad = MeshData::quad();
        assert_eq!(quad.vertices.len(), 8);
        assert_eq!(quad.indices.len(), 12);
        assert_eq!(quad.index_count(), 12);
    }

    #[test]
    fn test_quad_indices_in_range() {
        let quad = MeshData::quad();
        let max = *quad.indices.iter().max().unwrap();
        assert!((max as usize) < quad.vertices.len());
    }

    #[test]
    fn test_payload_bytes_match_source_exactly() {
        // The upload path must deliver exactly these bytes to the GPU.
        let quad = MeshData::quad();

        let vertex_bytes = quad.vertex_bytes();
        assert_eq!(
            vertex_bytes.len(),
            quad.vertices.len() * std::mem::size_of::<Vertex>()
        );
        let vertices_back: &[Vertex] = bytemuck::cast_slice(vertex_bytes);
        assert_eq!(vertices_back, quad.vertices.as_slice());

        let index_bytes = quad.index_bytes();
        assert_eq!(index_bytes.len(), quad.indices.len() * 4);
        let indices_back: &[u32] = bytemuck::cast_slice(index_bytes);
        assert_eq!(indices_back, quad.indices.as_slice());
    }

    #[test]
    fn test_load_obj_missing_file_is_error() {
        let result = MeshData::load_obj(Path::new("does/not/exist.obj"));
        assert!(result.is_err());
    }
}
