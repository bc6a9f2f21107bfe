//! Vertex data structures and input descriptions.

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Interleaved vertex format: position, color, and texture coordinates.
///
/// # Memory Layout
///
/// `#[repr(C)]` keeps the layout predictable:
/// - Offset 0: position (12 bytes)
/// - Offset 12: color (12 bytes)
/// - Offset 24: tex_coord (8 bytes)
/// - Total size: 32 bytes
///
/// # Shader Locations
///
/// - location 0: position (vec3)
/// - location 1: color (vec3)
/// - location 2: tex_coord (vec2)
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// 3D position in object space.
    pub position: Vec3,
    /// RGB vertex color.
    pub color: Vec3,
    /// Texture coordinates (UV).
    pub tex_coord: Vec2,
}

impl Vertex {
    /// Creates a new vertex.
    #[inline]
    pub const fn new(position: Vec3, color: Vec3, tex_coord: Vec2) -> Self {
        Self {
            position,
            color,
            tex_coord,
        }
    }

    /// Get the vertex input binding description (binding 0, per-vertex rate).
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: std::mem::size_of::<Self>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    /// Get the vertex attribute descriptions.
    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 3] {
        [
            // Position at location 0
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: 0,
            },
            // Color at location 1
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 1,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: 12,
            },
            // TexCoord at location 2
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 2,
                format: vk::Format::R32G32_SFLOAT,
                offset: 24,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_size() {
        // Vec3 (12) + Vec3 (12) + Vec2 (8) = 32 bytes
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
    }

    #[test]
    fn test_binding_description() {
        let binding = Vertex::binding_description();
        assert_eq!(binding.binding, 0);
        assert_eq!(binding.stride, 32);
        assert_eq!(binding.input_rate, vk::VertexInputRate::VERTEX);
    }

    #[test]
    fn test_attribute_descriptions() {
        let attrs = Vertex::attribute_descriptions();
        assert_eq!(attrs.len(), 3);

        assert_eq!(attrs[0].location, 0);
        assert_eq!(attrs[0].format, vk::Format::R32G32B32_SFLOAT);
        assert_eq!(attrs[0].offset, 0);

        assert_eq!(attrs[1].location, 1);
        assert_eq!(attrs[1].format, vk::Format::R32G32B32_SFLOAT);
        assert_eq!(attrs[1].offset, 12);

        assert_eq!(attrs[2].location, 2);
        assert_eq!(attrs[2].format, vk::Format::R32G32_SFLOAT);
        assert_eq!(attrs[2].offset, 24);
    }

    #[test]
    fn test_vertex_offsets_match_attributes() {
        use std::mem::offset_of;

        assert_eq!(offset_of!(Vertex, position), 0);
        assert_eq!(offset_of!(Vertex, color), 12);
        assert_eq!(offset_of!(Vertex, tex_coord), 24);
    }

    #[test]
    fn test_vertex_pod_round_trip() {
        let vertex = Vertex::new(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(0.5, 0.6, 0.7),
            Vec2::new(0.25, 0.75),
        );

        let bytes: &[u8] = bytemuck::bytes_of(&vertex);
        assert_eq!(bytes.len(), 32);

        let back: &Vertex = bytemuck::from_bytes(bytes);
        assert_eq!(*back, vertex);
    }
}
