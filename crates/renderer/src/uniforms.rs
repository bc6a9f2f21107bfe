//! Per-frame uniform data.
//!
//! One uniform buffer exists per frame slot so the CPU never overwrites
//! transform data the GPU may still be reading from the previous frame.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Model/view/projection bundle written once per frame.
///
/// Matches the shader's uniform block at binding 0. Mat4 columns keep the
/// struct 16-byte aligned throughout; total size is 192 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SceneUniform {
    /// Model matrix (object to world space).
    pub model: Mat4,
    /// View matrix (world to view space).
    pub view: Mat4,
    /// Projection matrix (view to clip space).
    pub proj: Mat4,
}

impl SceneUniform {
    /// Size of the struct in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Builds the frame's transforms for the spinning-model scene.
    ///
    /// The model rotates 90 degrees per second around +Z; the camera looks
    /// at the origin from (2, 2, 2) with +Z up. The projection's Y axis is
    /// flipped because glam produces GL-style clip coordinates while Vulkan
    /// puts Y downward.
    pub fn spinning(elapsed_secs: f32, aspect_ratio: f32) -> Self {
        let model = Mat4::from_rotation_z(elapsed_secs * 90.0f32.to_radians());

        let view = Mat4::look_at_rh(Vec3::new(2.0, 2.0, 2.0), Vec3::ZERO, Vec3::Z);

        let mut proj = Mat4::perspective_rh(45.0f32.to_radians(), aspect_ratio, 0.1, 10.0);
        proj.y_axis.y *= -1.0;

        Self { model, view, proj }
    }

    /// Returns the uniform as raw bytes for a mapped buffer write.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_uniform_size() {
        // 3 x Mat4 (3 x 64) = 192 bytes
        assert_eq!(SceneUniform::SIZE, 192);
    }

    #[test]
    fn test_scene_uniform_alignment() {
        // Mat4 requires 16-byte alignment on the GPU side
        assert_eq!(std::mem::align_of::<SceneUniform>(), 16);
    }

    #[test]
    fn test_spinning_is_deterministic() {
        let a = SceneUniform::spinning(1.5, 16.0 / 9.0);
        let b = SceneUniform::spinning(1.5, 16.0 / 9.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_spinning_rotates_over_time() {
        let start = SceneUniform::spinning(0.0, 1.0);
        let later = SceneUniform::spinning(1.0, 1.0);
        assert_eq!(start.model, Mat4::IDENTITY);
        assert_ne!(later.model, start.model);
        // View and projection stay fixed.
        assert_eq!(later.view, start.view);
        assert_eq!(later.proj, start.proj);
    }

    #[test]
    fn test_projection_flips_y() {
        // glam produces a positive Y scale; the Vulkan flip must negate it.
        let uniform = SceneUniform::spinning(0.0, 1.0);
        assert!(uniform.proj.y_axis.y < 0.0);
    }

    #[test]
    fn test_as_bytes_length() {
        let uniform = SceneUniform::spinning(0.5, 1.0);
        assert_eq!(uniform.as_bytes().len(), SceneUniform::SIZE);
    }
}
