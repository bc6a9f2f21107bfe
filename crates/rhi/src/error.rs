//! RHI-specific error types.

use ash::vk;
use thiserror::Error;

/// RHI-specific error type.
#[derive(Error, Debug)]
pub enum RhiError {
    /// Vulkan API error
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// Failed to load the Vulkan library
    #[error("Failed to load Vulkan: {0}")]
    Loading(#[from] ash::LoadingError),

    /// GPU allocator error
    #[error("Allocator error: {0}")]
    Allocator(#[from] gpu_allocator::AllocationError),

    /// No physical device satisfied the engine's requirements
    #[error("No suitable GPU found")]
    NoSuitableDevice,

    /// Logical device creation failed
    #[error("Device creation failed: {0}")]
    DeviceCreation(vk::Result),

    /// Swapchain creation failed
    #[error("Swapchain creation failed: {0}")]
    SwapchainCreation(String),

    /// An image layout transition pair the barrier module does not recognize.
    /// This is a programmer error, not a runtime condition to recover from.
    #[error("Unsupported layout transition: {from:?} -> {to:?}")]
    UnsupportedTransition {
        from: vk::ImageLayout,
        to: vk::ImageLayout,
    },

    /// Shader loading or module creation error
    #[error("Shader error: {0}")]
    Shader(String),

    /// Surface creation error
    #[error("Surface error: {0}")]
    Surface(String),

    /// Pipeline creation error
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// Invalid argument or handle
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),
}

/// Result type alias for RHI operations.
pub type RhiResult<T> = std::result::Result<T, RhiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_transition_display_names_layouts() {
        let err = RhiError::UnsupportedTransition {
            from: vk::ImageLayout::UNDEFINED,
            to: vk::ImageLayout::PRESENT_SRC_KHR,
        };
        let msg = err.to_string();
        assert!(msg.contains("UNDEFINED"));
        assert!(msg.contains("PRESENT_SRC_KHR"));
    }

    #[test]
    fn test_vulkan_error_conversion() {
        let err: RhiError = vk::Result::ERROR_DEVICE_LOST.into();
        assert!(matches!(err, RhiError::Vulkan(vk::Result::ERROR_DEVICE_LOST)));
    }
}
