//! GPU image management.
//!
//! This module wraps VkImage + VkImageView + allocation for the three image
//! roles the engine creates itself: the internal color render target the
//! frame loop draws into, the depth attachment, and sampled textures filled
//! through the upload path. Swapchain images are owned by the presentation
//! engine and never pass through here.

use std::sync::Arc;

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Format used for the internal color render target.
pub const DRAW_IMAGE_FORMAT: vk::Format = vk::Format::R16G16B16A16_SFLOAT;

/// Default depth buffer format (32-bit float).
pub const DEPTH_FORMAT: vk::Format = vk::Format::D32_SFLOAT;

/// GPU-owned 2D image with view and managed memory.
///
/// Resources are destroyed in order: view, image, allocation.
pub struct Image {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan image handle.
    image: vk::Image,
    /// Vulkan image view handle.
    image_view: vk::ImageView,
    /// GPU memory allocation.
    allocation: Option<Allocation>,
    /// Image format.
    format: vk::Format,
    /// Image dimensions.
    extent: vk::Extent2D,
}

impl Image {
    /// Creates a device-local 2D image with an associated view.
    ///
    /// # Arguments
    ///
    /// * `usage` - Vulkan usage flags for the image
    /// * `aspect` - Aspect for the image view (color or depth)
    ///
    /// # Errors
    ///
    /// Returns an error if the dimensions are zero or any creation step
    /// fails.
    pub fn new(
        device: Arc<Device>,
        width: u32,
        height: u32,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
        aspect: vk::ImageAspectFlags,
    ) -> RhiResult<Self> {
        if width == 0 || height == 0 {
            return Err(RhiError::InvalidHandle(
                "Image dimensions must be greater than 0".to_string(),
            ));
        }

        let extent = vk::Extent2D { width, height };

        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width,
                height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = unsafe { device.handle().create_image(&image_info, None)? };

        let requirements = unsafe { device.handle().get_image_memory_requirements(image) };

        let allocation = {
            let mut allocator = device.allocator().lock().unwrap();
            allocator.allocate(&AllocationCreateDesc {
                name: "image",
                requirements,
                location: MemoryLocation::GpuOnly,
                // Optimal tiling is not linear
                linear: false,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })?
        };

        unsafe {
            device
                .handle()
                .bind_image_memory(image, allocation.memory(), allocation.offset())?;
        }

        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(aspect)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );

        let image_view = unsafe { device.handle().create_image_view(&view_info, None)? };

        debug!("Created image: {}x{} ({:?})", width, height, format);

        Ok(Self {
            device,
            image,
            image_view,
            allocation: Some(allocation),
            format,
            extent,
        })
    }

    /// Creates the internal color render target.
    ///
    /// Usable as a color attachment and as both source and destination of
    /// transfer operations (the frame loop blits it into the swapchain).
    pub fn color_target(device: Arc<Device>, width: u32, height: u32) -> RhiResult<Self> {
        Self::new(
            device,
            width,
            height,
            DRAW_IMAGE_FORMAT,
            vk::ImageUsageFlags::COLOR_ATTACHMENT
                | vk::ImageUsageFlags::TRANSFER_SRC
                | vk::ImageUsageFlags::TRANSFER_DST,
            vk::ImageAspectFlags::COLOR,
        )
    }

    /// Creates a depth attachment.
    pub fn depth_target(device: Arc<Device>, width: u32, height: u32) -> RhiResult<Self> {
        Self::new(
            device,
            width,
            height,
            DEPTH_FORMAT,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            vk::ImageAspectFlags::DEPTH,
        )
    }

    /// Creates a sampled texture image, filled via the upload path.
    pub fn texture(
        device: Arc<Device>,
        width: u32,
        height: u32,
        format: vk::Format,
    ) -> RhiResult<Self> {
        Self::new(
            device,
            width,
            height,
            format,
            vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST,
            vk::ImageAspectFlags::COLOR,
        )
    }

    /// Returns the Vulkan image handle.
    #[inline]
    pub fn handle(&self) -> vk::Image {
        self.image
    }

    /// Returns the Vulkan image view handle.
    #[inline]
    pub fn view(&self) -> vk::ImageView {
        self.image_view
    }

    /// Returns the image format.
    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }

    /// Returns the image extent.
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_image_view(self.image_view, None);
            self.device.handle().destroy_image(self.image, None);
        }

        if let Some(allocation) = self.allocation.take() {
            let mut allocator = self.device.allocator().lock().unwrap();
            if let Err(e) = allocator.free(allocation) {
                tracing::error!("Failed to free image allocation: {:?}", e);
            }
        }

        debug!(
            "Destroyed image: {}x{}",
            self.extent.width, self.extent.height
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_format_is_depth_capable() {
        assert!(matches!(
            DEPTH_FORMAT,
            vk::Format::D32_SFLOAT
                | vk::Format::D32_SFLOAT_S8_UINT
                | vk::Format::D24_UNORM_S8_UINT
                | vk::Format::D16_UNORM
        ));
    }

    #[test]
    fn test_draw_image_format_is_wide_color() {
        assert_eq!(DRAW_IMAGE_FORMAT, vk::Format::R16G16B16A16_SFLOAT);
    }
}
