//! Swapchain management.
//!
//! This module handles VkSwapchainKHR creation, image acquisition, and
//! presentation.
//!
//! # Overview
//!
//! The [`Swapchain`] struct provides a safe abstraction over the Vulkan
//! swapchain, including:
//! - Surface capability querying
//! - Format, present mode, extent, and image count selection
//! - Image view creation and management
//! - Recreation after resize or out-of-date/suboptimal results
//!
//! The swapchain images themselves are owned by the presentation engine;
//! only the image views created here belong to the engine.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info, warn};

use crate::device::Device;
use crate::error::RhiError;
use crate::instance::Instance;

/// Swapchain surface support details.
#[derive(Debug, Clone)]
pub struct SwapchainSupportDetails {
    /// Surface capabilities (min/max image count, extents, transforms).
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats (format and color space combinations).
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes.
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupportDetails {
    /// Queries swapchain support details for a physical device and surface.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the surface queries fail.
    pub fn query(
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
    ) -> Result<Self, RhiError> {
        let capabilities = unsafe {
            surface_loader.get_physical_device_surface_capabilities(physical_device, surface)?
        };

        let formats = unsafe {
            surface_loader.get_physical_device_surface_formats(physical_device, surface)?
        };

        let present_modes = unsafe {
            surface_loader.get_physical_device_surface_present_modes(physical_device, surface)?
        };

        debug!(
            "Swapchain support: {} formats, {} present modes, image count {}-{}",
            formats.len(),
            present_modes.len(),
            capabilities.min_image_count,
            if capabilities.max_image_count == 0 {
                "unbounded".to_string()
            } else {
                capabilities.max_image_count.to_string()
            }
        );

        Ok(Self {
            capabilities,
            formats,
            present_modes,
        })
    }

    /// Returns true if at least one format and one present mode are available.
    #[inline]
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// Vulkan swapchain wrapper.
///
/// Manages the swapchain handle and the engine-owned image views. Only one
/// thread may interact with the swapchain at a time.
pub struct Swapchain {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Swapchain extension loader.
    swapchain_loader: ash::khr::swapchain::Device,
    /// Swapchain handle.
    swapchain: vk::SwapchainKHR,
    /// Swapchain images (owned by the presentation engine).
    images: Vec<vk::Image>,
    /// Image views for the swapchain images.
    image_views: Vec<vk::ImageView>,
    /// Swapchain image format.
    format: vk::Format,
    /// Swapchain extent (resolution).
    extent: vk::Extent2D,
    /// Present mode.
    present_mode: vk::PresentModeKHR,
}

impl Swapchain {
    /// Creates a new swapchain.
    ///
    /// Selection rules:
    /// - Format: B8G8R8A8_SRGB with SRGB_NONLINEAR, else B8G8R8A8_UNORM with
    ///   SRGB_NONLINEAR, else the first reported format
    /// - Present mode: MAILBOX when available, else FIFO
    /// - Image count: minimum + 1, capped at the surface maximum
    /// - Usage: COLOR_ATTACHMENT | TRANSFER_DST (the frame loop blits the
    ///   internal render target into the swapchain image)
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::SwapchainCreation`] on any creation-time failure.
    pub fn new(
        instance: &Instance,
        device: Arc<Device>,
        surface: vk::SurfaceKHR,
        width: u32,
        height: u32,
    ) -> Result<Self, RhiError> {
        Self::create_internal(
            instance,
            device,
            surface,
            width,
            height,
            vk::SwapchainKHR::null(),
        )
    }

    fn create_internal(
        instance: &Instance,
        device: Arc<Device>,
        surface: vk::SurfaceKHR,
        width: u32,
        height: u32,
        old_swapchain: vk::SwapchainKHR,
    ) -> Result<Self, RhiError> {
        let swapchain_loader = ash::khr::swapchain::Device::new(instance.handle(), device.handle());
        let surface_loader = ash::khr::surface::Instance::new(instance.entry(), instance.handle());

        let support =
            SwapchainSupportDetails::query(device.physical_device(), surface, &surface_loader)?;

        if !support.is_adequate() {
            return Err(RhiError::SwapchainCreation(
                "surface reports no formats or present modes".to_string(),
            ));
        }

        let surface_format = choose_surface_format(&support.formats);
        let present_mode = choose_present_mode(&support.present_modes);
        let extent = choose_extent(&support.capabilities, width, height);
        let image_count = determine_image_count(&support.capabilities);

        info!(
            "Creating swapchain: {}x{}, format {:?}, present mode {:?}, {} images",
            extent.width, extent.height, surface_format.format, present_mode, image_count
        );

        // Graphics and present may live in different families; share the
        // images across both in that case.
        let queue_families = device.queue_families();
        let graphics_family = queue_families.graphics_family.expect("validated at selection");
        let present_family = queue_families.present_family.expect("validated at selection");
        let family_indices = [graphics_family, present_family];

        let (sharing_mode, family_indices_slice) = if graphics_family != present_family {
            debug!(
                "CONCURRENT sharing between graphics ({}) and present ({}) families",
                graphics_family, present_family
            );
            (vk::SharingMode::CONCURRENT, family_indices.as_slice())
        } else {
            (vk::SharingMode::EXCLUSIVE, &[][..])
        };

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(family_indices_slice)
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = unsafe {
            swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| RhiError::SwapchainCreation(format!("create_swapchain: {:?}", e)))?
        };

        let images = unsafe {
            swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(|e| RhiError::SwapchainCreation(format!("get_swapchain_images: {:?}", e)))?
        };
        info!("Swapchain created with {} images", images.len());

        let image_views = create_image_views(&device, &images, surface_format.format)?;

        Ok(Self {
            device,
            swapchain_loader,
            swapchain,
            images,
            image_views,
            format: surface_format.format,
            extent,
            present_mode,
        })
    }

    /// Recreates the swapchain for a new window size.
    ///
    /// Call when the window is resized or when acquire/present reports an
    /// out-of-date or suboptimal swapchain. The caller must not pass a
    /// zero-sized extent; the frame loop defers rebuilds while minimized.
    ///
    /// # Errors
    ///
    /// Returns an error if recreation fails.
    pub fn recreate(
        &mut self,
        instance: &Instance,
        surface: vk::SurfaceKHR,
        width: u32,
        height: u32,
    ) -> Result<(), RhiError> {
        // No resource referencing the old swapchain may still be in flight.
        self.device.wait_idle()?;

        info!("Recreating swapchain for new size {}x{}", width, height);

        self.destroy_image_views();

        let old_swapchain = self.swapchain;
        let mut replacement = Self::create_internal(
            instance,
            self.device.clone(),
            surface,
            width,
            height,
            old_swapchain,
        )?;

        unsafe {
            self.swapchain_loader.destroy_swapchain(old_swapchain, None);
        }

        self.swapchain = replacement.swapchain;
        self.images = std::mem::take(&mut replacement.images);
        self.image_views = std::mem::take(&mut replacement.image_views);
        self.format = replacement.format;
        self.extent = replacement.extent;
        self.present_mode = replacement.present_mode;

        // Prevent the temporary's Drop from freeing the handle we just took.
        replacement.swapchain = vk::SwapchainKHR::null();

        Ok(())
    }

    /// Acquires the next swapchain image for rendering.
    ///
    /// Signals `semaphore` when the image is available. Returns the image
    /// index and whether the swapchain is suboptimal. An out-of-date
    /// swapchain surfaces as `Err(vk::Result::ERROR_OUT_OF_DATE_KHR)` for
    /// the orchestrator to handle.
    pub fn acquire_next_image(&self, semaphore: vk::Semaphore) -> Result<(u32, bool), vk::Result> {
        unsafe {
            self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                semaphore,
                vk::Fence::null(),
            )
        }
    }

    /// Presents the rendered image to the screen.
    ///
    /// Waits on `wait_semaphore` before presenting. Returns whether the
    /// swapchain is suboptimal; out-of-date surfaces as an error result.
    pub fn present(
        &self,
        queue: vk::Queue,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> Result<bool, vk::Result> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [wait_semaphore];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        unsafe { self.swapchain_loader.queue_present(queue, &present_info) }
    }

    /// Returns the swapchain image format.
    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }

    /// Returns the swapchain extent (resolution).
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Returns the present mode.
    #[inline]
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    /// Returns the number of swapchain images.
    #[inline]
    pub fn image_count(&self) -> u32 {
        self.images.len() as u32
    }

    /// Returns the swapchain image at the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn image(&self, index: usize) -> vk::Image {
        self.images[index]
    }

    /// Returns the image view at the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn image_view(&self, index: usize) -> vk::ImageView {
        self.image_views[index]
    }

    fn destroy_image_views(&mut self) {
        for &image_view in &self.image_views {
            unsafe {
                self.device.handle().destroy_image_view(image_view, None);
            }
        }
        self.image_views.clear();
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        // Views first, then the swapchain handle. The images belong to the
        // presentation engine and are never destroyed here.
        self.destroy_image_views();

        if self.swapchain != vk::SwapchainKHR::null() {
            unsafe {
                self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            }
            info!(
                "Swapchain destroyed ({}x{}, {} images)",
                self.extent.width,
                self.extent.height,
                self.images.len()
            );
        }
    }
}

/// Chooses the surface format by preference order.
///
/// Prefers an 8-bit BGRA format with the standard nonlinear SRGB color
/// space, falling back to the first available format.
fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    let preferred = formats.iter().find(|f| {
        f.format == vk::Format::B8G8R8A8_SRGB && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
    });

    if let Some(&format) = preferred {
        return format;
    }

    let alternative = formats.iter().find(|f| {
        f.format == vk::Format::B8G8R8A8_UNORM && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
    });

    if let Some(&format) = alternative {
        warn!("Preferred SRGB format unavailable, using B8G8R8A8_UNORM");
        return format;
    }

    warn!("Using first available surface format: {:?}", formats[0].format);
    formats[0]
}

/// Chooses the present mode by preference order.
///
/// Prefers MAILBOX (low latency, no tearing); FIFO is guaranteed to be
/// available and serves as the fallback.
fn choose_present_mode(present_modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if present_modes.contains(&vk::PresentModeKHR::MAILBOX) {
        return vk::PresentModeKHR::MAILBOX;
    }

    vk::PresentModeKHR::FIFO
}

/// Chooses the swapchain extent.
///
/// When the surface reports a defined current extent it is used verbatim.
/// When it reports the undefined sentinel (u32::MAX), the framebuffer size
/// is clamped to the surface's min/max image extents on both axes.
fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    width: u32,
    height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    vk::Extent2D {
        width: width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

/// Determines the swapchain image count.
///
/// One more than the minimum, capped at the maximum when the surface
/// reports one (0 means unbounded).
fn determine_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let preferred = capabilities.min_image_count + 1;

    if capabilities.max_image_count > 0 {
        preferred.min(capabilities.max_image_count)
    } else {
        preferred
    }
}

/// Creates image views for the swapchain images.
fn create_image_views(
    device: &Device,
    images: &[vk::Image],
    format: vk::Format,
) -> Result<Vec<vk::ImageView>, RhiError> {
    let mut image_views = Vec::with_capacity(images.len());

    for (i, &image) in images.iter().enumerate() {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );

        let image_view = unsafe {
            device
                .handle()
                .create_image_view(&create_info, None)
                .map_err(|e| {
                    RhiError::SwapchainCreation(format!("image view {} creation: {:?}", i, e))
                })?
        };

        image_views.push(image_view);
    }

    debug!("Created {} swapchain image views", image_views.len());
    Ok(image_views)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(
        current: (u32, u32),
        min_extent: (u32, u32),
        max_extent: (u32, u32),
        min_count: u32,
        max_count: u32,
    ) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: current.0,
                height: current.1,
            },
            min_image_extent: vk::Extent2D {
                width: min_extent.0,
                height: min_extent.1,
            },
            max_image_extent: vk::Extent2D {
                width: max_extent.0,
                height: max_extent.1,
            },
            min_image_count: min_count,
            max_image_count: max_count,
            ..Default::default()
        }
    }

    #[test]
    fn test_choose_surface_format_prefers_bgra_srgb() {
        let formats = vec![
            vk::SurfaceFormatKHR {
                format: vk::Format::R8G8B8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
        ];

        let selected = choose_surface_format(&formats);
        assert_eq!(selected.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(selected.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn test_choose_surface_format_unorm_fallback() {
        let formats = vec![
            vk::SurfaceFormatKHR {
                format: vk::Format::R8G8B8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
        ];

        assert_eq!(
            choose_surface_format(&formats).format,
            vk::Format::B8G8R8A8_UNORM
        );
    }

    #[test]
    fn test_choose_surface_format_first_as_last_resort() {
        let formats = vec![vk::SurfaceFormatKHR {
            format: vk::Format::R8G8B8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }];

        assert_eq!(
            choose_surface_format(&formats).format,
            vk::Format::R8G8B8A8_UNORM
        );
    }

    #[test]
    fn test_choose_present_mode_prefers_mailbox() {
        let modes = vec![
            vk::PresentModeKHR::FIFO,
            vk::PresentModeKHR::MAILBOX,
            vk::PresentModeKHR::IMMEDIATE,
        ];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::MAILBOX);
    }

    #[test]
    fn test_choose_present_mode_fifo_fallback() {
        let modes = vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn test_choose_extent_uses_defined_current_extent() {
        let capabilities = caps((1920, 1080), (1, 1), (4096, 4096), 2, 0);

        // The window size must not matter when the surface defines the extent.
        let extent = choose_extent(&capabilities, 800, 600);
        assert_eq!(extent.width, 1920);
        assert_eq!(extent.height, 1080);
    }

    #[test]
    fn test_choose_extent_clamps_to_both_bounds() {
        let capabilities = caps((u32::MAX, u32::MAX), (100, 100), (2000, 2000), 2, 0);

        // Above max
        let extent = choose_extent(&capabilities, 3000, 3000);
        assert_eq!(extent.width, 2000);
        assert_eq!(extent.height, 2000);

        // Below min
        let extent = choose_extent(&capabilities, 50, 50);
        assert_eq!(extent.width, 100);
        assert_eq!(extent.height, 100);

        // Within range
        let extent = choose_extent(&capabilities, 800, 600);
        assert_eq!(extent.width, 800);
        assert_eq!(extent.height, 600);
    }

    #[test]
    fn test_determine_image_count_capped_by_max() {
        let capabilities = caps((0, 0), (0, 0), (0, 0), 2, 3);
        assert_eq!(determine_image_count(&capabilities), 3);
    }

    #[test]
    fn test_determine_image_count_min_equals_max() {
        let capabilities = caps((0, 0), (0, 0), (0, 0), 3, 3);
        assert_eq!(determine_image_count(&capabilities), 3);
    }

    #[test]
    fn test_determine_image_count_unbounded_max() {
        let capabilities = caps((0, 0), (0, 0), (0, 0), 2, 0);
        assert_eq!(determine_image_count(&capabilities), 3);
    }

    #[test]
    fn test_selection_is_deterministic() {
        // Recreating with identical support inputs must yield identical
        // format and image count choices.
        let formats = vec![
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
        ];
        let capabilities = caps((800, 600), (1, 1), (4096, 4096), 2, 4);

        let first = (
            choose_surface_format(&formats),
            determine_image_count(&capabilities),
            choose_extent(&capabilities, 800, 600),
        );
        let second = (
            choose_surface_format(&formats),
            determine_image_count(&capabilities),
            choose_extent(&capabilities, 800, 600),
        );

        assert_eq!(first.0.format, second.0.format);
        assert_eq!(first.1, second.1);
        assert_eq!(first.2.width, second.2.width);
        assert_eq!(first.2.height, second.2.height);
    }

    #[test]
    fn test_support_details_adequacy() {
        let adequate = SwapchainSupportDetails {
            capabilities: vk::SurfaceCapabilitiesKHR::default(),
            formats: vec![vk::SurfaceFormatKHR::default()],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        };
        assert!(adequate.is_adequate());

        let no_formats = SwapchainSupportDetails {
            capabilities: vk::SurfaceCapabilitiesKHR::default(),
            formats: vec![],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        };
        assert!(!no_formats.is_adequate());
    }
}
