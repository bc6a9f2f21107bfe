//! Sampled textures.
//!
//! A texture is a device-local image filled through the staging upload path
//! plus a sampler. The upload records the full transition chain: the image
//! goes UNDEFINED → TRANSFER_DST before the buffer copy and
//! TRANSFER_DST → SHADER_READ_ONLY after it, both through the barrier
//! module.

use std::sync::Arc;

use ash::vk;
use tracing::info;

use crate::barrier;
use crate::buffer::{Buffer, BufferUsage};
use crate::command::CommandPool;
use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::image::Image;
use crate::upload::submit_one_shot;

/// A sampled 2D texture (image + view + sampler).
pub struct Texture {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Backing image and view.
    image: Image,
    /// Sampler for shader access.
    sampler: vk::Sampler,
}

impl Texture {
    /// Creates a texture from tightly-packed RGBA8 pixel data.
    ///
    /// The pixel buffer travels through a staging buffer and a blocking
    /// one-shot copy; it can be dropped as soon as this returns.
    ///
    /// # Arguments
    ///
    /// * `pool` - Transient command pool for the upload submission
    /// * `pixels` - RGBA8 data, `width * height * 4` bytes
    ///
    /// # Errors
    ///
    /// Returns an error if the pixel buffer size does not match the
    /// dimensions or any Vulkan step fails.
    pub fn from_rgba8(
        device: Arc<Device>,
        pool: &CommandPool,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> RhiResult<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(RhiError::InvalidHandle(format!(
                "Pixel buffer size {} does not match {}x{} RGBA8 ({})",
                pixels.len(),
                width,
                height,
                expected
            )));
        }

        let image = Image::texture(device.clone(), width, height, vk::Format::R8G8B8A8_SRGB)?;

        let staging = Buffer::new_with_data(device.clone(), BufferUsage::Staging, pixels)?;

        submit_one_shot(pool, |cmd| {
            barrier::transition(
                cmd,
                image.handle(),
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            )?;

            let region = vk::BufferImageCopy {
                buffer_offset: 0,
                // 0 means tightly packed
                buffer_row_length: 0,
                buffer_image_height: 0,
                image_subresource: vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                },
                image_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
                image_extent: vk::Extent3D {
                    width,
                    height,
                    depth: 1,
                },
            };
            cmd.copy_buffer_to_image(
                staging.handle(),
                image.handle(),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );

            barrier::transition(
                cmd,
                image.handle(),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            )?;

            Ok(())
        })?;

        drop(staging);

        let sampler = create_sampler(&device)?;

        info!("Texture uploaded: {}x{}", width, height);

        Ok(Self {
            device,
            image,
            sampler,
        })
    }

    /// Returns the image view handle.
    #[inline]
    pub fn view(&self) -> vk::ImageView {
        self.image.view()
    }

    /// Returns the sampler handle.
    #[inline]
    pub fn sampler(&self) -> vk::Sampler {
        self.sampler
    }

    /// Returns the texture extent.
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.image.extent()
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_sampler(self.sampler, None);
        }
        // The image drops itself afterwards.
    }
}

/// Creates a repeat-addressed linear sampler with anisotropy.
fn create_sampler(device: &Arc<Device>) -> RhiResult<vk::Sampler> {
    let create_info = vk::SamplerCreateInfo::default()
        .mag_filter(vk::Filter::LINEAR)
        .min_filter(vk::Filter::LINEAR)
        .address_mode_u(vk::SamplerAddressMode::REPEAT)
        .address_mode_v(vk::SamplerAddressMode::REPEAT)
        .address_mode_w(vk::SamplerAddressMode::REPEAT)
        .anisotropy_enable(true)
        .max_anisotropy(16.0)
        .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
        .unnormalized_coordinates(false)
        .compare_enable(false)
        .compare_op(vk::CompareOp::ALWAYS)
        .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
        .mip_lod_bias(0.0)
        .min_lod(0.0)
        .max_lod(0.0);

    let sampler = unsafe { device.handle().create_sampler(&create_info, None)? };
    Ok(sampler)
}
