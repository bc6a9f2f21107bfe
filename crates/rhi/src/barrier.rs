//! Image layout transitions and image-to-image blits.
//!
//! A layout transition is a declared change in how an image's memory is
//! organized for a given pipeline stage, and it implies a cross-stage memory
//! dependency. Getting the stage and access masks wrong does not produce a
//! clean error at runtime; it produces intermittent corruption or device
//! hangs. This module therefore centralizes mask selection in a single
//! closed table over the transitions the engine actually performs: callers
//! may only request pairs the table recognizes, and anything else fails
//! with [`RhiError::UnsupportedTransition`].

use ash::vk;

use crate::command::CommandBuffer;
use crate::error::{RhiError, RhiResult};

/// Stage and access masks for one recognized layout transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionMasks {
    pub src_stage: vk::PipelineStageFlags,
    pub src_access: vk::AccessFlags,
    pub dst_stage: vk::PipelineStageFlags,
    pub dst_access: vk::AccessFlags,
}

/// Looks up the stage/access masks for a layout transition pair.
///
/// # Errors
///
/// Returns [`RhiError::UnsupportedTransition`] for any pair outside the
/// recognized set. This is a programmer error, not a condition to recover
/// from.
pub fn transition_masks(
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) -> RhiResult<TransitionMasks> {
    use vk::AccessFlags as A;
    use vk::ImageLayout as L;
    use vk::PipelineStageFlags as S;

    let masks = match (old_layout, new_layout) {
        // Upload path: image about to receive a buffer copy
        (L::UNDEFINED, L::TRANSFER_DST_OPTIMAL) => TransitionMasks {
            src_stage: S::TOP_OF_PIPE,
            src_access: A::empty(),
            dst_stage: S::TRANSFER,
            dst_access: A::TRANSFER_WRITE,
        },
        // Upload path: copied texture becomes shader-readable
        (L::TRANSFER_DST_OPTIMAL, L::SHADER_READ_ONLY_OPTIMAL) => TransitionMasks {
            src_stage: S::TRANSFER,
            src_access: A::TRANSFER_WRITE,
            dst_stage: S::FRAGMENT_SHADER,
            dst_access: A::SHADER_READ,
        },
        // Clear/compute-style writes through the general layout
        (L::UNDEFINED, L::GENERAL) => TransitionMasks {
            src_stage: S::TOP_OF_PIPE,
            src_access: A::empty(),
            dst_stage: S::TRANSFER,
            dst_access: A::TRANSFER_WRITE,
        },
        (L::GENERAL, L::PRESENT_SRC_KHR) => TransitionMasks {
            src_stage: S::TRANSFER,
            src_access: A::TRANSFER_WRITE,
            dst_stage: S::BOTTOM_OF_PIPE,
            dst_access: A::empty(),
        },
        // Frame loop: attachments at the start of a frame
        (L::UNDEFINED, L::COLOR_ATTACHMENT_OPTIMAL) => TransitionMasks {
            src_stage: S::TOP_OF_PIPE,
            src_access: A::empty(),
            dst_stage: S::COLOR_ATTACHMENT_OUTPUT,
            dst_access: A::COLOR_ATTACHMENT_WRITE,
        },
        (L::UNDEFINED, L::DEPTH_ATTACHMENT_OPTIMAL) => TransitionMasks {
            src_stage: S::TOP_OF_PIPE,
            src_access: A::empty(),
            dst_stage: S::EARLY_FRAGMENT_TESTS,
            dst_access: A::DEPTH_STENCIL_ATTACHMENT_WRITE,
        },
        // Frame loop: rendered image becomes a blit source
        (L::COLOR_ATTACHMENT_OPTIMAL, L::TRANSFER_SRC_OPTIMAL) => TransitionMasks {
            src_stage: S::COLOR_ATTACHMENT_OUTPUT,
            src_access: A::COLOR_ATTACHMENT_WRITE,
            dst_stage: S::TRANSFER,
            dst_access: A::TRANSFER_READ,
        },
        // Frame loop: blitted swapchain image becomes presentable
        (L::TRANSFER_DST_OPTIMAL, L::PRESENT_SRC_KHR) => TransitionMasks {
            src_stage: S::TRANSFER,
            src_access: A::TRANSFER_WRITE,
            dst_stage: S::BOTTOM_OF_PIPE,
            dst_access: A::empty(),
        },
        // Direct-to-swapchain rendering
        (L::COLOR_ATTACHMENT_OPTIMAL, L::PRESENT_SRC_KHR) => TransitionMasks {
            src_stage: S::COLOR_ATTACHMENT_OUTPUT,
            src_access: A::COLOR_ATTACHMENT_WRITE,
            dst_stage: S::BOTTOM_OF_PIPE,
            dst_access: A::empty(),
        },
        (from, to) => return Err(RhiError::UnsupportedTransition { from, to }),
    };

    Ok(masks)
}

/// Records an image layout transition into the command buffer.
///
/// Builds a single image memory barrier whose stage/access masks come from
/// [`transition_masks`]. The subresource aspect is derived from the target
/// layout (depth layouts use the depth aspect, everything else color).
///
/// # Errors
///
/// Returns [`RhiError::UnsupportedTransition`] when the layout pair is not
/// recognized; nothing is recorded in that case.
pub fn transition(
    cmd: &CommandBuffer,
    image: vk::Image,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) -> RhiResult<()> {
    let masks = transition_masks(old_layout, new_layout)?;

    let aspect_mask = if new_layout == vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL {
        vk::ImageAspectFlags::DEPTH
    } else {
        vk::ImageAspectFlags::COLOR
    };

    let barrier = vk::ImageMemoryBarrier::default()
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(
            vk::ImageSubresourceRange::default()
                .aspect_mask(aspect_mask)
                .base_mip_level(0)
                .level_count(1)
                .base_array_layer(0)
                .layer_count(1),
        )
        .src_access_mask(masks.src_access)
        .dst_access_mask(masks.dst_access);

    cmd.pipeline_barrier(masks.src_stage, masks.dst_stage, &[barrier]);

    Ok(())
}

/// Records a filtered blit from one image to another.
///
/// The source must be in TRANSFER_SRC_OPTIMAL and the destination in
/// TRANSFER_DST_OPTIMAL. The images may differ in size and format; the blit
/// scales with linear filtering. Used to present the internally-rendered
/// image into the swapchain image each frame.
pub fn copy_image_to_image(
    cmd: &CommandBuffer,
    src: vk::Image,
    dst: vk::Image,
    src_extent: vk::Extent2D,
    dst_extent: vk::Extent2D,
) {
    let subresource = vk::ImageSubresourceLayers {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        mip_level: 0,
        base_array_layer: 0,
        layer_count: 1,
    };

    let region = vk::ImageBlit {
        src_subresource: subresource,
        src_offsets: [
            vk::Offset3D { x: 0, y: 0, z: 0 },
            vk::Offset3D {
                x: src_extent.width as i32,
                y: src_extent.height as i32,
                z: 1,
            },
        ],
        dst_subresource: subresource,
        dst_offsets: [
            vk::Offset3D { x: 0, y: 0, z: 0 },
            vk::Offset3D {
                x: dst_extent.width as i32,
                y: dst_extent.height as i32,
                z: 1,
            },
        ],
    };

    cmd.blit_image(
        src,
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        dst,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        &[region],
        vk::Filter::LINEAR,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use vk::AccessFlags as A;
    use vk::ImageLayout as L;
    use vk::PipelineStageFlags as S;

    #[test]
    fn test_undefined_to_transfer_dst() {
        let masks = transition_masks(L::UNDEFINED, L::TRANSFER_DST_OPTIMAL).unwrap();
        assert_eq!(masks.src_stage, S::TOP_OF_PIPE);
        assert_eq!(masks.src_access, A::empty());
        assert_eq!(masks.dst_stage, S::TRANSFER);
        assert_eq!(masks.dst_access, A::TRANSFER_WRITE);
    }

    #[test]
    fn test_transfer_dst_to_shader_read() {
        let masks = transition_masks(L::TRANSFER_DST_OPTIMAL, L::SHADER_READ_ONLY_OPTIMAL).unwrap();
        assert_eq!(masks.src_stage, S::TRANSFER);
        assert_eq!(masks.src_access, A::TRANSFER_WRITE);
        assert_eq!(masks.dst_stage, S::FRAGMENT_SHADER);
        assert_eq!(masks.dst_access, A::SHADER_READ);
    }

    #[test]
    fn test_undefined_to_general_and_back_to_present() {
        let to_general = transition_masks(L::UNDEFINED, L::GENERAL).unwrap();
        assert_eq!(to_general.dst_stage, S::TRANSFER);

        let to_present = transition_masks(L::GENERAL, L::PRESENT_SRC_KHR).unwrap();
        assert_eq!(to_present.src_access, A::TRANSFER_WRITE);
        assert_eq!(to_present.dst_stage, S::BOTTOM_OF_PIPE);
        assert_eq!(to_present.dst_access, A::empty());
    }

    #[test]
    fn test_attachment_transitions() {
        let color = transition_masks(L::UNDEFINED, L::COLOR_ATTACHMENT_OPTIMAL).unwrap();
        assert_eq!(color.dst_stage, S::COLOR_ATTACHMENT_OUTPUT);
        assert_eq!(color.dst_access, A::COLOR_ATTACHMENT_WRITE);

        let depth = transition_masks(L::UNDEFINED, L::DEPTH_ATTACHMENT_OPTIMAL).unwrap();
        assert_eq!(depth.dst_stage, S::EARLY_FRAGMENT_TESTS);
        assert_eq!(depth.dst_access, A::DEPTH_STENCIL_ATTACHMENT_WRITE);
    }

    #[test]
    fn test_blit_chain_transitions() {
        let to_src = transition_masks(L::COLOR_ATTACHMENT_OPTIMAL, L::TRANSFER_SRC_OPTIMAL).unwrap();
        assert_eq!(to_src.src_access, A::COLOR_ATTACHMENT_WRITE);
        assert_eq!(to_src.dst_access, A::TRANSFER_READ);

        let to_present = transition_masks(L::TRANSFER_DST_OPTIMAL, L::PRESENT_SRC_KHR).unwrap();
        assert_eq!(to_present.src_stage, S::TRANSFER);
        assert_eq!(to_present.dst_stage, S::BOTTOM_OF_PIPE);
    }

    #[test]
    fn test_unrecognized_pair_is_rejected() {
        let result = transition_masks(L::PRESENT_SRC_KHR, L::TRANSFER_DST_OPTIMAL);
        match result {
            Err(RhiError::UnsupportedTransition { from, to }) => {
                assert_eq!(from, L::PRESENT_SRC_KHR);
                assert_eq!(to, L::TRANSFER_DST_OPTIMAL);
            }
            other => panic!("expected UnsupportedTransition, got {:?}", other),
        }
    }

    #[test]
    fn test_reverse_of_recognized_pair_is_rejected() {
        // The table is directional; the reverse of a valid pair must not
        // silently reuse its masks.
        assert!(transition_masks(L::TRANSFER_DST_OPTIMAL, L::UNDEFINED).is_err());
        assert!(transition_masks(L::SHADER_READ_ONLY_OPTIMAL, L::TRANSFER_DST_OPTIMAL).is_err());
    }
}
