//! Per-frame resource ring.
//!
//! Each in-flight frame owns an independent set of recording and
//! synchronization resources so the CPU can prepare one frame while the GPU
//! executes another. A slot's fence must be signaled before the CPU touches
//! the slot's command buffer again; nothing else protects in-flight GPU
//! work from being overwritten.

use std::sync::Arc;

use tracing::{debug, info};

use helio_rhi::command::{CommandBuffer, CommandPool};
use helio_rhi::device::Device;
use helio_rhi::sync::{Fence, Semaphore};
use helio_rhi::RhiResult;

use crate::FRAMES_IN_FLIGHT;

/// One in-flight frame's recording and synchronization resources.
///
/// Holds its own command pool (with individual-buffer reset enabled) and one
/// primary command buffer, plus the three sync primitives the frame protocol
/// needs:
/// - `acquire_semaphore` — signaled when the swapchain image is available
/// - `render_semaphore` — signaled when rendering completes
/// - `render_fence` — signaled when the GPU finishes this slot's submission;
///   created pre-signaled so the very first wait does not block on a frame
///   that never existed
pub struct FrameSlot {
    command_pool: CommandPool,
    command_buffer: CommandBuffer,
    acquire_semaphore: Semaphore,
    render_semaphore: Semaphore,
    render_fence: Fence,
}

impl FrameSlot {
    fn new(device: Arc<Device>) -> RhiResult<Self> {
        let graphics_family = device
            .queue_families()
            .graphics_family
            .expect("validated at device selection");

        let command_pool = CommandPool::new(device.clone(), graphics_family)?;
        let command_buffer = CommandBuffer::new(device.clone(), &command_pool)?;
        let acquire_semaphore = Semaphore::new(device.clone())?;
        let render_semaphore = Semaphore::new(device.clone())?;
        let render_fence = Fence::new(device, true)?;

        Ok(Self {
            command_pool,
            command_buffer,
            acquire_semaphore,
            render_semaphore,
            render_fence,
        })
    }

    /// Returns the slot's command buffer.
    #[inline]
    pub fn command_buffer(&self) -> &CommandBuffer {
        &self.command_buffer
    }

    /// Returns the semaphore signaled when the acquired image is ready.
    #[inline]
    pub fn acquire_semaphore(&self) -> &Semaphore {
        &self.acquire_semaphore
    }

    /// Returns the semaphore signaled when rendering completes.
    #[inline]
    pub fn render_semaphore(&self) -> &Semaphore {
        &self.render_semaphore
    }

    /// Returns the fence guarding CPU reuse of this slot.
    #[inline]
    pub fn render_fence(&self) -> &Fence {
        &self.render_fence
    }
}

/// Fixed-size ring of [`FrameSlot`]s indexed by the frame counter.
pub struct FrameRing {
    device: Arc<Device>,
    slots: Vec<FrameSlot>,
    frame_number: u64,
}

impl FrameRing {
    /// Allocates all [`FRAMES_IN_FLIGHT`] slots up front.
    ///
    /// # Errors
    ///
    /// Any allocation failure here is fatal at startup.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let mut slots = Vec::with_capacity(FRAMES_IN_FLIGHT);

        for i in 0..FRAMES_IN_FLIGHT {
            slots.push(FrameSlot::new(device.clone())?);
            debug!("Created frame slot {}", i);
        }

        info!("Frame ring created with {} slots", FRAMES_IN_FLIGHT);

        Ok(Self {
            device,
            slots,
            frame_number: 0,
        })
    }

    /// Maps a frame counter to its slot index.
    #[inline]
    pub fn slot_index_for(frame_number: u64) -> usize {
        (frame_number % FRAMES_IN_FLIGHT as u64) as usize
    }

    /// Returns the slot index for the current frame.
    #[inline]
    pub fn slot_index(&self) -> usize {
        Self::slot_index_for(self.frame_number)
    }

    /// Returns the current frame's slot.
    #[inline]
    pub fn current(&self) -> &FrameSlot {
        &self.slots[self.slot_index()]
    }

    /// Returns the number of frames completed so far.
    #[inline]
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Advances to the next frame slot.
    pub fn advance(&mut self) {
        self.frame_number += 1;
    }

    /// Waits for every slot's fence, ensuring no frame is still in flight.
    ///
    /// # Errors
    ///
    /// Returns an error if any fence wait fails.
    pub fn wait_all(&self) -> RhiResult<()> {
        for slot in &self.slots {
            slot.render_fence.wait(u64::MAX)?;
        }
        Ok(())
    }

    /// Replaces every slot's semaphores with fresh ones.
    ///
    /// After a swapchain rebuild an acquire semaphore may be left signaled
    /// by an image that was never presented; new semaphores restore a known
    /// state.
    ///
    /// # Errors
    ///
    /// Returns an error if semaphore creation fails.
    pub fn reset_semaphores(&mut self) -> RhiResult<()> {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            slot.acquire_semaphore = Semaphore::new(self.device.clone())?;
            slot.render_semaphore = Semaphore::new(self.device.clone())?;
            debug!("Reset semaphores for frame slot {}", i);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_in_flight_is_two() {
        assert_eq!(FRAMES_IN_FLIGHT, 2);
    }

    #[test]
    fn test_slot_index_alternates() {
        let sequence: Vec<usize> = (0..5).map(FrameRing::slot_index_for).collect();
        assert_eq!(sequence, vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn test_slot_index_wraps_at_large_counters() {
        assert_eq!(FrameRing::slot_index_for(u64::MAX - 1), 0);
        assert_eq!(FrameRing::slot_index_for(u64::MAX), 1);
    }
}
