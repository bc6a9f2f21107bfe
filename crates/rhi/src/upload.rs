//! Staging upload path for device-local resources.
//!
//! Device-local memory is not writable from the CPU. Data reaches it through
//! a transient host-visible staging buffer and a one-shot command buffer:
//! create, map, memcpy, record a copy, submit, block until the queue is
//! idle, destroy the staging buffer.
//!
//! The blocking wait is deliberate. Uploads happen at startup, off the
//! per-frame path, and the simple synchronous protocol removes a whole class
//! of lifetime questions about when the staging buffer may be freed.

use ash::vk;
use tracing::debug;

use crate::buffer::{Buffer, BufferUsage};
use crate::command::{CommandBuffer, CommandPool};
use crate::error::RhiResult;

/// Records commands into a freshly allocated buffer, submits them to the
/// graphics queue, and blocks until the queue is idle.
///
/// The command buffer is allocated from `pool` (which should be transient),
/// begun with the one-time-submit flag, and freed before returning.
///
/// # Errors
///
/// Returns an error if allocation, recording, or submission fails.
pub fn submit_one_shot<F>(pool: &CommandPool, record: F) -> RhiResult<()>
where
    F: FnOnce(&CommandBuffer) -> RhiResult<()>,
{
    let device = pool.device().clone();
    let cmd = CommandBuffer::new(device.clone(), pool)?;

    cmd.begin()?;
    record(&cmd)?;
    cmd.end()?;

    let command_buffers = [cmd.handle()];
    let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

    unsafe {
        device.handle().queue_submit(
            device.graphics_queue(),
            &[submit_info],
            vk::Fence::null(),
        )?;
        // Block until the copy has fully executed; the staging resources a
        // caller holds may be freed as soon as this returns.
        device.handle().queue_wait_idle(device.graphics_queue())?;
    }

    pool.free_command_buffer(cmd.handle());

    Ok(())
}

/// Uploads `data` into a new device-local buffer of the given usage.
///
/// Allocates a staging buffer sized to the payload, writes the bytes through
/// its persistent mapping, records a buffer-to-buffer copy, and blocks until
/// the transfer completes. The staging buffer is destroyed on return.
///
/// # Errors
///
/// Returns an error if any allocation, mapping, or submission step fails.
pub fn upload_to_buffer(
    pool: &CommandPool,
    usage: BufferUsage,
    data: &[u8],
) -> RhiResult<Buffer> {
    let device = pool.device().clone();

    let staging = Buffer::new_with_data(device.clone(), BufferUsage::Staging, data)?;
    let destination = Buffer::new(device, usage, data.len() as vk::DeviceSize)?;

    submit_one_shot(pool, |cmd| {
        let region = vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size: data.len() as vk::DeviceSize,
        };
        cmd.copy_buffer(staging.handle(), destination.handle(), &[region]);
        Ok(())
    })?;

    debug!(
        "Uploaded {} bytes into device-local {} buffer",
        data.len(),
        usage.name()
    );

    Ok(destination)
}
