//! GPU buffer management.
//!
//! This module handles vertex, index, uniform, and staging buffers with
//! gpu-allocator managed memory.
//!
//! Vertex and index buffers live in device-local memory and are filled
//! through the staging upload path ([`crate::upload`]). Uniform and staging
//! buffers use host-visible, host-coherent memory; mapped writes need no
//! explicit flush.

use std::sync::Arc;

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Buffer usage type.
///
/// Determines the Vulkan usage flags and the memory location the buffer is
/// allocated in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    /// Vertex buffer, device-local, filled via staging copy
    Vertex,
    /// Index buffer, device-local, filled via staging copy
    Index,
    /// Uniform buffer, host-visible and persistently mapped
    Uniform,
    /// Staging buffer, host-visible transfer source; never retained
    Staging,
}

impl BufferUsage {
    /// Converts to Vulkan buffer usage flags.
    pub fn to_vk_usage(self) -> vk::BufferUsageFlags {
        match self {
            BufferUsage::Vertex => {
                vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST
            }
            BufferUsage::Index => {
                vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST
            }
            BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
            BufferUsage::Staging => vk::BufferUsageFlags::TRANSFER_SRC,
        }
    }

    /// Returns the memory location for this buffer type.
    pub fn memory_location(self) -> MemoryLocation {
        match self {
            // Geometry is read by the GPU every frame; it lives in
            // device-local memory the CPU cannot write directly.
            BufferUsage::Vertex | BufferUsage::Index => MemoryLocation::GpuOnly,
            // Rewritten by the CPU every frame.
            BufferUsage::Uniform => MemoryLocation::CpuToGpu,
            // One-shot transfer source.
            BufferUsage::Staging => MemoryLocation::CpuToGpu,
        }
    }

    /// Returns a human-readable name for the buffer type.
    pub fn name(self) -> &'static str {
        match self {
            BufferUsage::Vertex => "vertex",
            BufferUsage::Index => "index",
            BufferUsage::Uniform => "uniform",
            BufferUsage::Staging => "staging",
        }
    }
}

/// GPU buffer wrapper with managed memory.
///
/// Wraps a Vulkan buffer and its gpu-allocator allocation. Not thread-safe;
/// synchronize access externally when sharing.
pub struct Buffer {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan buffer handle.
    buffer: vk::Buffer,
    /// GPU memory allocation.
    allocation: Option<Allocation>,
    /// Buffer size in bytes.
    size: vk::DeviceSize,
    /// Buffer usage type.
    usage: BufferUsage,
}

impl Buffer {
    /// Creates a new buffer with the specified size.
    ///
    /// # Errors
    ///
    /// Returns an error if the size is zero or buffer/memory creation fails.
    pub fn new(device: Arc<Device>, usage: BufferUsage, size: vk::DeviceSize) -> RhiResult<Self> {
        if size == 0 {
            return Err(RhiError::InvalidHandle(
                "Buffer size must be greater than 0".to_string(),
            ));
        }

        let buffer_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage.to_vk_usage())
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.handle().create_buffer(&buffer_info, None)? };

        let requirements = unsafe { device.handle().get_buffer_memory_requirements(buffer) };

        let allocation = {
            let mut allocator = device.allocator().lock().unwrap();
            allocator.allocate(&AllocationCreateDesc {
                name: usage.name(),
                requirements,
                location: usage.memory_location(),
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })?
        };

        unsafe {
            device
                .handle()
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())?;
        }

        debug!("Created {} buffer: {} bytes", usage.name(), size);

        Ok(Self {
            device,
            buffer,
            allocation: Some(allocation),
            size,
            usage,
        })
    }

    /// Creates a host-visible buffer and fills it with `data`.
    ///
    /// Only valid for usages with CPU-visible memory (uniform, staging).
    ///
    /// # Errors
    ///
    /// Returns an error if creation fails or the memory is not mapped.
    pub fn new_with_data(device: Arc<Device>, usage: BufferUsage, data: &[u8]) -> RhiResult<Self> {
        let buffer = Self::new(device, usage, data.len() as vk::DeviceSize)?;
        buffer.write_data(0, data)?;
        Ok(buffer)
    }

    /// Writes data into the buffer's mapped memory at the given offset.
    ///
    /// The buffer must use CPU-visible memory; the mapping is persistent and
    /// host-coherent, so no flush is issued.
    ///
    /// # Errors
    ///
    /// Returns an error if the write would exceed the buffer size or the
    /// memory is not mapped (device-local buffers).
    pub fn write_data(&self, offset: vk::DeviceSize, data: &[u8]) -> RhiResult<()> {
        if data.is_empty() {
            return Ok(());
        }

        let end = offset + data.len() as vk::DeviceSize;
        if end > self.size {
            return Err(RhiError::InvalidHandle(format!(
                "Write exceeds buffer size: offset {} + data {} > buffer {}",
                offset,
                data.len(),
                self.size
            )));
        }

        let allocation = self.allocation.as_ref().ok_or_else(|| {
            RhiError::InvalidHandle("Buffer allocation is not available".to_string())
        })?;

        let mapped_ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| RhiError::InvalidHandle("Buffer memory is not mapped".to_string()))?;

        unsafe {
            let dst = mapped_ptr.as_ptr().add(offset as usize);
            std::ptr::copy_nonoverlapping(data.as_ptr(), dst as *mut u8, data.len());
        }

        Ok(())
    }

    /// Returns the Vulkan buffer handle.
    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Returns the buffer size in bytes.
    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    /// Returns the buffer usage type.
    #[inline]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            let mut allocator = self.device.allocator().lock().unwrap();
            if let Err(e) = allocator.free(allocation) {
                tracing::error!("Failed to free buffer allocation: {:?}", e);
            }
        }

        unsafe {
            self.device.handle().destroy_buffer(self.buffer, None);
        }

        debug!("Destroyed {} buffer", self.usage.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_usage_flags() {
        assert!(BufferUsage::Vertex
            .to_vk_usage()
            .contains(vk::BufferUsageFlags::VERTEX_BUFFER));
        assert!(BufferUsage::Vertex
            .to_vk_usage()
            .contains(vk::BufferUsageFlags::TRANSFER_DST));
        assert!(BufferUsage::Index
            .to_vk_usage()
            .contains(vk::BufferUsageFlags::INDEX_BUFFER));
        assert!(BufferUsage::Index
            .to_vk_usage()
            .contains(vk::BufferUsageFlags::TRANSFER_DST));
        assert!(BufferUsage::Uniform
            .to_vk_usage()
            .contains(vk::BufferUsageFlags::UNIFORM_BUFFER));
        assert!(BufferUsage::Staging
            .to_vk_usage()
            .contains(vk::BufferUsageFlags::TRANSFER_SRC));
    }

    #[test]
    fn test_geometry_is_device_local() {
        assert_eq!(BufferUsage::Vertex.memory_location(), MemoryLocation::GpuOnly);
        assert_eq!(BufferUsage::Index.memory_location(), MemoryLocation::GpuOnly);
    }

    #[test]
    fn test_cpu_written_buffers_are_host_visible() {
        assert_eq!(
            BufferUsage::Uniform.memory_location(),
            MemoryLocation::CpuToGpu
        );
        assert_eq!(
            BufferUsage::Staging.memory_location(),
            MemoryLocation::CpuToGpu
        );
    }

    #[test]
    fn test_buffer_usage_name() {
        assert_eq!(BufferUsage::Vertex.name(), "vertex");
        assert_eq!(BufferUsage::Index.name(), "index");
        assert_eq!(BufferUsage::Uniform.name(), "uniform");
        assert_eq!(BufferUsage::Staging.name(), "staging");
    }
}
