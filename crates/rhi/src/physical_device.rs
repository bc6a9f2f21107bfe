//! Physical device (GPU) selection.
//!
//! This module handles GPU enumeration and selection based on capabilities.
//!
//! The selection process:
//! 1. Enumerate all available GPUs
//! 2. Filter out devices missing the required queue families (graphics and
//!    present), sampler anisotropy, or Vulkan 1.3 support
//! 3. Score the survivors (discrete GPUs strongly preferred) and pick the
//!    highest

use std::ffi::CStr;

use ash::vk;
use tracing::{debug, info, warn};

use crate::error::RhiError;

/// Queue family indices for the queue classes the engine submits to.
///
/// The graphics and present families may or may not be the same index
/// depending on the hardware.
#[derive(Clone, Copy, Debug, Default)]
pub struct QueueFamilyIndices {
    /// Index of the queue family that supports graphics operations.
    pub graphics_family: Option<u32>,
    /// Index of the queue family that supports presentation to the surface.
    pub present_family: Option<u32>,
}

impl QueueFamilyIndices {
    /// Checks if the required queue families are available.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.graphics_family.is_some() && self.present_family.is_some()
    }

    /// Returns the unique queue family indices.
    ///
    /// Used when creating the logical device to avoid requesting duplicate
    /// queues for the same family.
    pub fn unique_families(&self) -> Vec<u32> {
        let mut families = Vec::with_capacity(2);

        if let Some(graphics) = self.graphics_family {
            families.push(graphics);
        }
        if let Some(present) = self.present_family {
            if !families.contains(&present) {
                families.push(present);
            }
        }

        families
    }
}

/// Information about a selected physical device.
#[derive(Clone)]
pub struct PhysicalDeviceInfo {
    /// Vulkan physical device handle.
    pub device: vk::PhysicalDevice,
    /// Device properties (name, limits, API version).
    pub properties: vk::PhysicalDeviceProperties,
    /// Supported device features.
    pub features: vk::PhysicalDeviceFeatures,
    /// Memory properties (heap sizes, memory types).
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    /// Queue family indices.
    pub queue_families: QueueFamilyIndices,
}

impl PhysicalDeviceInfo {
    /// Returns the device name as a string.
    pub fn device_name(&self) -> &str {
        unsafe {
            CStr::from_ptr(self.properties.device_name.as_ptr())
                .to_str()
                .unwrap_or("Unknown Device")
        }
    }

    /// Returns a human-readable string for the device type.
    pub fn device_type_name(&self) -> &'static str {
        match self.properties.device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => "Discrete GPU",
            vk::PhysicalDeviceType::INTEGRATED_GPU => "Integrated GPU",
            vk::PhysicalDeviceType::VIRTUAL_GPU => "Virtual GPU",
            vk::PhysicalDeviceType::CPU => "CPU",
            _ => "Other",
        }
    }

    /// Returns the Vulkan API version supported by the device.
    pub fn api_version(&self) -> (u32, u32, u32) {
        let version = self.properties.api_version;
        (
            vk::api_version_major(version),
            vk::api_version_minor(version),
            vk::api_version_patch(version),
        )
    }

    /// Returns the total device-local memory in bytes.
    pub fn device_local_memory(&self) -> u64 {
        self.memory_properties
            .memory_heaps
            .iter()
            .take(self.memory_properties.memory_heap_count as usize)
            .filter(|heap| heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL))
            .map(|heap| heap.size)
            .sum()
    }
}

impl std::fmt::Debug for PhysicalDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (major, minor, patch) = self.api_version();
        f.debug_struct("PhysicalDeviceInfo")
            .field("name", &self.device_name())
            .field("type", &self.device_type_name())
            .field("api_version", &format!("{}.{}.{}", major, minor, patch))
            .field("queue_families", &self.queue_families)
            .finish()
    }
}

/// Selects the most suitable physical device for rendering.
///
/// # Errors
///
/// Returns [`RhiError::NoSuitableDevice`] if no GPU satisfies the mandatory
/// requirements.
pub fn select_physical_device(
    instance: &ash::Instance,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> Result<PhysicalDeviceInfo, RhiError> {
    let devices = unsafe { instance.enumerate_physical_devices()? };

    if devices.is_empty() {
        warn!("No Vulkan-capable GPUs found");
        return Err(RhiError::NoSuitableDevice);
    }

    info!("Found {} GPU(s)", devices.len());

    let mut candidates: Vec<(PhysicalDeviceInfo, u32)> = Vec::new();

    for device in devices {
        if let Some(candidate) = check_device_suitability(instance, device, surface, surface_loader)
        {
            let score = rate_device(&candidate);
            debug!(
                "GPU '{}' ({}) - score {}",
                candidate.device_name(),
                candidate.device_type_name(),
                score
            );
            candidates.push((candidate, score));
        }
    }

    if candidates.is_empty() {
        warn!("No GPU satisfies the required capabilities");
        return Err(RhiError::NoSuitableDevice);
    }

    candidates.sort_by(|a, b| b.1.cmp(&a.1));
    let (selected, score) = candidates.remove(0);

    let (major, minor, patch) = selected.api_version();
    info!(
        "Selected GPU: '{}' ({}) - Vulkan {}.{}.{}, score {}",
        selected.device_name(),
        selected.device_type_name(),
        major,
        minor,
        patch,
        score
    );

    Ok(selected)
}

/// Checks if a physical device meets the mandatory requirements.
fn check_device_suitability(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> Option<PhysicalDeviceInfo> {
    let properties = unsafe { instance.get_physical_device_properties(device) };
    let features = unsafe { instance.get_physical_device_features(device) };
    let memory_properties = unsafe { instance.get_physical_device_memory_properties(device) };

    let device_name = unsafe {
        CStr::from_ptr(properties.device_name.as_ptr())
            .to_str()
            .unwrap_or("Unknown")
    };

    let queue_families = find_queue_families(instance, device, surface, surface_loader);

    if !queue_families.is_complete() {
        debug!(
            "GPU '{}' skipped: missing queue families (graphics={}, present={})",
            device_name,
            queue_families.graphics_family.is_some(),
            queue_families.present_family.is_some()
        );
        return None;
    }

    if features.sampler_anisotropy == vk::FALSE {
        debug!("GPU '{}' skipped: sampler anisotropy not supported", device_name);
        return None;
    }

    // Dynamic rendering and synchronization2 require Vulkan 1.3
    if vk::api_version_major(properties.api_version) < 1
        || (vk::api_version_major(properties.api_version) == 1
            && vk::api_version_minor(properties.api_version) < 3)
    {
        debug!(
            "GPU '{}' skipped: Vulkan 1.3 not supported (version {}.{})",
            device_name,
            vk::api_version_major(properties.api_version),
            vk::api_version_minor(properties.api_version)
        );
        return None;
    }

    Some(PhysicalDeviceInfo {
        device,
        properties,
        features,
        memory_properties,
        queue_families,
    })
}

/// Finds the graphics and present queue family indices.
fn find_queue_families(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> QueueFamilyIndices {
    let queue_families = unsafe { instance.get_physical_device_queue_family_properties(device) };

    let mut indices = QueueFamilyIndices::default();

    for (i, family) in queue_families.iter().enumerate() {
        let i = i as u32;

        if family.queue_count == 0 {
            continue;
        }

        if indices.graphics_family.is_none()
            && family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
        {
            indices.graphics_family = Some(i);
        }

        if indices.present_family.is_none() {
            let present_support = unsafe {
                surface_loader
                    .get_physical_device_surface_support(device, i, surface)
                    .unwrap_or(false)
            };
            if present_support {
                indices.present_family = Some(i);
            }
        }
    }

    indices
}

/// Rates a physical device; higher scores are more desirable.
fn rate_device(info: &PhysicalDeviceInfo) -> u32 {
    let mut score = 0u32;

    match info.properties.device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => score += 10000,
        vk::PhysicalDeviceType::INTEGRATED_GPU => score += 1000,
        vk::PhysicalDeviceType::VIRTUAL_GPU => score += 100,
        vk::PhysicalDeviceType::CPU => score += 10,
        _ => score += 1,
    }

    // Max image dimension as a rough capability proxy
    score += info.properties.limits.max_image_dimension2_d;

    // VRAM contribution in MB, capped
    let vram_mb = (info.device_local_memory() / (1024 * 1024)) as u32;
    score += vram_mb.min(16000);

    score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_family_indices_default_incomplete() {
        let indices = QueueFamilyIndices::default();
        assert!(indices.graphics_family.is_none());
        assert!(indices.present_family.is_none());
        assert!(!indices.is_complete());
    }

    #[test]
    fn test_queue_family_indices_complete() {
        let indices = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: Some(0),
        };
        assert!(indices.is_complete());
    }

    #[test]
    fn test_queue_family_indices_partial_is_incomplete() {
        let graphics_only = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: None,
        };
        assert!(!graphics_only.is_complete());

        let present_only = QueueFamilyIndices {
            graphics_family: None,
            present_family: Some(1),
        };
        assert!(!present_only.is_complete());
    }

    #[test]
    fn test_unique_families_shared_index() {
        let indices = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: Some(0),
        };
        assert_eq!(indices.unique_families(), vec![0]);
    }

    #[test]
    fn test_unique_families_distinct_indices() {
        let indices = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: Some(2),
        };
        let unique = indices.unique_families();
        assert_eq!(unique.len(), 2);
        assert!(unique.contains(&0));
        assert!(unique.contains(&2));
    }
}
