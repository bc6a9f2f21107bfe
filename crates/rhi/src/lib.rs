//! Vulkan abstraction layer for the Helio renderer.
//!
//! This crate provides a safe abstraction over Vulkan using the `ash` crate.
//! It handles:
//! - Instance and device creation
//! - Swapchain management
//! - Command buffer recording
//! - Image layout transitions and blits
//! - Buffer, image, and texture management with a staging upload path
//! - Pipeline and descriptor creation
//! - Synchronization primitives

mod error;

pub mod barrier;
pub mod buffer;
pub mod command;
pub mod descriptor;
pub mod device;
pub mod image;
pub mod instance;
pub mod physical_device;
pub mod pipeline;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod texture;
pub mod upload;
pub mod vertex;

pub use error::{RhiError, RhiResult};

// Re-export ash types that users might need
pub use ash::vk;
