//! Platform layer for the Helio renderer.
//!
//! This crate provides platform-specific functionality:
//! - Window management via winit
//! - Keyboard input tracking
//! - Vulkan surface creation from raw window handles

mod input;
mod window;

pub use input::InputState;
pub use window::{Surface, Window};

// Re-export winit types that users might need
pub use winit::event::WindowEvent;
pub use winit::event_loop::EventLoop;
pub use winit::keyboard::KeyCode;
