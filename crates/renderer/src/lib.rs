//! Frame orchestration for the Helio renderer.
//!
//! This crate drives the per-frame lifecycle:
//! - [`frame`] — the ring of per-frame command and sync resources
//! - [`tick`] — the acquire/record/submit/present state machine
//! - [`uniforms`] — per-frame transform data
//! - [`renderer`] — the Vulkan-backed orchestrator tying it all together

pub mod frame;
pub mod renderer;
pub mod tick;
pub mod uniforms;

pub use renderer::Renderer;
pub use tick::TickOutcome;

/// Number of frames the CPU may have in flight at once.
///
/// With 2, the CPU records frame N+1 while the GPU still executes frame N;
/// a slot is reused only after its fence confirms the GPU finished with it.
pub const FRAMES_IN_FLIGHT: usize = 2;
