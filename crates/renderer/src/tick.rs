//! The per-frame state machine.
//!
//! Each tick walks a strictly ordered sequence: wait for the current slot's
//! fence, acquire a swapchain image, reset the slot, record, submit,
//! present, advance. The only permitted deviations are the minimize gate
//! (a zero-sized surface defers everything) and the out-of-date skip (an
//! out-of-date acquire rebuilds the swapchain and abandons the tick without
//! consuming the fence signal or advancing the frame counter).
//!
//! [`run_tick`] encodes the sequence against the [`FrameDriver`] trait so
//! the ordering rules live in one place and are testable without a GPU; the
//! Vulkan-backed [`crate::Renderer`] implements the trait for real frames.

use helio_rhi::RhiResult;

/// Result of a swapchain image acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Acquire {
    /// An image is available for rendering.
    Ready {
        /// Index of the acquired swapchain image.
        image_index: u32,
        /// The swapchain still works but should be rebuilt after present.
        suboptimal: bool,
    },
    /// The swapchain no longer matches the surface; nothing was acquired.
    OutOfDate,
}

/// Result of a present operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresentState {
    /// The image was queued for presentation.
    Presented {
        /// The swapchain should be rebuilt before the next frame.
        suboptimal: bool,
    },
    /// The swapchain no longer matches the surface.
    OutOfDate,
}

/// What a tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// The surface is zero-sized; nothing was rendered or rebuilt.
    Minimized,
    /// Acquire reported out-of-date; the swapchain was rebuilt and the
    /// frame abandoned without advancing.
    Skipped,
    /// A frame was recorded, submitted, and presented.
    Rendered,
}

/// The operations a tick performs, in the order [`run_tick`] calls them.
///
/// Implemented by the Vulkan renderer and by mock backends in tests. All
/// operations act on the implementor's current frame slot.
pub trait FrameDriver {
    /// Current surface size in pixels; (0, 0) while minimized.
    fn surface_extent(&self) -> (u32, u32);

    /// Blocks until the current slot's fence signals.
    fn wait_for_frame(&mut self) -> RhiResult<()>;

    /// Requests the next presentable image, signaling the slot's acquire
    /// semaphore.
    fn acquire_image(&mut self) -> RhiResult<Acquire>;

    /// Resets the slot's fence and command buffer.
    ///
    /// Only called after a successful acquire so a skipped frame never
    /// consumes a fence signal.
    fn reset_frame(&mut self) -> RhiResult<()>;

    /// Records the frame's commands targeting the acquired image.
    fn record(&mut self, image_index: u32) -> RhiResult<()>;

    /// Submits the recorded commands, signaling the slot's render semaphore
    /// and fence.
    fn submit(&mut self) -> RhiResult<()>;

    /// Presents the acquired image, waiting on the render semaphore.
    fn present(&mut self, image_index: u32) -> RhiResult<PresentState>;

    /// Tears down and rebuilds the swapchain and its dependents.
    fn rebuild_swapchain(&mut self) -> RhiResult<()>;

    /// Advances the frame counter to the next slot.
    fn advance(&mut self);
}

/// Runs one tick of the frame loop.
///
/// `rebuild_requested` carries an external resize signal; the rebuild runs
/// before the frame starts. A zero-sized surface short-circuits to
/// [`TickOutcome::Minimized`] without touching the swapchain, so the caller
/// polls again next tick until a usable extent appears.
///
/// # Errors
///
/// Any driver error propagates unchanged; errors here are unexpected API
/// failures the caller treats as fatal.
pub fn run_tick<D: FrameDriver>(driver: &mut D, rebuild_requested: bool) -> RhiResult<TickOutcome> {
    let (width, height) = driver.surface_extent();
    if width == 0 || height == 0 {
        return Ok(TickOutcome::Minimized);
    }

    if rebuild_requested {
        driver.rebuild_swapchain()?;
    }

    driver.wait_for_frame()?;

    let (image_index, mut needs_rebuild) = match driver.acquire_image()? {
        Acquire::Ready {
            image_index,
            suboptimal,
        } => (image_index, suboptimal),
        Acquire::OutOfDate => {
            driver.rebuild_swapchain()?;
            return Ok(TickOutcome::Skipped);
        }
    };

    driver.reset_frame()?;
    driver.record(image_index)?;
    driver.submit()?;

    match driver.present(image_index)? {
        PresentState::Presented { suboptimal } => needs_rebuild |= suboptimal,
        PresentState::OutOfDate => needs_rebuild = true,
    }

    driver.advance();

    if needs_rebuild {
        driver.rebuild_swapchain()?;
    }

    Ok(TickOutcome::Rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use crate::frame::FrameRing;

    /// Mock backend recording every operation with its slot index.
    struct MockDriver {
        extent: (u32, u32),
        /// Extents returned by successive ticks; `surface_extent` is called
        /// exactly once per tick, so each entry scripts one tick. Falls back
        /// to `extent` when exhausted.
        extent_script: RefCell<VecDeque<(u32, u32)>>,
        /// Acquire results injected per call; defaults to Ready.
        acquire_script: VecDeque<Acquire>,
        /// Present results injected per call; defaults to Presented.
        present_script: VecDeque<PresentState>,
        frame_number: u64,
        next_image: u32,
        ops: Vec<String>,
        rebuilds: u32,
    }

    impl MockDriver {
        fn new() -> Self {
            Self {
                extent: (800, 600),
                extent_script: RefCell::new(VecDeque::new()),
                acquire_script: VecDeque::new(),
                present_script: VecDeque::new(),
                frame_number: 0,
                next_image: 0,
                ops: Vec::new(),
                rebuilds: 0,
            }
        }

        fn script_extents(&mut self, extents: &[(u32, u32)]) {
            self.extent_script.borrow_mut().extend(extents.iter().copied());
        }

        fn slot(&self) -> usize {
            FrameRing::slot_index_for(self.frame_number)
        }

        fn log(&mut self, op: &str) {
            let entry = format!("{}#{}", op, self.slot());
            self.ops.push(entry);
        }
    }

    impl FrameDriver for MockDriver {
        fn surface_extent(&self) -> (u32, u32) {
            self.extent_script
                .borrow_mut()
                .pop_front()
                .unwrap_or(self.extent)
        }

        fn wait_for_frame(&mut self) -> RhiResult<()> {
            self.log("wait");
            Ok(())
        }

        fn acquire_image(&mut self) -> RhiResult<Acquire> {
            self.log("acquire");
            Ok(self.acquire_script.pop_front().unwrap_or(Acquire::Ready {
                image_index: self.next_image,
                suboptimal: false,
            }))
        }

        fn reset_frame(&mut self) -> RhiResult<()> {
            self.log("reset");
            Ok(())
        }

        fn record(&mut self, _image_index: u32) -> RhiResult<()> {
            self.log("record");
            Ok(())
        }

        fn submit(&mut self) -> RhiResult<()> {
            self.log("submit");
            Ok(())
        }

        fn present(&mut self, _image_index: u32) -> RhiResult<PresentState> {
            self.log("present");
            Ok(self
                .present_script
                .pop_front()
                .unwrap_or(PresentState::Presented { suboptimal: false }))
        }

        fn rebuild_swapchain(&mut self) -> RhiResult<()> {
            self.log("rebuild");
            self.rebuilds += 1;
            Ok(())
        }

        fn advance(&mut self) {
            self.frame_number += 1;
        }
    }

    #[test]
    fn test_five_ticks_alternate_slots() {
        let mut driver = MockDriver::new();

        for _ in 0..5 {
            let outcome = run_tick(&mut driver, false).unwrap();
            assert_eq!(outcome, TickOutcome::Rendered);
        }

        assert_eq!(driver.frame_number, 5);

        let waits: Vec<&str> = driver
            .ops
            .iter()
            .filter(|op| op.starts_with("wait"))
            .map(|s| s.as_str())
            .collect();
        assert_eq!(waits, vec!["wait#0", "wait#1", "wait#0", "wait#1", "wait#0"]);
        assert_eq!(driver.rebuilds, 0);
    }

    #[test]
    fn test_fence_wait_precedes_every_reset() {
        let mut driver = MockDriver::new();

        for _ in 0..4 {
            run_tick(&mut driver, false).unwrap();
        }

        // Within each tick the slot's wait must come before its reset.
        let mut last_wait_slot: Option<String> = None;
        for op in &driver.ops {
            if let Some(slot) = op.strip_prefix("wait#") {
                last_wait_slot = Some(slot.to_string());
            }
            if let Some(slot) = op.strip_prefix("reset#") {
                assert_eq!(last_wait_slot.as_deref(), Some(slot));
            }
        }
    }

    #[test]
    fn test_out_of_date_acquire_skips_tick() {
        let mut driver = MockDriver::new();

        // Two clean ticks, then out-of-date on the third.
        run_tick(&mut driver, false).unwrap();
        run_tick(&mut driver, false).unwrap();
        driver.acquire_script.push_back(Acquire::OutOfDate);

        let ops_before = driver.ops.len();
        let outcome = run_tick(&mut driver, false).unwrap();

        assert_eq!(outcome, TickOutcome::Skipped);
        assert_eq!(driver.rebuilds, 1);
        // Frame counter must not advance past Acquire.
        assert_eq!(driver.frame_number, 2);

        // The aborted tick performed only wait, acquire, rebuild; fence
        // reset and everything after were skipped.
        let tick_ops: Vec<&str> = driver.ops[ops_before..].iter().map(|s| s.as_str()).collect();
        assert_eq!(tick_ops, vec!["wait#0", "acquire#0", "rebuild#0"]);

        // The next tick reuses the same slot.
        let ops_before = driver.ops.len();
        run_tick(&mut driver, false).unwrap();
        assert_eq!(driver.ops[ops_before], "wait#0");
    }

    #[test]
    fn test_minimized_extent_defers_all_work() {
        let mut driver = MockDriver::new();
        driver.script_extents(&[(0, 0), (0, 0), (0, 0), (800, 600)]);

        // Three minimized polls: no waits, no rebuilds, no frames.
        for _ in 0..3 {
            let outcome = run_tick(&mut driver, true).unwrap();
            assert_eq!(outcome, TickOutcome::Minimized);
        }
        assert!(driver.ops.is_empty());
        assert_eq!(driver.rebuilds, 0);
        assert_eq!(driver.frame_number, 0);

        // A nonzero extent finally lets the rebuild and the frame proceed.
        let outcome = run_tick(&mut driver, true).unwrap();
        assert_eq!(outcome, TickOutcome::Rendered);
        assert_eq!(driver.rebuilds, 1);
        assert_eq!(driver.frame_number, 1);
    }

    #[test]
    fn test_suboptimal_acquire_rebuilds_after_present() {
        let mut driver = MockDriver::new();
        driver.acquire_script.push_back(Acquire::Ready {
            image_index: 0,
            suboptimal: true,
        });

        let outcome = run_tick(&mut driver, false).unwrap();

        assert_eq!(outcome, TickOutcome::Rendered);
        assert_eq!(driver.rebuilds, 1);
        // The frame still completed and advanced before the rebuild.
        assert_eq!(driver.frame_number, 1);
        let present_pos = driver.ops.iter().position(|op| op.starts_with("present"));
        let rebuild_pos = driver.ops.iter().position(|op| op.starts_with("rebuild"));
        assert!(present_pos.unwrap() < rebuild_pos.unwrap());
    }

    #[test]
    fn test_out_of_date_present_rebuilds_and_advances() {
        let mut driver = MockDriver::new();
        driver.present_script.push_back(PresentState::OutOfDate);

        let outcome = run_tick(&mut driver, false).unwrap();

        assert_eq!(outcome, TickOutcome::Rendered);
        assert_eq!(driver.rebuilds, 1);
        assert_eq!(driver.frame_number, 1);
    }

    #[test]
    fn test_requested_rebuild_runs_before_frame() {
        let mut driver = MockDriver::new();

        run_tick(&mut driver, true).unwrap();

        assert_eq!(driver.rebuilds, 1);
        let rebuild_pos = driver.ops.iter().position(|op| op.starts_with("rebuild"));
        let wait_pos = driver.ops.iter().position(|op| op.starts_with("wait"));
        assert!(rebuild_pos.unwrap() < wait_pos.unwrap());
    }
}
