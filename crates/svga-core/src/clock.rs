use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// The periodic signal that drives [`PlaybackEngine::tick`](crate::PlaybackEngine::tick).
///
/// The engine only tells the clock when to run and at what rate. Whoever owns the clock calls
/// `tick()` on the engine each time it fires, passing the engine explicitly; the clock never holds
/// a reference back to it.
pub trait FrameClock: Send {
    fn set_preferred_fps(&mut self, fps: u32);
    fn resume(&mut self);
    fn pause(&mut self);
}

#[derive(Debug, Default)]
struct ManualClockState {
    running: AtomicBool,
    fps: AtomicU32,
}

/// Clock that never fires on its own. Ticks are delivered by calling `tick()` directly.
///
/// Clones share state, so a test can keep one handle and give the other to the engine.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    state: Arc<ManualClockState>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::Acquire)
    }

    pub fn fps(&self) -> u32 {
        self.state.fps.load(Ordering::Acquire)
    }
}

impl FrameClock for ManualClock {
    fn set_preferred_fps(&mut self, fps: u32) {
        self.state.fps.store(fps, Ordering::Release);
    }

    fn resume(&mut self) {
        self.state.running.store(true, Ordering::Release);
    }

    fn pause(&mut self) {
        self.state.running.store(false, Ordering::Release);
    }
}
