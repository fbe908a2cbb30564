//! Clocks and frame scheduling
//!
//! Animation time comes from a [`Clock`] so hosts and tests can control it.
//! When tweens are still running after a tick, the owner asks a
//! [`FrameScheduler`] for another frame; what "next frame" means is up to
//! the host (an event loop wake-up, a display link, a test flag).

use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Source of animation time in milliseconds
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Wall clock measured from construction
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Manually advanced clock. Clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// Schedules the next animation frame
pub trait FrameScheduler {
    /// Ask for one more frame; repeated requests before the frame coalesce
    fn request_frame(&self);

    /// Withdraw a pending request
    fn cancel_frame(&self);
}

/// Callback type for waking up the host's event loop
///
/// May be invoked from any thread.
pub type WakeCallback = Arc<dyn Fn() + Send + Sync>;

/// Atomic needs-frame flag polled by the host loop
#[derive(Clone, Debug, Default)]
pub struct FrameFlag {
    requested: Arc<AtomicBool>,
}

impl FrameFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check and clear the flag in one operation
    pub fn take_requested(&self) -> bool {
        self.requested.swap(false, Ordering::Acquire)
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Relaxed)
    }
}

impl FrameScheduler for FrameFlag {
    fn request_frame(&self) {
        self.requested.store(true, Ordering::Release);
    }

    fn cancel_frame(&self) {
        self.requested.store(false, Ordering::Release);
    }
}

/// Calls a wake callback on the first request of each frame
pub struct CallbackFrameScheduler {
    flag: FrameFlag,
    wake: WakeCallback,
}

impl CallbackFrameScheduler {
    pub fn new<F>(wake: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            flag: FrameFlag::new(),
            wake: Arc::new(wake),
        }
    }

    /// Host calls this when the frame it was woken for begins
    pub fn take_requested(&self) -> bool {
        self.flag.take_requested()
    }
}

impl FrameScheduler for CallbackFrameScheduler {
    fn request_frame(&self) {
        if !self.flag.requested.swap(true, Ordering::AcqRel) {
            (self.wake)();
        }
    }

    fn cancel_frame(&self) {
        self.flag.cancel_frame();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_manual_clock_is_shared() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        handle.advance(16.0);
        handle.advance(4.0);
        assert_eq!(clock.now_ms(), 20.0);
    }

    #[test]
    fn test_frame_flag_take_clears() {
        let flag = FrameFlag::new();
        assert!(!flag.take_requested());
        flag.request_frame();
        flag.request_frame();
        assert!(flag.take_requested());
        assert!(!flag.take_requested());

        flag.request_frame();
        flag.cancel_frame();
        assert!(!flag.is_requested());
    }

    #[test]
    fn test_callback_scheduler_coalesces_wakes() {
        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = wakes.clone();
        let scheduler = CallbackFrameScheduler::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        scheduler.request_frame();
        scheduler.request_frame();
        assert_eq!(wakes.load(Ordering::SeqCst), 1);

        assert!(scheduler.take_requested());
        scheduler.request_frame();
        assert_eq!(wakes.load(Ordering::SeqCst), 2);
    }
}
