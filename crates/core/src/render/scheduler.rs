//! Host frame callbacks and the hit-region debounce timer.

use std::cell::RefCell;

/// Identifies one requested frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// The host's "call me on the next display refresh" primitive.
///
/// A cancelled handle must never be delivered. Hosts deliver a handle by
/// passing it to `Container::on_animation_frame`.
pub trait FrameSource {
    fn request_frame(&self) -> FrameHandle;
    fn cancel_frame(&self, handle: FrameHandle);
    /// Monotonic clock in milliseconds.
    fn now(&self) -> f64;
}

#[derive(Debug, Default)]
struct ManualState {
    next: u64,
    pending: Vec<FrameHandle>,
    now: f64,
}

/// A frame source driven by hand: the host (or a test) drains the pending
/// handles and advances the clock.
#[derive(Debug, Default)]
pub struct ManualFrames {
    state: RefCell<ManualState>,
}

impl ManualFrames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Vec<FrameHandle> {
        self.state.borrow().pending.clone()
    }

    pub fn has_pending(&self) -> bool {
        !self.state.borrow().pending.is_empty()
    }

    /// Remove and return every pending handle, oldest first.
    pub fn take_pending(&self) -> Vec<FrameHandle> {
        std::mem::take(&mut self.state.borrow_mut().pending)
    }

    pub fn set_now(&self, now: f64) {
        self.state.borrow_mut().now = now;
    }

    pub fn advance(&self, ms: f64) {
        self.state.borrow_mut().now += ms;
    }
}

impl FrameSource for ManualFrames {
    fn request_frame(&self) -> FrameHandle {
        let mut state = self.state.borrow_mut();
        state.next += 1;
        let handle = FrameHandle(state.next);
        state.pending.push(handle);
        handle
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        self.state.borrow_mut().pending.retain(|h| *h != handle);
    }

    fn now(&self) -> f64 {
        self.state.borrow().now
    }
}

/// Fires once, `delay` ms after the last `arm`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Debounce {
    delay: f64,
    deadline: Option<f64>,
}

impl Debounce {
    pub fn new(delay: f64) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// (Re)start the timer; an earlier deadline is superseded.
    pub fn arm(&mut self, now: f64) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_due(&self, now: f64) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Disarm and return `true` if the deadline has passed.
    pub fn fire(&mut self, now: f64) -> bool {
        if self.is_due(now) {
            self.deadline = None;
            true
        } else {
            false
        }
    }
}
