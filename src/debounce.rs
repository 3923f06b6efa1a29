//! Single-shot debounce timer: schedule after a delay, cancel-and-reschedule
//! on retrigger. One utility shared by the pan/scroll, resize-settle and
//! zoom-idle timers instead of three ad hoc implementations.
//!
//! There is no background clock — the app polls `poll(now)` every frame with
//! egui's input time and asks `deadline()` to schedule the next repaint.

#[derive(Debug)]
pub struct Debounce {
    delay: f64,
    deadline: Option<f64>,
}

impl Debounce {
    /// `delay` is in seconds, matching egui's `Input::time`.
    pub fn new(delay: f64) -> Self {
        Self { delay, deadline: None }
    }

    /// (Re)start the timer: a pending deadline is replaced, so a burst of
    /// triggers fires exactly once, `delay` after the last trigger.
    pub fn start(&mut self, now: f64) {
        self.deadline = Some(now + self.delay);
    }

    /// Cancel without firing.
    pub fn stop(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<f64> {
        self.deadline
    }

    /// True exactly once, on the first poll at or past the deadline.
    pub fn poll(&mut self, now: f64) -> bool {
        match self.deadline {
            Some(d) if now >= d => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
