//! Coalescing redraw scheduler.
//!
//! The host calls [`RedrawScheduler::poll`] from its animation-frame hook;
//! at most one frame is in flight and frames are spaced by at least
//! [`MIN_FRAME_INTERVAL`].

use std::time::{Duration, Instant};

pub const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedrawState {
    #[default]
    Idle,
    Scheduled,
    Drawing,
}

#[derive(Debug, Clone)]
pub struct RedrawScheduler {
    state: RedrawState,
    /// A request arrived while drawing.
    pending: bool,
    requested_at: Option<Instant>,
    last_frame: Option<Instant>,
    min_interval: Duration,
}

impl Default for RedrawScheduler {
    fn default() -> Self {
        Self::new(MIN_FRAME_INTERVAL)
    }
}

impl RedrawScheduler {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            state: RedrawState::Idle,
            pending: false,
            requested_at: None,
            last_frame: None,
            min_interval,
        }
    }

    pub fn state(&self) -> RedrawState {
        self.state
    }

    /// Asks for a frame. Returns true when this call scheduled a new one;
    /// requests while a frame is scheduled coalesce, requests while drawing
    /// are deferred to the frame after.
    pub fn request(&mut self, now: Instant) -> bool {
        match self.state {
            RedrawState::Idle => {
                self.state = RedrawState::Scheduled;
                self.requested_at = Some(now);
                true
            }
            RedrawState::Scheduled => false,
            RedrawState::Drawing => {
                self.pending = true;
                false
            }
        }
    }

    /// Earliest instant at which the scheduled frame may run.
    pub fn next_due(&self) -> Option<Instant> {
        if self.state != RedrawState::Scheduled {
            return None;
        }
        let requested = self.requested_at?;
        Some(match self.last_frame {
            Some(last) => requested.max(last + self.min_interval),
            None => requested,
        })
    }

    /// Starts the scheduled frame if it is due. The caller must follow a
    /// `true` result with [`finish`](Self::finish).
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_due() {
            Some(due) if now >= due => {
                self.state = RedrawState::Drawing;
                true
            }
            _ => false,
        }
    }

    pub fn finish(&mut self, now: Instant) {
        if self.state != RedrawState::Drawing {
            return;
        }
        self.last_frame = Some(now);
        if std::mem::take(&mut self.pending) {
            self.state = RedrawState::Scheduled;
            self.requested_at = Some(now);
        } else {
            self.state = RedrawState::Idle;
            self.requested_at = None;
        }
    }

    /// Drops any scheduled or deferred frame.
    pub fn cancel(&mut self) {
        self.state = RedrawState::Idle;
        self.pending = false;
        self.requested_at = None;
    }
}
