//! Redraw coalescing and input rate limiting
//!
//! Neither type owns a timer. The host loop passes the current instant in and gets told
//! whether to act, so both are fully deterministic under test.

use instant::Instant;
use std::time::Duration;

/// Time from `earlier` to `later`, zero if the clock went backwards
#[inline]
fn elapsed_between(earlier: Instant, later: Instant) -> Duration {
    if later > earlier {
        later - earlier
    } else {
        Duration::ZERO
    }
}

/// Coalesces redraw requests and enforces a minimum interval between draws
///
/// Any number of [`RenderScheduler::request_redraw`] calls between two draws result in
/// one draw.
#[derive(Clone, Debug)]
pub struct RenderScheduler {
    min_interval: Duration,
    pending: bool,
    last_draw: Option<Instant>,
    draws: u64,
}

impl Default for RenderScheduler {
    fn default() -> Self {
        Self::new(Duration::from_millis(16))
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl RenderScheduler {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            pending: false,
            last_draw: None,
            draws: 0,
        }
    }

    /// Mark the frame dirty; returns `false` if a draw was already pending
    pub fn request_redraw(&mut self) -> bool {
        let newly = !self.pending;
        self.pending = true;
        newly
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Whether a pending draw may run at `now`
    pub fn should_draw(&self, now: Instant) -> bool {
        self.pending && self.time_until_due(now).is_zero()
    }

    /// Time left before the minimum interval since the last draw has elapsed
    ///
    /// Zero when no draw happened yet; independent of whether a draw is pending.
    pub fn time_until_due(&self, now: Instant) -> Duration {
        match self.last_draw {
            Some(last) => self
                .min_interval
                .saturating_sub(elapsed_between(last, now)),
            None => Duration::ZERO,
        }
    }

    /// Consume the pending request, recording `now` as the draw time
    pub fn begin_draw(&mut self, now: Instant) {
        self.pending = false;
        self.last_draw = Some(now);
        self.draws += 1;
    }

    /// Forget the pending request without drawing
    pub fn cancel(&mut self) {
        self.pending = false;
    }

    /// Number of draws executed so far
    #[inline]
    pub fn draw_count(&self) -> u64 {
        self.draws
    }

    #[inline]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

/// Leading-edge throttle: the first event fires, later ones inside the window are dropped
#[derive(Clone, Debug)]
pub struct Throttle {
    window: Duration,
    last_fired: Option<Instant>,
}

impl Throttle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_fired: None,
        }
    }

    /// Returns `true` and starts a new window if the previous one has elapsed
    pub fn try_fire(&mut self, now: Instant) -> bool {
        let ready = self
            .last_fired
            .is_none_or(|last| elapsed_between(last, now) >= self.window);
        if ready {
            self.last_fired = Some(now);
        }
        ready
    }

    /// Let the next event through regardless of the window
    pub fn reset(&mut self) {
        self.last_fired = None;
    }

    #[inline]
    pub fn window(&self) -> Duration {
        self.window
    }
}
