//! Time-driven linear interpolation between two grid points.
//!
//! A transition never owns a timer. Whoever renders polls
//! [`Transition::current_position`] with the current timestamp, and completion
//! is observed at that moment. Freezing the timestamp source pauses every
//! transition at once.

/// A point in grid units (one tile = 1.0).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Completion callback. Receives the owner of the transition (e.g. the tile)
/// and the timestamp at which completion was observed.
pub type OnFinished<C> = Box<dyn FnOnce(&mut C, f64)>;

pub struct Transition<C> {
    start: Point,
    end: Point,
    start_ms: Option<f64>, // performance.now() when started
    duration_ms: f64,
    callbacks: Vec<OnFinished<C>>,
}

impl<C> Transition<C> {
    /// `speed` is in grid units per second. Returns `None` unless `speed` is a
    /// positive finite number.
    pub fn new(start: Point, end: Point, speed: f64) -> Option<Self> {
        if !(speed.is_finite() && speed > 0.0) {
            return None;
        }
        Some(Self {
            start,
            end,
            start_ms: None,
            duration_ms: start.distance(end) / speed * 1000.0,
            callbacks: Vec::new(),
        })
    }

    /// Record `now` as the reference instant. Calling again restarts the clock.
    pub fn start(&mut self, now: f64) {
        self.start_ms = Some(now);
    }

    pub fn start_point(&self) -> Point {
        self.start
    }

    pub fn end_point(&self) -> Point {
        self.end
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    /// Raw elapsed fraction, not clamped. 0 before `start`, 1 for zero-length
    /// transitions.
    pub fn fraction(&self, now: f64) -> f64 {
        let Some(started) = self.start_ms else {
            return 0.0;
        };
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        (now - started) / self.duration_ms
    }

    pub fn is_finished(&self, now: f64) -> bool {
        self.fraction(now) >= 1.0
    }

    /// Interpolated position and whether the transition has finished. The
    /// fraction is clamped to [0, 1] so a late poll never overshoots `end`.
    pub fn current_position(&self, now: f64) -> (Point, bool) {
        let raw = self.fraction(now);
        let t = raw.clamp(0.0, 1.0);
        let pos = Point::new(
            self.start.x + (self.end.x - self.start.x) * t,
            self.start.y + (self.end.y - self.start.y) * t,
        );
        (pos, raw >= 1.0)
    }

    /// Queue `callback` for completion. If the transition is already finished
    /// the callback is handed back so the caller can run it right away.
    pub fn on_finished(&mut self, callback: OnFinished<C>, now: f64) -> Option<OnFinished<C>> {
        if self.is_finished(now) {
            return Some(callback);
        }
        self.callbacks.push(callback);
        None
    }

    pub fn pending_callbacks(&self) -> usize {
        self.callbacks.len()
    }

    /// Consume the transition, yielding its callbacks in registration order.
    pub fn into_callbacks(self) -> Vec<OnFinished<C>> {
        self.callbacks
    }
}

impl<C> std::fmt::Debug for Transition<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transition")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("start_ms", &self.start_ms)
            .field("duration_ms", &self.duration_ms)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}
