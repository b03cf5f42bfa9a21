//! One occupant of a board cell.
//!
//! The logical coordinate always names the cell that owns the tile. A running
//! [`Transition`] only changes where the tile is drawn, never where it is.

use crate::render::Surface;
use crate::settings::{GameSettings, TileKind};
use crate::transition::{OnFinished, Point, Transition};

#[derive(Debug)]
pub struct Tile {
    kind: TileKind,
    x: i32,
    y: i32,
    transition: Option<Transition<Tile>>,
}

impl Tile {
    pub fn new(kind: TileKind, x: i32, y: i32) -> Self {
        Self {
            kind,
            x,
            y,
            transition: None,
        }
    }

    pub fn kind(&self) -> TileKind {
        self.kind
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    fn logical_point(&self) -> Point {
        Point::new(self.x as f64, self.y as f64)
    }

    pub fn transition(&self) -> Option<&Transition<Tile>> {
        self.transition.as_ref()
    }

    pub fn has_transition(&self) -> bool {
        self.transition.is_some()
    }

    /// Start a fresh transition, dropping the previous one together with its
    /// pending callbacks (last move preempts). Returns false when `speed`
    /// cannot drive a transition.
    fn set_transition(&mut self, from: Point, to: Point, speed: f64, now: f64) -> bool {
        match Transition::new(from, to, speed) {
            Some(mut transition) => {
                transition.start(now);
                self.transition = Some(transition);
                true
            }
            None => false,
        }
    }

    pub fn clear_transition(&mut self) {
        self.transition = None;
    }

    /// Move to (x, y). With a usable speed the move is animated; the logical
    /// coordinate is updated immediately either way.
    pub fn move_to(&mut self, x: i32, y: i32, speed: Option<f64>, now: f64) {
        if (self.x, self.y) == (x, y) {
            return;
        }
        if let Some(speed) = speed {
            let target = Point::new(x as f64, y as f64);
            self.set_transition(self.logical_point(), target, speed, now);
        }
        self.x = x;
        self.y = y;
    }

    /// Animate towards (x, y) and back again without changing the logical
    /// coordinate. Used when a swap would not produce a combo.
    pub fn attempt_move(&mut self, x: i32, y: i32, speed: f64, now: f64) {
        if (self.x, self.y) == (x, y) {
            return;
        }
        let target = Point::new(x as f64, y as f64);
        if !self.set_transition(self.logical_point(), target, speed, now) {
            return;
        }
        self.on_transition_finished(
            Box::new(move |tile: &mut Tile, at: f64| {
                let home = tile.logical_point();
                tile.set_transition(target, home, speed, at);
            }),
            now,
        );
    }

    /// Run `callback` once the current transition finishes, or right away if
    /// there is none or it already finished.
    pub fn on_transition_finished(&mut self, callback: OnFinished<Tile>, now: f64) {
        let ready = match self.transition.as_mut() {
            Some(transition) => transition.on_finished(callback, now),
            None => Some(callback),
        };
        if let Some(callback) = ready {
            callback(self, now);
        }
    }

    /// Where the tile should be drawn at `now`. A finished transition is reaped
    /// here and its callbacks fire in registration order.
    pub fn current_position(&mut self, now: f64) -> Point {
        if let Some(transition) = &self.transition {
            let (pos, finished) = transition.current_position(now);
            if !finished {
                return pos;
            }
        }
        if let Some(done) = self.transition.take() {
            for callback in done.into_callbacks() {
                callback(self, now);
            }
            // a callback may have chained a follow-up move
            if let Some(next) = &self.transition {
                return next.current_position(now).0;
            }
        }
        self.logical_point()
    }

    pub fn render(&mut self, now: f64, settings: &GameSettings, surface: &mut dyn Surface) {
        let pos = self.current_position(now);
        let size = settings.tile_size;
        surface.fill_rect(
            pos.x * size,
            pos.y * size,
            size,
            size,
            settings.color_for(self.kind),
        );
    }
}
