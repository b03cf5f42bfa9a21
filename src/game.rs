//! Player-facing controller: turns pointer and key input into board
//! operations and drives the board once per frame.

use std::rc::Rc;

use crate::board::Board;
use crate::render::Surface;
use crate::settings::{ConfigError, GameSettings, TileKind};

/// Time between two rain steps.
pub const RAIN_INTERVAL_MS: f64 = 30.0;

/// Picks a palette index; reduced modulo the palette size by the caller.
pub type KindRoll = Box<dyn FnMut() -> usize>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    /// No gesture in progress, the board was busy, or the cells were not
    /// two occupied neighbours.
    Ignored,
    /// The swap makes a combo and was applied.
    Swapped,
    /// No combo: both tiles bounce back and the grid is unchanged.
    Rejected,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Rain {
    column: i32,
    next_at_ms: f64,
}

pub struct Game {
    settings: Rc<GameSettings>,
    board: Board,
    pressed: Option<(i32, i32)>,
    rain: Option<Rain>,
    roll: KindRoll,
}

#[cfg(feature = "rng")]
fn random_index() -> usize {
    let mut buf = [0u8; 4];
    match getrandom::getrandom(&mut buf) {
        Ok(()) => u32::from_le_bytes(buf) as usize,
        Err(err) => {
            log::warn!("getrandom failed ({err}), using kind 0");
            0
        }
    }
}

fn default_roll() -> KindRoll {
    #[cfg(feature = "rng")]
    {
        Box::new(random_index)
    }
    #[cfg(not(feature = "rng"))]
    {
        let mut next = 0usize;
        Box::new(move || {
            next = next.wrapping_add(1);
            next
        })
    }
}

impl Game {
    pub fn new(settings: GameSettings) -> Result<Self, ConfigError> {
        Self::with_roll(settings, default_roll())
    }

    /// Like [`Game::new`] but with an explicit kind source, e.g. a fixed
    /// sequence for reproducible boards.
    pub fn with_roll(settings: GameSettings, roll: KindRoll) -> Result<Self, ConfigError> {
        settings.validate()?;
        let settings = Rc::new(settings);
        let mut game = Self {
            board: Board::new(Rc::clone(&settings)),
            settings,
            pressed: None,
            rain: None,
            roll,
        };
        if game.settings.fill_on_start {
            game.board.populate(&mut game.roll);
            log::info!(
                "filled {}x{} board",
                game.settings.board_width,
                game.settings.board_height
            );
        }
        Ok(game)
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn canvas_size(&self) -> (f64, f64) {
        (self.settings.canvas_width(), self.settings.canvas_height())
    }

    pub fn pixel_to_cell(&self, px: f64, py: f64) -> (i32, i32) {
        let size = self.settings.tile_size;
        ((px / size).floor() as i32, (py / size).floor() as i32)
    }

    /// The cell picked by the last accepted pointer-down, if any.
    pub fn pressed(&self) -> Option<(i32, i32)> {
        self.pressed
    }

    pub fn pointer_down(&mut self, px: f64, py: f64) {
        if !self.board.player_can_move() {
            return;
        }
        let (x, y) = self.pixel_to_cell(px, py);
        if self.board.is_in_bounds(x, y) {
            self.pressed = Some((x, y));
        }
    }

    pub fn pointer_up(&mut self, px: f64, py: f64, now: f64) -> MoveOutcome {
        let Some((x1, y1)) = self.pressed.take() else {
            return MoveOutcome::Ignored;
        };
        if !self.board.player_can_move() {
            return MoveOutcome::Ignored;
        }
        let (x2, y2) = self.pixel_to_cell(px, py);
        if (x1 - x2).abs() + (y1 - y2).abs() != 1 {
            return MoveOutcome::Ignored;
        }
        if self.board.tile_at(x1, y1).is_none() || self.board.tile_at(x2, y2).is_none() {
            return MoveOutcome::Ignored;
        }
        if self.board.swap_creates_combo(x1, y1, x2, y2) {
            self.board.switch_tiles(x1, y1, x2, y2, now);
            MoveOutcome::Swapped
        } else {
            log::debug!("swap ({x1},{y1}) <-> ({x2},{y2}) makes no combo");
            self.board.attempt_move(x1, y1, x2, y2, now);
            self.board.attempt_move(x2, y2, x1, y1, now);
            MoveOutcome::Rejected
        }
    }

    /// Keyboard shortcuts. Returns whether the key was handled.
    pub fn key_down(&mut self, key: &str, now: f64) -> bool {
        match key {
            "d" => {
                self.start_rain(now);
                true
            }
            _ => false,
        }
    }

    /// Drop a new tile into the top of each column in turn, one column every
    /// [`RAIN_INTERVAL_MS`]. Restarts from the first column if already raining.
    pub fn start_rain(&mut self, now: f64) {
        log::debug!("rain started");
        self.rain = Some(Rain {
            column: 0,
            next_at_ms: now + RAIN_INTERVAL_MS,
        });
    }

    pub fn is_raining(&self) -> bool {
        self.rain.is_some()
    }

    fn next_kind(&mut self) -> Option<TileKind> {
        let kinds = self.settings.kinds();
        if kinds.is_empty() {
            return None;
        }
        let index = (self.roll)() % kinds.len();
        Some(kinds[index])
    }

    fn advance_rain(&mut self, now: f64) {
        while let Some(rain) = self.rain {
            if now < rain.next_at_ms {
                return;
            }
            if let Some(kind) = self.next_kind() {
                self.board.set_tile(kind, rain.column, 0);
            }
            self.board.drop_tiles(now);
            let column = rain.column + 1;
            self.rain = (column < self.settings.board_width as i32).then_some(Rain {
                column,
                next_at_ms: rain.next_at_ms + RAIN_INTERVAL_MS,
            });
        }
    }

    pub fn tick(&mut self, now: f64) {
        self.advance_rain(now);
        self.board.tick(now);
    }

    pub fn render(&mut self, now: f64, surface: &mut dyn Surface) {
        self.board.render(now, surface);
    }
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("board", &self.board)
            .field("pressed", &self.pressed)
            .field("rain", &self.rain)
            .finish_non_exhaustive()
    }
}
