//! Candy Crate core crate.
//!
//! A match-3 board engine (combo detection, gravity, animated transitions and
//! the settle-then-cascade loop) plus a canvas frontend exposed to JS through
//! `start_game()`. The engine itself only depends on the [`Surface`] trait and
//! explicit millisecond timestamps, so it runs natively under test.

use wasm_bindgen::prelude::*;

pub mod board;
pub mod game;
pub mod logging;
pub mod render;
pub mod settings;
pub mod tile;
pub mod transition;
pub mod web;

pub use board::{Board, Combo};
pub use game::{Game, MoveOutcome};
pub use render::{DrawCall, RecordingSurface, Surface};
pub use settings::{ConfigError, GameSettings, TileKind};
pub use tile::Tile;
pub use transition::{Point, Transition};

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    logging::init();
}

#[wasm_bindgen]
pub fn start_game() -> Result<(), JsValue> {
    Ok(web::start(GameSettings::default())?)
}

/// Start with a partial JSON override of the default settings.
#[cfg(feature = "serde_json")]
#[wasm_bindgen]
pub fn start_game_with_settings(json: &str) -> Result<(), JsValue> {
    let settings = GameSettings::from_json(json).map_err(web::WebError::from)?;
    Ok(web::start(settings)?)
}
