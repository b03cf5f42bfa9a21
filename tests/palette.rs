// Integration tests for settings and palette invariants.
// These tests are native-friendly and avoid wasm/browser APIs.

use std::collections::HashSet;

use candy_crate::{Game, GameSettings, TileKind};
use candy_crate::settings::FALLBACK_TILE_COLOR;

#[test]
fn default_palette_colors_are_distinct() {
    let settings = GameSettings::default();
    let mut seen = HashSet::new();
    for kind in settings.kinds() {
        let color = settings.color_for(kind);
        assert_ne!(color, FALLBACK_TILE_COLOR, "kind {kind:?} has no color");
        assert_ne!(color, settings.border_color, "kind {kind:?} blends into the grid lines");
        assert!(seen.insert(color), "duplicate color '{color}'");
    }
    assert!(seen.len() >= 3, "too few kinds to avoid starting combos");
}

#[test]
fn filled_board_uses_only_palette_kinds() {
    let settings = GameSettings::default();
    let palette: HashSet<TileKind> = settings.kinds().into_iter().collect();
    let mut n = 0usize;
    let game = Game::with_roll(
        settings,
        Box::new(move || {
            n = n.wrapping_mul(31).wrapping_add(7);
            n
        }),
    )
    .unwrap();
    for tile in game.board().tiles() {
        assert!(palette.contains(&tile.kind()));
    }
    assert!(game.board().all_combos().is_empty());
}

#[cfg(feature = "serde_json")]
#[test]
fn json_override_drives_board_size() {
    let settings =
        GameSettings::from_json(r#"{"board_width": 5, "board_height": 4, "fill_on_start": false}"#).unwrap();
    let game = Game::new(settings).unwrap();
    assert_eq!(game.board().width(), 5);
    assert_eq!(game.board().height(), 4);
    assert_eq!(game.canvas_size(), (200.0, 160.0));
    assert_eq!(game.board().tile_count(), 0);
}

#[cfg(feature = "serde_json")]
#[test]
fn json_with_bad_values_is_rejected() {
    let err = GameSettings::from_json(r#"{"transition_speed": -3}"#).unwrap_err();
    assert!(err.to_string().contains("transition_speed"));
}
