//! Match-3 board: the tile grid plus the combo / gravity state machine.
//!
//! Every step that needs tiles to finish moving first (clearing after a swap,
//! clearing after a drop) is deferred through the board's single settle task,
//! which `tick` advances:
//!
//! swap -> settle -> clear combos -> drop -> settle -> clear combos -> ...
//!
//! The cascade ends on a pass where nothing drops.
use std::rc::Rc;

use crate::render::{Surface, draw_grid_lines};
use crate::settings::{GameSettings, TileKind};
use crate::tile::Tile;

mod combos;
mod settle;

pub use combos::{Combo, check_combos_in_line};
pub use settle::Deferred;
use settle::SettleTask;

pub struct Board {
    settings: Rc<GameSettings>,
    width: usize,
    height: usize,
    /// Column-major: grid[x][y], y = 0 is the top row.
    grid: Vec<Vec<Option<Tile>>>,
    pending: Option<SettleTask>,
}

impl Board {
    pub fn new(settings: Rc<GameSettings>) -> Self {
        let width = settings.board_width;
        let height = settings.board_height;
        let grid = (0..width)
            .map(|_| (0..height).map(|_| None).collect())
            .collect();
        Self {
            settings,
            width,
            height,
            grid,
            pending: None,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn is_in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    fn cell_mut(&mut self, x: i32, y: i32) -> Option<&mut Option<Tile>> {
        if !self.is_in_bounds(x, y) {
            return None;
        }
        self.grid
            .get_mut(x as usize)
            .and_then(|column| column.get_mut(y as usize))
    }

    pub fn tile_at(&self, x: i32, y: i32) -> Option<&Tile> {
        if !self.is_in_bounds(x, y) {
            return None;
        }
        self.grid
            .get(x as usize)
            .and_then(|column| column.get(y as usize))
            .and_then(Option::as_ref)
    }

    pub fn kind_at(&self, x: i32, y: i32) -> Option<TileKind> {
        self.tile_at(x, y).map(Tile::kind)
    }

    /// Every occupied cell, column by column.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> + '_ {
        self.grid.iter().flatten().flatten()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles().count()
    }

    /// Kinds per cell, column-major like the grid.
    pub fn snapshot(&self) -> Vec<Vec<Option<TileKind>>> {
        self.grid
            .iter()
            .map(|column| column.iter().map(|c| c.as_ref().map(Tile::kind)).collect())
            .collect()
    }

    /// Place a new tile of `kind`. Out-of-bounds requests are ignored.
    pub fn set_tile(&mut self, kind: TileKind, x: i32, y: i32) {
        if let Some(cell) = self.cell_mut(x, y) {
            *cell = Some(Tile::new(kind, x, y));
        }
    }

    /// Put `tile` into (x, y) as is, replacing any occupant. The tile's own
    /// coordinate is not touched. Out-of-bounds requests are ignored.
    pub fn insert_tile_at(&mut self, tile: Tile, x: i32, y: i32) {
        if let Some(cell) = self.cell_mut(x, y) {
            *cell = Some(tile);
        }
    }

    pub fn remove_tile_at(&mut self, x: i32, y: i32) -> Option<Tile> {
        self.cell_mut(x, y).and_then(Option::take)
    }

    /// Hand the tile at the source cell over to the destination cell and
    /// animate it there. No-op when the source is empty.
    pub fn move_tile_at(&mut self, sx: i32, sy: i32, ex: i32, ey: i32, now: f64) {
        if !self.is_in_bounds(ex, ey) {
            return;
        }
        let Some(mut tile) = self.remove_tile_at(sx, sy) else {
            return;
        };
        tile.move_to(ex, ey, Some(self.settings.transition_speed), now);
        self.insert_tile_at(tile, ex, ey);
    }

    fn exchange(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, speed: Option<f64>, now: f64) -> bool {
        if !self.is_in_bounds(x1, y1) || !self.is_in_bounds(x2, y2) || (x1, y1) == (x2, y2) {
            return false;
        }
        let first = self.remove_tile_at(x1, y1);
        let second = self.remove_tile_at(x2, y2);
        if let Some(mut tile) = first {
            tile.move_to(x2, y2, speed, now);
            self.insert_tile_at(tile, x2, y2);
        }
        if let Some(mut tile) = second {
            tile.move_to(x1, y1, speed, now);
            self.insert_tile_at(tile, x1, y1);
        }
        true
    }

    /// Swap two cells with animation, then clear combos once both tiles have
    /// arrived.
    pub fn switch_tiles(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, now: f64) {
        let speed = Some(self.settings.transition_speed);
        if self.exchange(x1, y1, x2, y2, speed, now) {
            log::debug!("switch ({x1},{y1}) <-> ({x2},{y2})");
            self.schedule_clear(now);
        }
    }

    /// Swap two cells instantly, with no animation and nothing scheduled.
    pub fn swap_cells(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) {
        self.exchange(x1, y1, x2, y2, None, 0.0);
    }

    /// Play the forward-and-back move of the tile at (x, y) towards (tx, ty).
    pub fn attempt_move(&mut self, x: i32, y: i32, tx: i32, ty: i32, now: f64) {
        let speed = self.settings.transition_speed;
        if let Some(tile) = self.cell_mut(x, y).and_then(Option::as_mut) {
            tile.attempt_move(tx, ty, speed, now);
        }
    }

    /// Let every column fall: tiles keep their order and pack at the bottom.
    /// Schedules a combo check when anything moved. Returns whether it did.
    pub fn drop_tiles(&mut self, now: f64) -> bool {
        let mut dropped = false;
        for x in 0..self.width as i32 {
            let mut bottom = self.height as i32 - 1;
            for y in (0..self.height as i32).rev() {
                if self.tile_at(x, y).is_none() {
                    continue;
                }
                if y != bottom {
                    self.move_tile_at(x, y, x, bottom, now);
                    dropped = true;
                }
                bottom -= 1;
            }
        }
        if dropped {
            log::debug!("tiles dropped, waiting before the next combo check");
            self.schedule_clear(now);
        }
        dropped
    }

    pub fn check_combos_in_line<'a, I>(&self, line: I) -> Vec<Combo>
    where
        I: IntoIterator<Item = ((i32, i32), Option<&'a Tile>)>,
    {
        check_combos_in_line(line, self.settings.min_combo)
    }

    /// Cells of column `x`, top to bottom, keyed by cell coordinate.
    pub fn column(&self, x: i32) -> impl Iterator<Item = ((i32, i32), Option<&Tile>)> + '_ {
        (0..self.height as i32).map(move |y| ((x, y), self.tile_at(x, y)))
    }

    /// Cells of row `y`, left to right, keyed by cell coordinate.
    pub fn row(&self, y: i32) -> impl Iterator<Item = ((i32, i32), Option<&Tile>)> + '_ {
        (0..self.width as i32).map(move |x| ((x, y), self.tile_at(x, y)))
    }

    /// Vertical combos (column by column) followed by horizontal ones. A tile
    /// can appear in one of each.
    pub fn all_combos(&self) -> Vec<Combo> {
        let vertical = (0..self.width as i32).flat_map(|x| self.check_combos_in_line(self.column(x)));
        let horizontal = (0..self.height as i32).flat_map(|y| self.check_combos_in_line(self.row(y)));
        vertical.chain(horizontal).collect()
    }

    pub fn break_combo(&mut self, combo: &Combo) {
        for &(x, y) in &combo.cells {
            self.remove_tile_at(x, y);
        }
    }

    /// Remove every combo on the board, then let the rest fall.
    pub fn clear_combos(&mut self, now: f64) {
        let combos = self.all_combos();
        if !combos.is_empty() {
            log::debug!("clearing {} combo(s)", combos.len());
        }
        for combo in &combos {
            self.break_combo(combo);
        }
        self.drop_tiles(now);
    }

    fn schedule_clear(&mut self, now: f64) {
        let delay = self.settings.settle_delay_secs;
        self.await_active_transitions(|board: &mut Board, at: f64| board.clear_combos(at), delay, now);
    }

    /// Run `callback` once no tile is moving and a further `delay_secs` have
    /// passed. Replaces (and never runs) any wait already pending.
    pub fn await_active_transitions<F>(&mut self, callback: F, delay_secs: f64, now: f64)
    where
        F: FnOnce(&mut Board, f64) + 'static,
    {
        if self.pending.is_some() {
            log::trace!("superseding pending settle task");
        }
        self.pending = Some(SettleTask::new(
            Box::new(callback),
            delay_secs * 1000.0,
            self.settings.poll_interval_ms,
            now,
        ));
    }

    /// Drop the pending wait, if any, without running it.
    pub fn cancel_pending(&mut self) {
        self.pending = None;
    }

    pub fn player_can_move(&self) -> bool {
        self.pending.is_none()
    }

    pub fn is_settling(&self) -> bool {
        self.pending.as_ref().is_some_and(SettleTask::is_settling)
    }

    pub fn has_active_transitions(&self) -> bool {
        self.tiles().any(Tile::has_transition)
    }

    pub fn active_transition_count(&self) -> usize {
        self.tiles().filter(|t| t.has_transition()).count()
    }

    /// Advance the pending settle task to `now`, running its callback when due.
    pub fn tick(&mut self, now: f64) {
        let active = self.has_active_transitions();
        let due = match self.pending.as_mut() {
            Some(task) => task.advance(now, active),
            None => return,
        };
        if !due {
            return;
        }
        if let Some(task) = self.pending.take() {
            (task.into_callback())(self, now);
        }
    }

    /// Poll every tile's transition without drawing; finished ones are reaped
    /// exactly as a render pass would.
    pub fn advance_transitions(&mut self, now: f64) {
        for tile in self.grid.iter_mut().flatten().flatten() {
            tile.current_position(now);
        }
    }

    pub fn render(&mut self, now: f64, surface: &mut dyn Surface) {
        let settings = Rc::clone(&self.settings);
        surface.clear(settings.canvas_width(), settings.canvas_height());
        draw_grid_lines(&settings, surface);
        for tile in self.grid.iter_mut().flatten().flatten() {
            tile.render(now, &settings, surface);
        }
    }

    /// Structural copy for speculative moves: fresh tiles, no transitions, no
    /// pending wait.
    pub fn generate_board_copy(&self) -> Board {
        let mut copy = Board::new(Rc::clone(&self.settings));
        for (x, column) in self.grid.iter().enumerate() {
            for (y, cell) in column.iter().enumerate() {
                if let Some(tile) = cell {
                    copy.set_tile(tile.kind(), x as i32, y as i32);
                }
            }
        }
        copy
    }

    /// True when swapping the two cells would leave at least one combo.
    pub fn swap_creates_combo(&self, x1: i32, y1: i32, x2: i32, y2: i32) -> bool {
        let mut copy = self.generate_board_copy();
        copy.swap_cells(x1, y1, x2, y2);
        !copy.all_combos().is_empty()
    }

    /// Would placing `kind` at (x, y) complete a run with its occupied
    /// neighbours?
    fn completes_run(&self, kind: TileKind, x: i32, y: i32) -> bool {
        let same = |dx: i32, dy: i32| {
            (1..)
                .take_while(|&step| self.kind_at(x + dx * step, y + dy * step) == Some(kind))
                .count()
        };
        let min = self.settings.min_combo;
        same(-1, 0) + same(1, 0) + 1 >= min || same(0, -1) + same(0, 1) + 1 >= min
    }

    /// Fill every empty cell. `roll` picks a palette index; a pick that would
    /// complete a run steps on to the next kind so the board starts without
    /// combos whenever the palette allows it.
    pub fn populate(&mut self, mut roll: impl FnMut() -> usize) {
        let kinds = self.settings.kinds();
        if kinds.is_empty() {
            return;
        }
        for x in 0..self.width as i32 {
            for y in 0..self.height as i32 {
                if self.tile_at(x, y).is_some() {
                    continue;
                }
                let start = roll() % kinds.len();
                let kind = (0..kinds.len())
                    .map(|step| kinds[(start + step) % kinds.len()])
                    .find(|&k| !self.completes_run(k, x, y))
                    .unwrap_or(kinds[start]);
                self.set_tile(kind, x, y);
            }
        }
    }
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("tiles", &self.tile_count())
            .field("pending", &self.pending)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(width: usize, height: usize) -> Board {
        Board::new(Rc::new(GameSettings {
            board_width: width,
            board_height: height,
            ..GameSettings::default()
        }))
    }

    /// Build a board from rows of kinds (0 = empty), top row first.
    fn board_from_rows(rows: &[&[u8]]) -> Board {
        let mut b = board(rows[0].len(), rows.len());
        for (y, row) in rows.iter().enumerate() {
            for (x, &k) in row.iter().enumerate() {
                if k != 0 {
                    b.set_tile(TileKind(k), x as i32, y as i32);
                }
            }
        }
        b
    }

    fn column_kinds(b: &Board, x: i32) -> Vec<Option<u8>> {
        b.column(x).map(|(_, t)| t.map(|t| t.kind().0)).collect()
    }

    /// Let the board run until nothing is pending, stepping 5 ms at a time.
    fn run_until_idle(b: &mut Board, mut now: f64) -> f64 {
        for _ in 0..10_000 {
            b.advance_transitions(now);
            b.tick(now);
            if b.player_can_move() && !b.has_active_transitions() {
                return now;
            }
            now += 5.0;
        }
        panic!("board never settled");
    }

    #[test]
    fn bounds_checks() {
        let b = board(4, 3);
        assert!(b.is_in_bounds(0, 0));
        assert!(b.is_in_bounds(3, 2));
        assert!(!b.is_in_bounds(-1, 0));
        assert!(!b.is_in_bounds(4, 0));
        assert!(!b.is_in_bounds(0, 3));
        assert!(b.tile_at(-1, 0).is_none());
        assert!(b.tile_at(4, 0).is_none());
    }

    #[test]
    fn out_of_bounds_mutation_is_ignored() {
        let mut b = board(2, 2);
        b.set_tile(TileKind(1), -1, 0);
        b.set_tile(TileKind(1), 2, 0);
        b.insert_tile_at(Tile::new(TileKind(1), 0, 5), 0, 5);
        assert!(b.remove_tile_at(9, 9).is_none());
        b.move_tile_at(0, 0, 1, 1, 0.0);
        assert_eq!(b.tile_count(), 0);
    }

    #[test]
    fn set_tile_records_coordinates() {
        let mut b = board(3, 3);
        b.set_tile(TileKind(2), 1, 2);
        let t = b.tile_at(1, 2).unwrap();
        assert_eq!(t.position(), (1, 2));
        assert_eq!(t.kind(), TileKind(2));
    }

    #[test]
    fn move_tile_transfers_ownership() {
        let mut b = board(3, 3);
        b.set_tile(TileKind(1), 0, 0);
        b.move_tile_at(0, 0, 0, 2, 0.0);
        assert!(b.tile_at(0, 0).is_none());
        let t = b.tile_at(0, 2).unwrap();
        assert_eq!(t.position(), (0, 2));
        assert!(t.has_transition());
    }

    #[test]
    fn drop_compacts_column_preserving_order() {
        let mut b = board(1, 5);
        b.set_tile(TileKind(1), 0, 0);
        b.set_tile(TileKind(2), 0, 2);
        b.set_tile(TileKind(3), 0, 4);
        assert!(b.drop_tiles(0.0));
        assert_eq!(column_kinds(&b, 0), vec![None, None, Some(1), Some(2), Some(3)]);
        for y in 2..5 {
            assert_eq!(b.tile_at(0, y).unwrap().y(), y);
        }
        assert!(!b.player_can_move());
    }

    #[test]
    fn settled_drop_is_idempotent() {
        let mut b = board_from_rows(&[&[1, 0, 2], &[0, 3, 0], &[4, 0, 0]]);
        assert!(b.drop_tiles(0.0));
        let once = b.snapshot();
        b.cancel_pending();
        assert!(!b.drop_tiles(0.0));
        assert_eq!(b.snapshot(), once);
        assert!(b.player_can_move());
    }

    #[test]
    fn gravity_is_column_local() {
        let mut b = board_from_rows(&[&[1, 2], &[0, 0], &[0, 3]]);
        b.drop_tiles(0.0);
        assert_eq!(column_kinds(&b, 0), vec![None, None, Some(1)]);
        assert_eq!(column_kinds(&b, 1), vec![None, Some(2), Some(3)]);
    }

    #[test]
    fn finds_vertical_and_horizontal_combos() {
        let b = board_from_rows(&[&[1, 2, 3], &[1, 2, 3], &[1, 1, 1]]);
        let combos = b.all_combos();
        assert_eq!(combos.len(), 2);
        assert_eq!(combos[0].cells, vec![(0, 0), (0, 1), (0, 2)]);
        assert_eq!(combos[1].cells, vec![(0, 2), (1, 2), (2, 2)]);
    }

    #[test]
    fn break_combo_empties_cells() {
        let mut b = board_from_rows(&[&[1, 1, 1]]);
        let combos = b.all_combos();
        assert_eq!(combos.len(), 1);
        assert_eq!(combos[0].len(), 3);
        b.break_combo(&combos[0]);
        assert_eq!(b.tile_count(), 0);
    }

    #[test]
    fn shared_tile_is_cleared_once_for_both_lines() {
        let mut b = board_from_rows(&[&[2, 1, 3], &[1, 1, 1], &[3, 1, 2]]);
        b.clear_combos(0.0);
        assert_eq!(b.tile_count(), 4);
        assert!(b.all_combos().is_empty());
    }

    #[test]
    fn copy_is_independent() {
        let mut b = board_from_rows(&[&[1, 2], &[3, 4]]);
        b.switch_tiles(0, 1, 1, 1, 0.0);
        let before = b.snapshot();

        let mut copy = b.generate_board_copy();
        assert!(copy.player_can_move());
        assert!(!copy.has_active_transitions());
        copy.remove_tile_at(0, 0);
        copy.swap_cells(0, 1, 1, 1);
        copy.set_tile(TileKind(9), 1, 0);

        assert_eq!(b.snapshot(), before);
        assert_eq!(b.tile_at(0, 1).unwrap().position(), (0, 1));
        assert!(b.has_active_transitions());
    }

    #[test]
    fn copy_follows_cells_not_tile_coordinates() {
        let mut b = board(2, 2);
        // a tile whose own coordinate disagrees with its cell
        b.insert_tile_at(Tile::new(TileKind(1), 1, 1), 0, 0);
        b.set_tile(TileKind(2), 1, 1);

        let copy = b.generate_board_copy();
        assert_eq!(copy.snapshot(), b.snapshot());
        assert_eq!(copy.tile_at(0, 0).unwrap().position(), (0, 0));
        assert_eq!(copy.kind_at(1, 1), Some(TileKind(2)));
    }

    #[test]
    fn break_combo_uses_scanned_cells() {
        let mut b = board(3, 2);
        for x in 0..3 {
            // every tile claims to live in the bottom row
            b.insert_tile_at(Tile::new(TileKind(1), x, 1), x, 0);
        }
        b.set_tile(TileKind(2), 0, 1);
        let combos = b.all_combos();
        assert_eq!(combos.len(), 1);
        assert_eq!(combos[0].cells, vec![(0, 0), (1, 0), (2, 0)]);
        b.break_combo(&combos[0]);
        assert_eq!(b.tile_count(), 1);
        assert_eq!(b.kind_at(0, 1), Some(TileKind(2)));
    }

    #[test]
    fn swap_cells_is_instant() {
        let mut b = board_from_rows(&[&[1, 2]]);
        b.swap_cells(0, 0, 1, 0);
        assert_eq!(b.kind_at(0, 0), Some(TileKind(2)));
        assert_eq!(b.tile_at(1, 0).unwrap().position(), (1, 0));
        assert!(!b.has_active_transitions());
        assert!(b.player_can_move());
    }

    #[test]
    fn swap_creates_combo_does_not_touch_the_board() {
        let b = board_from_rows(&[&[1, 2, 1], &[2, 1, 2]]);
        let before = b.snapshot();
        assert!(b.swap_creates_combo(1, 0, 1, 1));
        assert!(!b.swap_creates_combo(0, 0, 1, 0));
        assert_eq!(b.snapshot(), before);
    }

    #[test]
    fn switch_then_cascade_until_idle() {
        // swapping (1,0) and (1,1) completes the bottom row of 1s
        let mut b = board_from_rows(&[&[3, 1, 4], &[1, 2, 1]]);
        b.switch_tiles(1, 0, 1, 1, 0.0);
        assert!(!b.player_can_move());
        let end = run_until_idle(&mut b, 0.0);
        assert!(end > 0.0);
        assert_eq!(b.snapshot(), vec![
            vec![None, Some(TileKind(3))],
            vec![None, Some(TileKind(2))],
            vec![None, Some(TileKind(4))],
        ]);
    }

    #[test]
    fn new_wait_supersedes_old_one() {
        use std::cell::Cell;
        let fired = Rc::new(Cell::new(0u8));
        let mut b = board(2, 2);
        let first = Rc::clone(&fired);
        b.await_active_transitions(move |_: &mut Board, _: f64| first.set(first.get() + 1), 0.0, 0.0);
        let second = Rc::clone(&fired);
        b.await_active_transitions(move |_: &mut Board, _: f64| second.set(second.get() + 10), 0.0, 0.0);
        b.tick(10.0);
        assert_eq!(fired.get(), 10);
        b.tick(20.0);
        assert_eq!(fired.get(), 10);
        assert!(b.player_can_move());
    }

    #[test]
    fn wait_holds_until_transitions_reaped() {
        use std::cell::Cell;
        let fired = Rc::new(Cell::new(false));
        let mut b = board(1, 3);
        b.set_tile(TileKind(1), 0, 0);
        b.move_tile_at(0, 0, 0, 2, 0.0); // 2 cells at 7/s, ~286 ms
        let flag = Rc::clone(&fired);
        b.await_active_transitions(move |_: &mut Board, _: f64| flag.set(true), 0.25, 0.0);

        // finished in time, but not yet reaped by a render pass
        b.tick(400.0);
        assert!(!fired.get());
        b.advance_transitions(400.0);
        b.tick(410.0);
        assert!(!fired.get());
        assert!(b.is_settling());
        b.tick(659.0);
        assert!(!fired.get());
        b.tick(660.0);
        assert!(fired.get());
        assert!(b.player_can_move());
    }

    #[test]
    fn populate_avoids_starting_combos() {
        let mut b = board(8, 8);
        let mut n = 0usize;
        // a constant roll would otherwise build long runs
        b.populate(|| {
            n += 1;
            n / 100
        });
        assert_eq!(b.tile_count(), 64);
        assert!(b.all_combos().is_empty());
    }

    #[test]
    fn render_draws_lines_then_tiles() {
        use crate::render::{DrawCall, RecordingSurface};
        let mut b = board_from_rows(&[&[1, 0], &[0, 2]]);
        let mut surface = RecordingSurface::new();
        b.render(0.0, &mut surface);
        assert_eq!(surface.calls[0], DrawCall::Clear { width: 80.0, height: 80.0 });
        assert_eq!(surface.rects_with_color("#000000").len(), 2);
        assert_eq!(surface.rects_with_color("green"), vec![(0.0, 0.0, 40.0, 40.0)]);
        assert_eq!(surface.rects_with_color("red"), vec![(40.0, 40.0, 40.0, 40.0)]);
    }
}
