//! Run detection along a single row or column.

use crate::settings::TileKind;
use crate::tile::Tile;

/// A maximal run of same-kind tiles, listed by cell in line order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Combo {
    pub kind: TileKind,
    pub cells: Vec<(i32, i32)>,
}

impl Combo {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.cells.contains(&(x, y))
    }
}

fn flush_run(
    found: &mut Vec<Combo>,
    kind: Option<TileKind>,
    run: &mut Vec<(i32, i32)>,
    min_combo: usize,
) {
    let cells = std::mem::take(run);
    if let Some(kind) = kind {
        if cells.len() >= min_combo {
            found.push(Combo { kind, cells });
        }
    }
}

/// Scan an ordered line of cells and return every run of at least `min_combo`
/// consecutive tiles of one kind. An empty cell ends the current run. Runs
/// list the scanned cell coordinates, whatever the tiles believe their own
/// coordinates to be.
pub fn check_combos_in_line<'a, I>(line: I, min_combo: usize) -> Vec<Combo>
where
    I: IntoIterator<Item = ((i32, i32), Option<&'a Tile>)>,
{
    let mut found = Vec::new();
    let mut run = Vec::new();
    let mut run_kind: Option<TileKind> = None;
    for (cell, occupant) in line {
        match occupant {
            Some(tile) if run_kind == Some(tile.kind()) => run.push(cell),
            Some(tile) => {
                flush_run(&mut found, run_kind, &mut run, min_combo);
                run_kind = Some(tile.kind());
                run.push(cell);
            }
            None => {
                flush_run(&mut found, run_kind, &mut run, min_combo);
                run_kind = None;
            }
        }
    }
    flush_run(&mut found, run_kind, &mut run, min_combo);
    found
}
