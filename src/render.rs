//! Drawing capability the core depends on. The board and tiles only ever emit
//! axis-aligned filled rectangles; the canvas binding lives in `web.rs`.

use crate::settings::GameSettings;

pub trait Surface {
    /// Wipe the whole `width` x `height` area.
    fn clear(&mut self, width: f64, height: f64);
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str);
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCall {
    Clear { width: f64, height: f64 },
    Rect { x: f64, y: f64, w: f64, h: f64, color: String },
}

/// Headless surface that records every call, for tests and offscreen runs.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub calls: Vec<DrawCall>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rectangles filled with `color`, in draw order.
    pub fn rects_with_color(&self, color: &str) -> Vec<(f64, f64, f64, f64)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DrawCall::Rect { x, y, w, h, color: c } if c == color => Some((*x, *y, *w, *h)),
                _ => None,
            })
            .collect()
    }
}

impl Surface for RecordingSurface {
    fn clear(&mut self, width: f64, height: f64) {
        self.calls.push(DrawCall::Clear { width, height });
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str) {
        self.calls.push(DrawCall::Rect {
            x,
            y,
            w,
            h,
            color: color.to_string(),
        });
    }
}

/// Border lines between cells: interior verticals then interior horizontals.
pub fn draw_grid_lines(settings: &GameSettings, surface: &mut dyn Surface) {
    let tile = settings.tile_size;
    let full_w = settings.canvas_width();
    let full_h = settings.canvas_height();
    for col in 1..settings.board_width {
        surface.fill_rect(
            col as f64 * tile,
            0.0,
            settings.border_width,
            full_h,
            &settings.border_color,
        );
    }
    for row in 1..settings.board_height {
        surface.fill_rect(
            0.0,
            row as f64 * tile,
            full_w,
            settings.border_width,
            &settings.border_color,
        );
    }
}
