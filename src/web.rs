//! Browser frontend: canvas setup, DOM listeners and the animation-frame loop.
//! All game state lives in one thread-local and is only touched from event
//! and frame callbacks.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, KeyboardEvent, MouseEvent, window};

use crate::game::Game;
use crate::render::Surface;
use crate::settings::{ConfigError, GameSettings};

pub const CANVAS_ID: &str = "main-canvas";

#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("no global window")]
    NoWindow,
    #[error("window has no document")]
    NoDocument,
    #[error("document has no body")]
    NoBody,
    #[error("element #{0} is not a canvas")]
    NotACanvas(String),
    #[error("canvas has no 2d context")]
    NoContext,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("javascript error: {0}")]
    Js(String),
}

impl From<JsValue> for WebError {
    fn from(value: JsValue) -> Self {
        WebError::Js(value.as_string().unwrap_or_else(|| format!("{value:?}")))
    }
}

impl From<WebError> for JsValue {
    fn from(err: WebError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

/// [`Surface`] backed by a 2d canvas context.
pub struct CanvasSurface {
    ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    pub fn new(ctx: CanvasRenderingContext2d) -> Self {
        Self { ctx }
    }
}

impl Surface for CanvasSurface {
    fn clear(&mut self, width: f64, height: f64) {
        self.ctx.clear_rect(0.0, 0.0, width, height);
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str) {
        self.ctx.set_fill_style_str(color);
        self.ctx.fill_rect(x, y, w, h);
    }
}

struct Frontend {
    game: Game,
    surface: CanvasSurface,
}

thread_local! {
    static FRONTEND: RefCell<Option<Frontend>> = const { RefCell::new(None) };
}

fn performance_now() -> f64 {
    window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

fn with_game(f: impl FnOnce(&mut Game)) {
    FRONTEND.with(|cell| {
        if let Some(frontend) = cell.borrow_mut().as_mut() {
            f(&mut frontend.game);
        }
    });
}

fn find_or_create_canvas(doc: &Document) -> Result<HtmlCanvasElement, WebError> {
    if let Some(el) = doc.get_element_by_id(CANVAS_ID) {
        return el
            .dyn_into()
            .map_err(|_| WebError::NotACanvas(CANVAS_ID.to_string()));
    }
    let canvas: HtmlCanvasElement = doc
        .create_element("canvas")?
        .dyn_into()
        .map_err(|_| WebError::NotACanvas(CANVAS_ID.to_string()))?;
    canvas.set_id(CANVAS_ID);
    doc.body().ok_or(WebError::NoBody)?.append_child(&canvas)?;
    Ok(canvas)
}

/// Build a game from `settings`, bind it to `#main-canvas` and start the
/// frame loop. A second call replaces the running game and keeps the
/// listeners and loop already installed.
pub fn start(settings: GameSettings) -> Result<(), WebError> {
    let win = window().ok_or(WebError::NoWindow)?;
    let doc = win.document().ok_or(WebError::NoDocument)?;
    let canvas = find_or_create_canvas(&doc)?;

    let game = Game::new(settings)?;
    let (width, height) = game.canvas_size();
    canvas.set_width(width as u32);
    canvas.set_height(height as u32);
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or(WebError::NoContext)?
        .dyn_into()
        .map_err(|_| WebError::NoContext)?;

    let frontend = Frontend {
        game,
        surface: CanvasSurface::new(ctx),
    };
    let first_start = FRONTEND.with(|cell| cell.borrow_mut().replace(frontend).is_none());
    if first_start {
        install_listeners(&doc, &canvas)?;
        start_frame_loop();
        log::info!("game started on #{CANVAS_ID} ({width}x{height})");
    } else {
        log::info!("game restarted");
    }
    Ok(())
}

fn install_listeners(doc: &Document, canvas: &HtmlCanvasElement) -> Result<(), WebError> {
    {
        let closure = Closure::wrap(Box::new(move |evt: MouseEvent| {
            let (x, y) = (evt.offset_x() as f64, evt.offset_y() as f64);
            with_game(|game| game.pointer_down(x, y));
        }) as Box<dyn FnMut(_)>);
        canvas.add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    {
        let closure = Closure::wrap(Box::new(move |evt: MouseEvent| {
            let (x, y) = (evt.offset_x() as f64, evt.offset_y() as f64);
            let now = performance_now();
            with_game(|game| {
                let outcome = game.pointer_up(x, y, now);
                log::trace!("pointer up at ({x}, {y}): {outcome:?}");
            });
        }) as Box<dyn FnMut(_)>);
        canvas.add_event_listener_with_callback("mouseup", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    {
        let closure = Closure::wrap(Box::new(move |evt: KeyboardEvent| {
            let key = evt.key();
            let now = performance_now();
            with_game(|game| {
                game.key_down(&key, now);
            });
        }) as Box<dyn FnMut(_)>);
        doc.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    Ok(())
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

fn request_frame(callback: &FrameCallback) {
    let Some(w) = window() else {
        return;
    };
    if let Some(cb) = callback.borrow().as_ref() {
        if let Err(err) = w.request_animation_frame(cb.as_ref().unchecked_ref()) {
            log::error!("requestAnimationFrame failed: {err:?}");
        }
    }
}

fn start_frame_loop() {
    let f: FrameCallback = Rc::new(RefCell::new(None));
    let g = Rc::clone(&f);
    *g.borrow_mut() = Some(Closure::wrap(Box::new(move |ts: f64| {
        FRONTEND.with(|cell| {
            if let Some(frontend) = cell.borrow_mut().as_mut() {
                frontend.game.tick(ts);
                frontend.game.render(ts, &mut frontend.surface);
            }
        });
        request_frame(&f);
    }) as Box<dyn FnMut(f64)>));
    request_frame(&g);
}
