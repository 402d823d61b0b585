use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use super::render::{self, GlSurface};
use crate::export::{self, CaptureRequest, DEFAULT_SCALE_FACTOR};
use crate::gradient::GradientProgram;
use crate::preview::{AnimationClock, PreviewMode};
use crate::settings::{GeneratedContent, PosterSettings};

pub(crate) struct AppState {
    surface: Option<GlSurface>,
    settings: PosterSettings,
    clock: AnimationClock,
    preview: PreviewMode,
}

impl AppState {
    pub(crate) fn frame(&mut self, now_ms: f64) {
        let time = self.clock.tick(now_ms);
        if let Some(surface) = self.surface.as_mut() {
            surface.set_time(time);
            surface.render();
        }
    }

    pub(crate) fn fit_and_render(&mut self) {
        if let Some(surface) = self.surface.as_mut() {
            if surface.fit_to_display() {
                surface.render();
            }
        }
    }

    fn apply_settings(&mut self, settings: PosterSettings) {
        self.clock.set_speed(settings.shader.speed);
        if let Some(surface) = self.surface.as_mut() {
            surface.set_params(GradientProgram::from(&settings));
        }
        self.settings = settings;
    }

    fn request(&self, scale_factor: Option<f64>, blur_px: Option<f64>) -> CaptureRequest {
        let mut request = self
            .settings
            .capture_request(scale_factor.unwrap_or(DEFAULT_SCALE_FACTOR));
        if let Some(blur) = blur_px {
            request.blur_radius_px = blur;
        }
        request
    }
}

/// Handle the page script holds on to.
#[wasm_bindgen]
pub struct PosterApp {
    state: Rc<RefCell<AppState>>,
    started: bool,
}

#[wasm_bindgen]
impl PosterApp {
    /// Binds to the `<canvas>` with id `canvas_id`. A missing canvas or a
    /// browser without WebGL2 still yields an app; exports then return null.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str) -> PosterApp {
        let settings = PosterSettings::default();
        let surface = match find_canvas(canvas_id)
            .and_then(|canvas| GlSurface::new(canvas, GradientProgram::from(&settings)))
        {
            Ok(surface) => Some(surface),
            Err(e) => {
                log::error!("render surface unavailable: {e:?}");
                None
            }
        };
        let state = AppState {
            surface,
            clock: AnimationClock::new(settings.shader.speed),
            settings,
            preview: PreviewMode::Live,
        };
        PosterApp {
            state: Rc::new(RefCell::new(state)),
            started: false,
        }
    }

    /// Starts the animation loop. Calling it again is a no-op.
    pub fn start(&mut self) -> Result<(), JsValue> {
        if self.started {
            return Ok(());
        }
        render::start(self.state.clone())?;
        self.started = true;
        Ok(())
    }

    /// Replaces the settings from a JSON document; missing fields keep
    /// their defaults.
    pub fn set_settings(&self, json: &str) -> Result<(), JsValue> {
        let settings = PosterSettings::from_json(json).map_err(js_error)?;
        self.state.borrow_mut().apply_settings(settings);
        Ok(())
    }

    pub fn settings_json(&self) -> Result<String, JsValue> {
        self.state
            .borrow()
            .settings
            .to_json()
            .map_err(js_error)
    }

    /// Merges a content-generation reply into the settings. Returns false
    /// when nothing usable could be extracted.
    pub fn apply_generated(&self, reply: &str) -> bool {
        let Some(content) = GeneratedContent::parse(reply) else {
            return false;
        };
        let mut state = self.state.borrow_mut();
        let mut settings = state.settings.clone();
        settings.apply_generated(&content);
        state.apply_settings(settings);
        true
    }

    /// Exports the current frame as a PNG data URI, or null on failure.
    /// `scale_factor` defaults to 2 and `blur_px` to the preview blur.
    pub fn export_png(&self, scale_factor: Option<f64>, blur_px: Option<f64>) -> Option<String> {
        let mut state = self.state.borrow_mut();
        let request = state.request(scale_factor, blur_px);
        export::export_data_uri(state.surface.as_mut(), &request)
    }

    /// Freezes the preview on a capture of the current frame and returns its
    /// data URI for the overlay image.
    pub fn capture_preview(&self) -> Option<String> {
        let mut state = self.state.borrow_mut();
        let request = state.request(None, None);
        let surface = state.surface.as_mut()?;
        match export::export_png(surface, &request) {
            Ok(image) => {
                let uri = image.to_data_uri();
                state.preview = PreviewMode::Captured(image);
                Some(uri)
            }
            Err(e) => {
                log::error!("capture failed: {e}");
                None
            }
        }
    }

    /// Data URI of the frozen capture, or null while the preview is live.
    pub fn captured_uri(&self) -> Option<String> {
        self.state
            .borrow()
            .preview
            .captured()
            .map(|image| image.to_data_uri())
    }

    pub fn resume_live(&self) {
        self.state.borrow_mut().preview = PreviewMode::Live;
    }

    pub fn is_live(&self) -> bool {
        self.state.borrow().preview.is_live()
    }

    pub fn time(&self) -> f32 {
        self.state.borrow().clock.time()
    }
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&e.to_string()).into()
}

fn find_canvas(id: &str) -> Result<web_sys::HtmlCanvasElement, JsValue> {
    let window = web_sys::window().ok_or("no window")?;
    let document = window.document().ok_or("no document")?;
    let canvas = document
        .get_element_by_id(id)
        .ok_or("canvas not found")?
        .dyn_into::<web_sys::HtmlCanvasElement>()?;
    Ok(canvas)
}
