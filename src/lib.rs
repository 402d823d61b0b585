#![cfg_attr(target_arch = "wasm32", allow(dead_code))]

//! Animated poster background with high-resolution PNG export.
//!
//! The core (pixel buffers, blur, gradient, export compositor) is plain
//! Rust and runs on the host; the WebGL2 canvas binding is only compiled
//! for wasm32.

pub mod blur;
pub mod error;
pub mod export;
pub mod gradient;
pub mod palette;
pub mod pixels;
pub mod preview;
pub mod settings;
pub mod surface;

pub use error::{ExportError, SettingsError};
pub use export::{capture, export_data_uri, export_png, CaptureRequest, ExportedImage};
pub use palette::{Palette, Rgb};
pub use pixels::PixelBuffer;
pub use preview::{AnimationClock, PreviewMode};
pub use settings::{GeneratedContent, PosterSettings, ShaderParams};
pub use surface::{with_temporary_resolution, RenderSurface, SoftwareSurface, TemporaryResolution};

// Only compile wasm-specific code when targeting wasm32.

#[cfg(target_arch = "wasm32")]
mod wasm {
    use wasm_bindgen::prelude::*;

    mod app;
    mod logger;
    mod render;

    pub use app::PosterApp;
    pub use render::GlSurface;

    #[wasm_bindgen(start)]
    pub fn main() -> Result<(), JsValue> {
        logger::init(log::LevelFilter::Info);
        log::info!("poster renderer loaded");
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm::{GlSurface, PosterApp};
