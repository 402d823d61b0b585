//! Error types shared by the compositor and the settings loader.

use thiserror::Error;

/// Errors that can occur while capturing or exporting a still image.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("render surface is not initialized")]
    SurfaceUnavailable,
    #[error("could not obtain a {width}x{height} drawing surface")]
    ContextUnavailable { width: u32, height: u32 },
    #[error("invalid capture request: {0}")]
    InvalidRequest(String),
    #[error("pixel readback returned {actual} bytes, expected {expected}")]
    Readback { expected: usize, actual: usize },
    #[error("render surface failed to draw: {0}")]
    Render(String),
    #[error("failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),
}

/// Errors raised while loading or parsing poster settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid color {0:?}, expected #rrggbb")]
    Color(String),
    #[error("palette needs exactly 5 colors, got {0}")]
    PaletteLength(usize),
}
