//! Poster configuration: text, palette and shader parameters.
//!
//! Settings are plain serde structs read from JSON. Every struct carries
//! `#[serde(default)]`, so a partial document only overrides what it names.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::export::CaptureRequest;
use crate::palette::Palette;

/// Everything the page lets the user configure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PosterSettings {
    pub title: String,
    pub subtitle: String,
    pub palette: Palette,
    pub shader: ShaderParams,
}

impl Default for PosterSettings {
    fn default() -> Self {
        Self {
            title: "Untitled".to_owned(),
            subtitle: String::new(),
            palette: Palette::default(),
            shader: ShaderParams::default(),
        }
    }
}

/// Knobs feeding the gradient shader.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderParams {
    /// Multiplier on wall-clock time for the animation.
    pub speed: f32,
    /// Film-grain amplitude, `0.0` disables it.
    pub grain: f32,
    /// Preview blur radius in display pixels.
    pub blur: f32,
    /// Spatial frequency of the noise field.
    pub scale: f32,
}

impl Default for ShaderParams {
    fn default() -> Self {
        Self {
            speed: 0.4,
            grain: 0.08,
            blur: 0.0,
            scale: 1.5,
        }
    }
}

impl ShaderParams {
    /// Clamps every parameter into the range the UI sliders expose; NaN
    /// falls back to the default.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let clamp = |v: f32, lo: f32, hi: f32, fallback: f32| {
            if v.is_nan() {
                fallback
            } else {
                v.clamp(lo, hi)
            }
        };
        Self {
            speed: clamp(self.speed, 0.0, 5.0, defaults.speed),
            grain: clamp(self.grain, 0.0, 1.0, defaults.grain),
            blur: clamp(self.blur, 0.0, 100.0, defaults.blur),
            scale: clamp(self.scale, 0.1, 10.0, defaults.scale),
        }
    }
}

impl PosterSettings {
    pub fn from_json(text: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(text)?;
        Ok(settings.sanitized())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        log::debug!("loading poster settings from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn sanitized(mut self) -> Self {
        self.shader = self.shader.sanitized();
        self
    }

    /// Export request that bakes the current preview blur into the capture.
    pub fn capture_request(&self, scale_factor: f64) -> CaptureRequest {
        CaptureRequest::new(scale_factor, f64::from(self.shader.blur))
    }

    /// Copies generated text over the current settings. The palette is only
    /// replaced when the reply carried exactly five valid colors.
    pub fn apply_generated(&mut self, content: &GeneratedContent) {
        if let Some(title) = content.title.as_deref().map(str::trim) {
            if !title.is_empty() {
                self.title = title.to_owned();
            }
        }
        if let Some(subtitle) = content.subtitle.as_deref() {
            self.subtitle = subtitle.trim().to_owned();
        }
        match Palette::from_hex(&content.palette) {
            Ok(palette) => self.palette = palette,
            Err(e) if !content.palette.is_empty() => {
                log::warn!("ignoring generated palette: {e}");
            }
            Err(_) => {}
        }
    }
}

/// Title, subtitle and palette suggested by the content-generation service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratedContent {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    #[serde(alias = "colors")]
    pub palette: Vec<String>,
}

impl GeneratedContent {
    /// Best-effort parse of a model reply.
    ///
    /// The reply is tried as JSON first; failing that, the slice from the
    /// first `{` to the last `}` is tried, which covers replies wrapped in
    /// prose or code fences. Anything else yields `None`.
    pub fn parse(reply: &str) -> Option<Self> {
        if let Ok(content) = serde_json::from_str::<Self>(reply.trim()) {
            return Some(content);
        }
        let start = reply.find('{')?;
        let end = reply.rfind('}')?;
        if end <= start {
            return None;
        }
        match serde_json::from_str::<Self>(&reply[start..=end]) {
            Ok(content) => Some(content),
            Err(e) => {
                log::warn!("could not extract generated content: {e}");
                None
            }
        }
    }
}
