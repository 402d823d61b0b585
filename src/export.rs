//! High-resolution still export of the live surface.
//!
//! The surface is re-rendered once at `scale_factor` times its size, read
//! back and flipped to top-down order, then handed back to the live view
//! before any blur work starts. A non-zero blur is baked in after padding
//! the capture with replicated edge pixels, so the Gaussian never pulls
//! transparent black in from outside the image.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::blur;
use crate::error::ExportError;
use crate::pixels::{self, PixelBuffer};
use crate::surface::{with_temporary_resolution, RenderSurface};

pub const DEFAULT_SCALE_FACTOR: f64 = 2.0;

/// Parameters of one export, supplied by the caller at invocation time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureRequest {
    /// Output size relative to the surface's current size, at least 1.
    pub scale_factor: f64,
    /// Blur radius as authored at display resolution; 0 disables blur.
    pub blur_radius_px: f64,
}

impl Default for CaptureRequest {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            blur_radius_px: 0.0,
        }
    }
}

impl CaptureRequest {
    pub fn new(scale_factor: f64, blur_radius_px: f64) -> Self {
        Self {
            scale_factor,
            blur_radius_px,
        }
    }

    pub fn validate(&self) -> Result<(), ExportError> {
        if !self.scale_factor.is_finite() || self.scale_factor < 1.0 {
            return Err(ExportError::InvalidRequest(format!(
                "scale factor must be a finite number >= 1, got {}",
                self.scale_factor
            )));
        }
        if !self.blur_radius_px.is_finite() || self.blur_radius_px < 0.0 {
            return Err(ExportError::InvalidRequest(format!(
                "blur radius must be a finite number >= 0, got {}",
                self.blur_radius_px
            )));
        }
        Ok(())
    }

    /// Blur radius at capture resolution.
    pub fn scaled_blur(&self) -> f64 {
        self.blur_radius_px * self.scale_factor
    }

    pub fn padding(&self) -> u32 {
        padding_for(self.blur_radius_px, self.scale_factor)
    }
}

/// `floor(size × scale_factor)` on both axes.
pub fn capture_dimensions((width, height): (u32, u32), scale_factor: f64) -> (u32, u32) {
    let scale = |v: u32| (f64::from(v) * scale_factor).floor() as u32;
    (scale(width), scale(height))
}

/// Padding needed around a capture so a Gaussian of the scaled blur radius
/// only ever samples replicated edge pixels: three standard deviations.
pub fn padding_for(blur_radius_px: f64, scale_factor: f64) -> u32 {
    (blur_radius_px * scale_factor * 3.0).ceil() as u32
}

/// Extends `capture` by `pad` pixels on every side, filling the margin with
/// the nearest edge or corner pixel.
pub fn clamp_to_edge(capture: &PixelBuffer, pad: u32) -> Result<PixelBuffer, ExportError> {
    let (w, h) = capture.dimensions();
    let margin = pad.saturating_mul(2);
    let mut padded = PixelBuffer::new(w.saturating_add(margin), h.saturating_add(margin))?;
    let (p, wi, hi) = (i64::from(pad), i64::from(w), i64::from(h));
    padded.draw_image(capture, p, p);
    if pad == 0 || w == 0 || h == 0 {
        return Ok(padded);
    }

    // Edge strips: one source row or column stretched across the margin.
    padded.draw_image_scaled(capture, (0, 0, 1, h), (0, p, pad, h));
    padded.draw_image_scaled(capture, (w - 1, 0, 1, h), (p + wi, p, pad, h));
    padded.draw_image_scaled(capture, (0, 0, w, 1), (p, 0, w, pad));
    padded.draw_image_scaled(capture, (0, h - 1, w, 1), (p, p + hi, w, pad));

    // Corners
    padded.draw_image_scaled(capture, (0, 0, 1, 1), (0, 0, pad, pad));
    padded.draw_image_scaled(capture, (w - 1, 0, 1, 1), (p + wi, 0, pad, pad));
    padded.draw_image_scaled(capture, (0, h - 1, 1, 1), (0, p + hi, pad, pad));
    padded.draw_image_scaled(capture, (w - 1, h - 1, 1, 1), (p + wi, p + hi, pad, pad));

    Ok(padded)
}

/// Blurs `capture` with standard deviation `sigma` without darkening its
/// borders, returning an image of the same size.
pub fn edge_safe_blur(capture: &PixelBuffer, sigma: f64) -> Result<PixelBuffer, ExportError> {
    let pad = (sigma * 3.0).ceil() as u32;
    let padded = clamp_to_edge(capture, pad)?;
    let p = i64::from(pad);
    // Drawing the padded buffer at (-pad, -pad) onto a capture-sized target
    // is the same as reading the blurred window starting at (pad, pad).
    blur::blur_region(&padded, sigma, (p, p), capture.dimensions())
}

/// Renders the surface at the requested resolution and returns the top-down
/// capture, blurred if the request asks for it.
///
/// The surface is restored to its original size and redrawn before this
/// returns, on success and on every failure after it was resized.
pub fn capture<S>(surface: &mut S, request: &CaptureRequest) -> Result<PixelBuffer, ExportError>
where
    S: RenderSurface + ?Sized,
{
    request.validate()?;
    if !surface.is_ready() {
        return Err(ExportError::SurfaceUnavailable);
    }
    let display = surface.size();
    let (width, height) = capture_dimensions(display, request.scale_factor);
    if width == 0 || height == 0 {
        log::warn!("surface has no area ({}x{})", display.0, display.1);
        return Err(ExportError::SurfaceUnavailable);
    }
    // Refuse before touching the live surface.
    pixels::check_dimensions(width, height)?;

    let time = surface.time();
    log::info!(
        "capturing {width}x{height} from {}x{} (x{}, blur {}px) at t={time:.3}",
        display.0,
        display.1,
        request.scale_factor,
        request.blur_radius_px
    );

    let captured = with_temporary_resolution(surface, width, height, |s| -> Result<_, ExportError> {
        s.draw(width, height, time)?;
        let raw = s.read_pixels()?;
        if raw.dimensions() != (width, height) {
            return Err(ExportError::Readback {
                expected: width as usize * height as usize * 4,
                actual: raw.as_raw().len(),
            });
        }
        raw.flipped_vertically()
    })?;

    if request.blur_radius_px > 0.0 {
        let sigma = request.scaled_blur();
        log::debug!("baking blur sigma={sigma:.2} pad={}", request.padding());
        edge_safe_blur(&captured, sigma)
    } else {
        Ok(captured)
    }
}

/// A PNG-encoded export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedImage {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl ExportedImage {
    pub fn encode(image: &PixelBuffer) -> Result<Self, ExportError> {
        Ok(Self {
            width: image.width(),
            height: image.height(),
            png: encode_png(image)?,
        })
    }

    /// `data:image/png;base64,…` form, ready for an `<a download>` link.
    pub fn to_data_uri(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }
}

pub fn encode_png(image: &PixelBuffer) -> Result<Vec<u8>, ExportError> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(out)
}

/// Captures and encodes in one step.
pub fn export_png<S>(surface: &mut S, request: &CaptureRequest) -> Result<ExportedImage, ExportError>
where
    S: RenderSurface + ?Sized,
{
    let image = capture(surface, request)?;
    let exported = ExportedImage::encode(&image)?;
    log::info!(
        "exported {}x{} PNG ({} bytes)",
        exported.width,
        exported.height,
        exported.png.len()
    );
    Ok(exported)
}

/// Export for callers that only distinguish success from failure: the error
/// is logged and `None` returned so the UI can show a generic notice.
pub fn export_data_uri<S>(surface: Option<&mut S>, request: &CaptureRequest) -> Option<String>
where
    S: RenderSurface + ?Sized,
{
    let Some(surface) = surface else {
        log::warn!("export requested before the render surface was created");
        return None;
    };
    match export_png(surface, request) {
        Ok(image) => Some(image.to_data_uri()),
        Err(e) => {
            log::error!("export failed: {e}");
            None
        }
    }
}
