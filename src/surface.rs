//! The live render surface and scoped access to it at another resolution.

use std::ops::{Deref, DerefMut};

use crate::error::ExportError;
use crate::gradient::{self, GradientProgram};
use crate::pixels::PixelBuffer;

/// A drawable the live animation renders into.
///
/// `size` is the backing size in device pixels (display size times device
/// pixel ratio). `read_pixels` returns RGBA8 rows with the origin at the
/// bottom-left, the way GL reads its framebuffer.
pub trait RenderSurface {
    /// Whether the backing element and draw program exist.
    fn is_ready(&self) -> bool;

    fn size(&self) -> (u32, u32);

    /// Resizes the backing store. Contents are undefined until the next draw.
    fn resize(&mut self, width: u32, height: u32);

    /// Runs the live draw routine for a `width × height` target at `time`.
    fn draw(&mut self, width: u32, height: u32, time: f32) -> Result<(), ExportError>;

    fn read_pixels(&mut self) -> Result<PixelBuffer, ExportError>;

    /// Current animation time.
    fn time(&self) -> f32;
}

/// Holds a surface at a temporary resolution and puts it back on drop.
///
/// Restoring resizes to the original size and redraws at the animation time
/// captured on entry, so the live view never shows the temporary frame.
pub struct TemporaryResolution<'a, S: RenderSurface + ?Sized> {
    surface: &'a mut S,
    original: (u32, u32),
    time: f32,
}

impl<'a, S: RenderSurface + ?Sized> TemporaryResolution<'a, S> {
    pub fn new(surface: &'a mut S, width: u32, height: u32) -> Self {
        let original = surface.size();
        let time = surface.time();
        log::debug!(
            "resizing surface {}x{} -> {width}x{height}",
            original.0,
            original.1
        );
        surface.resize(width, height);
        Self {
            surface,
            original,
            time,
        }
    }
}

impl<S: RenderSurface + ?Sized> Deref for TemporaryResolution<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.surface
    }
}

impl<S: RenderSurface + ?Sized> DerefMut for TemporaryResolution<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.surface
    }
}

impl<S: RenderSurface + ?Sized> Drop for TemporaryResolution<'_, S> {
    fn drop(&mut self) {
        let (w, h) = self.original;
        self.surface.resize(w, h);
        if let Err(e) = self.surface.draw(w, h, self.time) {
            log::warn!("failed to redraw live surface after restore: {e}");
        }
    }
}

/// Runs `f` with `surface` resized to `width × height`, restoring the
/// original size and redrawing before returning, whatever `f` returns.
pub fn with_temporary_resolution<S, R>(
    surface: &mut S,
    width: u32,
    height: u32,
    f: impl FnOnce(&mut S) -> R,
) -> R
where
    S: RenderSurface + ?Sized,
{
    let mut scoped = TemporaryResolution::new(surface, width, height);
    f(&mut *scoped)
}

/// CPU implementation of the live surface, rendering the same gradient the
/// fragment shader does. Used by the host tools and tests.
#[derive(Debug, Clone)]
pub struct SoftwareSurface {
    width: u32,
    height: u32,
    time: f32,
    program: Option<GradientProgram>,
    // Bottom row first, like a GL framebuffer.
    frame: Vec<u8>,
}

impl SoftwareSurface {
    /// A surface with no program loaded; it reports not ready until
    /// [`SoftwareSurface::load_program`] is called.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            time: 0.0,
            program: None,
            frame: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn with_program(width: u32, height: u32, program: GradientProgram) -> Self {
        let mut surface = Self::new(width, height);
        surface.load_program(program);
        surface
    }

    pub fn load_program(&mut self, program: GradientProgram) {
        self.program = Some(program);
    }

    pub fn set_time(&mut self, time: f32) {
        self.time = time;
    }
}

impl RenderSurface for SoftwareSurface {
    fn is_ready(&self) -> bool {
        self.program.is_some()
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.frame = vec![0; width as usize * height as usize * 4];
    }

    fn draw(&mut self, width: u32, height: u32, time: f32) -> Result<(), ExportError> {
        let program = self.program.ok_or(ExportError::SurfaceUnavailable)?;
        if self.width == 0 || self.height == 0 {
            return Ok(());
        }
        let res = (width as f32, height as f32);
        let stride = self.width as usize * 4;
        for (row, line) in self.frame.chunks_exact_mut(stride).enumerate() {
            let fy = row as f32 + 0.5;
            for (col, px) in line.chunks_exact_mut(4).enumerate() {
                let fx = col as f32 + 0.5;
                px.copy_from_slice(&gradient::shade(&program, (fx, fy), res, time));
            }
        }
        Ok(())
    }

    fn read_pixels(&mut self) -> Result<PixelBuffer, ExportError> {
        PixelBuffer::from_raw(self.width, self.height, self.frame.clone())
    }

    fn time(&self) -> f32 {
        self.time
    }
}
