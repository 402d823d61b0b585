//! Owned RGBA8 pixel grids used as scratch surfaces by the compositor.
//!
//! A `PixelBuffer` stands in for an offscreen 2D canvas: allocation is
//! refused past the same limits browsers put on canvas backing stores, and
//! every copy is nearest-neighbor so stretched edge strips never pick up a
//! gradient from their neighbours.

use crate::error::ExportError;

/// Largest width or height a drawing surface may have.
pub const MAX_DIMENSION: u32 = 32_767;
/// Largest pixel count a drawing surface may have.
pub const MAX_AREA: u64 = 268_435_456;

const BYTES_PER_PIXEL: usize = 4;

#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Returns an error if a `width × height` surface could not be allocated.
pub fn check_dimensions(width: u32, height: u32) -> Result<(), ExportError> {
    let area = u64::from(width) * u64::from(height);
    if width > MAX_DIMENSION || height > MAX_DIMENSION || area > MAX_AREA {
        return Err(ExportError::ContextUnavailable { width, height });
    }
    Ok(())
}

impl PixelBuffer {
    /// Allocates a transparent black buffer.
    pub fn new(width: u32, height: u32) -> Result<Self, ExportError> {
        check_dimensions(width, height)?;
        let len = width as usize * height as usize * BYTES_PER_PIXEL;
        Ok(Self {
            width,
            height,
            data: vec![0; len],
        })
    }

    /// Wraps raw RGBA8 samples, checking the length against the dimensions.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, ExportError> {
        check_dimensions(width, height)?;
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if data.len() != expected {
            return Err(ExportError::Readback {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Allocates a buffer with every pixel set to `rgba`.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, ExportError> {
        let mut buf = Self::new(width, height)?;
        for px in buf.data.chunks_exact_mut(BYTES_PER_PIXEL) {
            px.copy_from_slice(&rgba);
        }
        Ok(buf)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.stride() + x as usize * BYTES_PER_PIXEL
    }

    /// Pixel at `(x, y)`. Panics when out of bounds, like slice indexing.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        let i = self.offset(x, y);
        self.data[i..i + BYTES_PER_PIXEL].copy_from_slice(&rgba);
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride();
        &self.data[start..start + self.stride()]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let stride = self.stride();
        let start = y as usize * stride;
        &mut self.data[start..start + stride]
    }

    /// Returns a copy with the row order reversed.
    ///
    /// GL readback is bottom-up while images are top-down, so row `i` of the
    /// source lands on row `height - i - 1`, one scanline copy at a time.
    pub fn flipped_vertically(&self) -> Result<Self, ExportError> {
        let mut out = Self::new(self.width, self.height)?;
        for y in 0..self.height {
            out.row_mut(self.height - y - 1).copy_from_slice(self.row(y));
        }
        Ok(out)
    }

    /// Copies all of `src` with its top-left corner at `(dx, dy)`, clipping
    /// whatever falls outside this buffer.
    pub fn draw_image(&mut self, src: &PixelBuffer, dx: i64, dy: i64) {
        let x0 = dx.max(0);
        let y0 = dy.max(0);
        let x1 = (dx + i64::from(src.width)).min(i64::from(self.width));
        let y1 = (dy + i64::from(src.height)).min(i64::from(self.height));
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        let span = (x1 - x0) as usize * BYTES_PER_PIXEL;
        for y in y0..y1 {
            let s = src.offset((x0 - dx) as u32, (y - dy) as u32);
            let d = self.offset(x0 as u32, y as u32);
            self.data[d..d + span].copy_from_slice(&src.data[s..s + span]);
        }
    }

    /// Stretches the `sw × sh` source rectangle at `(sx, sy)` onto the
    /// `dw × dh` destination rectangle at `(dx, dy)` with nearest-neighbor
    /// sampling. Destination pixels outside this buffer are skipped.
    pub fn draw_image_scaled(
        &mut self,
        src: &PixelBuffer,
        (sx, sy, sw, sh): (u32, u32, u32, u32),
        (dx, dy, dw, dh): (i64, i64, u32, u32),
    ) {
        if sw == 0 || sh == 0 || dw == 0 || dh == 0 {
            return;
        }
        debug_assert!(sx + sw <= src.width && sy + sh <= src.height);
        for j in 0..dh {
            let ty = dy + i64::from(j);
            if ty < 0 || ty >= i64::from(self.height) {
                continue;
            }
            // Sample at the centre of each destination pixel.
            let src_y = sy + ((2 * u64::from(j) + 1) * u64::from(sh) / (2 * u64::from(dh))) as u32;
            for i in 0..dw {
                let tx = dx + i64::from(i);
                if tx < 0 || tx >= i64::from(self.width) {
                    continue;
                }
                let src_x =
                    sx + ((2 * u64::from(i) + 1) * u64::from(sw) / (2 * u64::from(dw))) as u32;
                let px = src.pixel(src_x, src_y);
                self.put_pixel(tx as u32, ty as u32, px);
            }
        }
    }
}
