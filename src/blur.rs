//! Separable Gaussian blur over RGBA8 buffers, approximated by successive
//! box blurs.
//!
//! Blurring happens in premultiplied alpha, and samples that fall outside
//! the source count as transparent black, the way a canvas `blur()` filter
//! treats them. That is what darkens unpadded edges; the compositor pads
//! with replicated edge pixels before calling in here.

use crate::error::ExportError;
use crate::pixels::PixelBuffer;

/// Number of box passes per axis. Three boxes are within a few percent
/// of a true Gaussian.
pub const PASSES: usize = 3;

/// Radii of [`PASSES`] successive box blurs whose combined variance
/// approximates a Gaussian of standard deviation `sigma`.
///
/// The radii sum to at most `ceil(3σ)`, the same reach the compositor pads
/// for, so the blur never samples past a padded margin.
pub fn box_radii(sigma: f64) -> [usize; PASSES] {
    if sigma.is_nan() || sigma <= 0.0 {
        return [0; PASSES];
    }
    let n = PASSES as f64;
    let variance = sigma * sigma;
    let ideal = (12.0 * variance / n + 1.0).sqrt();
    let mut lower = ideal.floor() as usize;
    if lower % 2 == 0 {
        lower = lower.saturating_sub(1);
    }
    let lower = lower.max(1);
    let upper = lower + 2;

    // How many passes use the narrower box.
    let wl = lower as f64;
    let narrow = ((12.0 * variance - n * wl * wl - 4.0 * n * wl - 3.0 * n) / (-4.0 * wl - 4.0))
        .round()
        .clamp(0.0, n) as usize;

    let mut radii = [0; PASSES];
    for (i, radius) in radii.iter_mut().enumerate() {
        let width = if i < narrow { lower } else { upper };
        *radius = (width - 1) / 2;
    }
    let reach = (sigma * 3.0).ceil() as usize;
    while radii.iter().sum::<usize>() > reach {
        if let Some(widest) = radii.iter_mut().max() {
            *widest -= 1;
        }
    }
    radii
}

fn premultiplied(src: &PixelBuffer) -> Vec<[f32; 4]> {
    src.as_raw()
        .chunks_exact(4)
        .map(|px| {
            let a = f32::from(px[3]) / 255.0;
            [
                f32::from(px[0]) * a,
                f32::from(px[1]) * a,
                f32::from(px[2]) * a,
                f32::from(px[3]),
            ]
        })
        .collect()
}

fn unpremultiply(px: [f32; 4]) -> [u8; 4] {
    let a = px[3].clamp(0.0, 255.0);
    if a <= 0.0 {
        return [0, 0, 0, 0];
    }
    let scale = 255.0 / a;
    let channel = |c: f32| (c * scale).round().clamp(0.0, 255.0) as u8;
    [channel(px[0]), channel(px[1]), channel(px[2]), a.round() as u8]
}

/// Elements of one pass: `count` lines of `len` samples, line `l` starting
/// at `l * stride` with samples `step` apart.
#[derive(Clone, Copy)]
struct Lines {
    count: usize,
    len: usize,
    stride: usize,
    step: usize,
}

/// One box blur along every line, with a running sum so the cost per sample
/// does not depend on the radius. Samples past either end of a line are
/// transparent.
fn box_pass(src: &[[f32; 4]], dst: &mut [[f32; 4]], lines: Lines, radius: usize) {
    if lines.len == 0 {
        return;
    }
    let scale = 1.0 / (2 * radius + 1) as f64;
    for line in 0..lines.count {
        let at = |i: usize| line * lines.stride + i * lines.step;
        let mut acc = [0.0f64; 4];
        for i in 0..=radius.min(lines.len - 1) {
            for (a, v) in acc.iter_mut().zip(src[at(i)]) {
                *a += f64::from(v);
            }
        }
        for i in 0..lines.len {
            let out = &mut dst[at(i)];
            for (o, a) in out.iter_mut().zip(acc) {
                *o = (a * scale) as f32;
            }
            if i + radius + 1 < lines.len {
                for (a, v) in acc.iter_mut().zip(src[at(i + radius + 1)]) {
                    *a += f64::from(v);
                }
            }
            if i >= radius {
                for (a, v) in acc.iter_mut().zip(src[at(i - radius)]) {
                    *a -= f64::from(v);
                }
            }
        }
    }
}

/// Blurs `src` with standard deviation `sigma` and returns the
/// `width × height` window whose top-left corner sits at `(left, top)` in
/// source coordinates.
///
/// The Gaussian is approximated by [`PASSES`] box blurs per axis, so the
/// cost is proportional to the window area plus its margin and independent
/// of `sigma`. Only the window grown by the total box reach is computed.
pub fn blur_region(
    src: &PixelBuffer,
    sigma: f64,
    (left, top): (i64, i64),
    (width, height): (u32, u32),
) -> Result<PixelBuffer, ExportError> {
    let mut out = PixelBuffer::new(width, height)?;
    if width == 0 || height == 0 {
        return Ok(out);
    }
    let radii = box_radii(sigma);
    let reach: usize = radii.iter().sum();
    let margin = reach as i64;

    // The window plus the reach on every side; samples outside the source
    // stay transparent.
    let cols = width as usize + 2 * reach;
    let rows = height as usize + 2 * reach;
    let (src_w, src_h) = (i64::from(src.width()), i64::from(src.height()));
    let source = premultiplied(src);
    let mut grid = vec![[0.0f32; 4]; cols * rows];
    for (r, line) in grid.chunks_exact_mut(cols).enumerate() {
        let y = top - margin + r as i64;
        if y < 0 || y >= src_h {
            continue;
        }
        for (c, px) in line.iter_mut().enumerate() {
            let x = left - margin + c as i64;
            if x >= 0 && x < src_w {
                *px = source[(y * src_w + x) as usize];
            }
        }
    }

    let horizontal = Lines {
        count: rows,
        len: cols,
        stride: cols,
        step: 1,
    };
    let vertical = Lines {
        count: cols,
        len: rows,
        stride: 1,
        step: cols,
    };
    let mut scratch = vec![[0.0f32; 4]; cols * rows];
    for lines in [horizontal, vertical] {
        for &radius in &radii {
            if radius == 0 {
                continue;
            }
            box_pass(&grid, &mut scratch, lines, radius);
            std::mem::swap(&mut grid, &mut scratch);
        }
    }

    for oy in 0..height {
        let base = (oy as usize + reach) * cols + reach;
        for ox in 0..width {
            out.put_pixel(ox, oy, unpremultiply(grid[base + ox as usize]));
        }
    }
    Ok(out)
}

/// Blurs the whole buffer within its own bounds, with no edge padding.
pub fn blur(src: &PixelBuffer, sigma: f64) -> Result<PixelBuffer, ExportError> {
    blur_region(src, sigma, (0, 0), src.dimensions())
}
