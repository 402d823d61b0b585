#![cfg(not(target_arch = "wasm32"))]

use poster_wasm::blur;
use poster_wasm::export::{
    self, capture, capture_dimensions, clamp_to_edge, export_data_uri, export_png, padding_for,
    CaptureRequest,
};
use poster_wasm::gradient::GradientProgram;
use poster_wasm::{ExportError, PixelBuffer, PosterSettings, RenderSurface, SoftwareSurface};

/// Surface whose readback encodes each pixel's row (bottom row first) and
/// column, and which records every call made to it.
struct RowSurface {
    size: (u32, u32),
    time: f32,
    ready: bool,
    fill: Option<[u8; 4]>,
    fail_draw_at: Option<(u32, u32)>,
    short_readback: bool,
    resizes: Vec<(u32, u32)>,
    draws: Vec<(u32, u32, f32)>,
}

impl RowSurface {
    fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            time: 2.5,
            ready: true,
            fill: None,
            fail_draw_at: None,
            short_readback: false,
            resizes: Vec::new(),
            draws: Vec::new(),
        }
    }

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self {
            fill: Some(rgba),
            ..Self::new(width, height)
        }
    }

    fn readback_pixel(&self, col: u32, row: u32) -> [u8; 4] {
        self.fill
            .unwrap_or([row as u8, (row >> 8) as u8, col as u8, 255])
    }
}

impl RenderSurface for RowSurface {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.resizes.push((width, height));
        self.size = (width, height);
    }

    fn draw(&mut self, width: u32, height: u32, time: f32) -> Result<(), ExportError> {
        self.draws.push((width, height, time));
        if self.fail_draw_at == Some((width, height)) {
            return Err(ExportError::Render("lost".to_owned()));
        }
        Ok(())
    }

    fn read_pixels(&mut self) -> Result<PixelBuffer, ExportError> {
        let (w, h) = self.size;
        if self.short_readback {
            return PixelBuffer::from_raw(w, h, vec![0; 4]);
        }
        let mut buf = PixelBuffer::new(w, h)?;
        for row in 0..h {
            for col in 0..w {
                buf.put_pixel(col, row, self.readback_pixel(col, row));
            }
        }
        Ok(buf)
    }

    fn time(&self) -> f32 {
        self.time
    }
}

#[test]
fn output_dimensions_follow_floor_of_scaled_size() {
    for &(w, h) in &[(300u32, 400u32), (101, 57), (1, 1)] {
        for &scale in &[1.0, 1.5, 2.0, 2.5, 3.0] {
            let mut surface = RowSurface::new(w, h);
            let out = capture(&mut surface, &CaptureRequest::new(scale, 0.0)).unwrap();
            let expected = (
                (f64::from(w) * scale).floor() as u32,
                (f64::from(h) * scale).floor() as u32,
            );
            assert_eq!(out.dimensions(), expected, "{w}x{h} at x{scale}");
            assert_eq!(capture_dimensions((w, h), scale), expected);
        }
    }
}

#[test]
fn blur_does_not_change_output_dimensions() {
    let mut surface = RowSurface::new(31, 17);
    let plain = capture(&mut surface, &CaptureRequest::new(1.5, 0.0)).unwrap();
    let blurred = capture(&mut surface, &CaptureRequest::new(1.5, 2.0)).unwrap();
    assert_eq!(plain.dimensions(), (46, 25));
    assert_eq!(blurred.dimensions(), plain.dimensions());
}

#[test_log::test]
fn surface_is_restored_and_redrawn_after_success() {
    let mut surface = RowSurface::new(30, 40);
    capture(&mut surface, &CaptureRequest::default()).unwrap();

    assert_eq!(surface.size(), (30, 40));
    assert_eq!(surface.resizes, vec![(60, 80), (30, 40)]);
    assert_eq!(surface.draws, vec![(60, 80, 2.5), (30, 40, 2.5)]);
}

#[test_log::test]
fn surface_is_restored_when_draw_fails() {
    let mut surface = RowSurface::new(30, 40);
    surface.fail_draw_at = Some((60, 80));
    let err = capture(&mut surface, &CaptureRequest::default()).unwrap_err();

    assert!(matches!(err, ExportError::Render(_)));
    assert_eq!(surface.size(), (30, 40));
    assert_eq!(surface.draws.last(), Some(&(30, 40, 2.5)));
}

#[test]
fn surface_is_restored_when_readback_is_short() {
    let mut surface = RowSurface::new(8, 8);
    surface.short_readback = true;
    let err = capture(&mut surface, &CaptureRequest::default()).unwrap_err();

    assert!(matches!(err, ExportError::Readback { expected: 1024, actual: 4 }));
    assert_eq!(surface.size(), (8, 8));
}

#[test]
fn surface_is_restored_when_padded_buffer_cannot_be_allocated() {
    let mut surface = RowSurface::new(10, 10);
    // pad = 18000, so the padded side exceeds the drawing surface limit.
    let err = capture(&mut surface, &CaptureRequest::new(1.0, 6000.0)).unwrap_err();

    assert!(matches!(err, ExportError::ContextUnavailable { .. }));
    assert_eq!(surface.size(), (10, 10));
    assert_eq!(surface.draws.last(), Some(&(10, 10, 2.5)));
}

#[test]
fn oversized_target_is_refused_before_touching_the_surface() {
    let mut surface = RowSurface::new(20_000, 10);
    let err = capture(&mut surface, &CaptureRequest::new(2.0, 0.0)).unwrap_err();

    assert!(matches!(
        err,
        ExportError::ContextUnavailable {
            width: 40_000,
            height: 20
        }
    ));
    assert!(surface.resizes.is_empty());
    assert!(surface.draws.is_empty());
}

#[test]
fn invalid_requests_are_rejected_without_mutation() {
    for request in [
        CaptureRequest::new(0.5, 0.0),
        CaptureRequest::new(f64::NAN, 0.0),
        CaptureRequest::new(f64::INFINITY, 0.0),
        CaptureRequest::new(2.0, -1.0),
        CaptureRequest::new(2.0, f64::NAN),
    ] {
        let mut surface = RowSurface::new(10, 10);
        let err = capture(&mut surface, &request).unwrap_err();
        assert!(matches!(err, ExportError::InvalidRequest(_)), "{request:?}");
        assert!(surface.resizes.is_empty());
    }
}

#[test]
fn unblurred_output_is_the_flipped_readback() {
    let mut surface = RowSurface::new(12, 7);
    let out = capture(&mut surface, &CaptureRequest::new(1.0, 0.0)).unwrap();

    let direct = RowSurface::new(12, 7).read_pixels().unwrap();
    assert_eq!(out, direct.flipped_vertically().unwrap());
}

#[test]
fn rows_are_flipped_top_to_bottom() {
    let (w, h) = (5u32, 9u32);
    let mut surface = RowSurface::new(w, h);
    let out = capture(&mut surface, &CaptureRequest::new(1.0, 0.0)).unwrap();

    for i in [0, h / 2, h - 1] {
        let source_row = h - 1 - i;
        for x in 0..w {
            assert_eq!(out.pixel(x, i), [source_row as u8, 0, x as u8, 255]);
        }
    }
    // The top readback scanline (last row read) becomes the first output row.
    assert_eq!(out.pixel(0, 0)[0], (h - 1) as u8);
    assert_eq!(out.pixel(0, h - 1)[0], 0);
}

#[test]
fn padding_scales_with_effective_blur() {
    let cases = [
        (0.0, 1.0, 0),
        (0.0, 2.0, 0),
        (0.0, 4.0, 0),
        (1.0, 1.0, 3),
        (1.0, 2.0, 6),
        (1.0, 4.0, 12),
        (40.0, 1.0, 120),
        (40.0, 2.0, 240),
        (40.0, 4.0, 480),
        (100.0, 1.0, 300),
        (100.0, 2.0, 600),
        (100.0, 4.0, 1200),
    ];
    for (blur, scale, pad) in cases {
        assert_eq!(padding_for(blur, scale), pad, "blur {blur} scale {scale}");
        let request = CaptureRequest::new(scale, blur);
        assert_eq!(request.padding(), pad);
        assert_eq!(
            request.padding(),
            (blur * scale * 3.0_f64).ceil() as u32
        );
    }
    assert_eq!(padding_for(0.5, 1.5), 3);
    assert_eq!(padding_for(0.3, 1.0), 1);
}

#[test]
fn clamp_to_edge_replicates_edges_and_corners() {
    // 3x2 capture with a distinct value per pixel.
    let mut src = PixelBuffer::new(3, 2).unwrap();
    for y in 0..2 {
        for x in 0..3 {
            src.put_pixel(x, y, [(y * 3 + x) as u8 * 10, 0, 0, 255]);
        }
    }
    let pad = 2;
    let padded = clamp_to_edge(&src, pad).unwrap();
    assert_eq!(padded.dimensions(), (7, 6));

    let value = |x, y| padded.pixel(x, y)[0];
    // Interior is the capture itself.
    for y in 0..2 {
        for x in 0..3 {
            assert_eq!(value(x + pad, y + pad), src.pixel(x, y)[0]);
        }
    }
    // Corner squares.
    for (cx, cy, expected) in [(0, 0, 0), (5, 0, 20), (0, 4, 30), (5, 4, 50)] {
        for dy in 0..pad {
            for dx in 0..pad {
                assert_eq!(value(cx + dx, cy + dy), expected);
            }
        }
    }
    // Top and bottom strips repeat the first and last rows.
    for x in 0..3 {
        for y in 0..pad {
            assert_eq!(value(x + pad, y), src.pixel(x, 0)[0]);
            assert_eq!(value(x + pad, y + pad + 2), src.pixel(x, 1)[0]);
        }
    }
    // Left and right strips repeat the first and last columns.
    for y in 0..2 {
        for x in 0..pad {
            assert_eq!(value(x, y + pad), src.pixel(0, y)[0]);
            assert_eq!(value(x + pad + 3, y + pad), src.pixel(2, y)[0]);
        }
    }
}

#[test]
fn solid_capture_blurs_without_edge_vignette() {
    let color = [200, 100, 50, 255];
    let mut surface = RowSurface::solid(20, 12, color);
    let out = capture(&mut surface, &CaptureRequest::new(2.0, 3.0)).unwrap();

    assert_eq!(out.dimensions(), (40, 24));
    for y in 0..24 {
        for x in 0..40 {
            assert_eq!(out.pixel(x, y), color, "pixel ({x}, {y})");
        }
    }

    // Without padding the same blur pulls in transparent black at the edges.
    let flat = PixelBuffer::filled(40, 24, color).unwrap();
    let naive = blur::blur(&flat, 6.0).unwrap();
    assert!(naive.pixel(0, 0)[3] < 255);
    assert!(naive.pixel(39, 23)[3] < 255);
    assert!(naive.pixel(20, 0)[3] < 255);
}

#[test]
fn blurred_borders_match_a_clamp_extended_blur() {
    let mut surface = RowSurface::new(16, 10);
    let request = CaptureRequest::new(1.0, 1.5);
    let out = capture(&mut surface, &request).unwrap();

    let flipped = RowSurface::new(16, 10)
        .read_pixels()
        .unwrap()
        .flipped_vertically()
        .unwrap();
    let pad = request.padding();
    let reference = blur::blur_region(
        &clamp_to_edge(&flipped, pad).unwrap(),
        request.scaled_blur(),
        (i64::from(pad), i64::from(pad)),
        (16, 10),
    )
    .unwrap();

    assert_eq!(out, reference);
    for (x, y) in [(0, 0), (15, 0), (0, 9), (15, 9), (8, 0), (0, 5)] {
        assert_eq!(out.pixel(x, y)[3], 255, "alpha at ({x}, {y})");
    }
}

#[test]
fn end_to_end_export_matches_direct_readback() {
    let settings = PosterSettings::default();
    let program = GradientProgram::from(&settings);
    let mut live = SoftwareSurface::with_program(300, 400, program);
    live.set_time(1.25);

    let image = export_png(&mut live, &CaptureRequest::new(2.0, 0.0)).unwrap();
    assert_eq!((image.width, image.height), (600, 800));
    assert_eq!(live.size(), (300, 400));

    let decoded = image::load_from_memory(&image.png).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (600, 800));

    let mut direct = SoftwareSurface::with_program(600, 800, program);
    direct.draw(600, 800, 1.25).unwrap();
    let expected = direct.read_pixels().unwrap().flipped_vertically().unwrap();
    assert_eq!(decoded.into_raw(), expected.as_raw());
}

#[test]
fn uninitialized_surface_yields_no_image() {
    let mut surface = SoftwareSurface::new(300, 400);
    let err = capture(&mut surface, &CaptureRequest::default()).unwrap_err();
    assert!(matches!(err, ExportError::SurfaceUnavailable));
    assert_eq!(surface.size(), (300, 400));

    assert_eq!(
        export_data_uri(Some(&mut surface), &CaptureRequest::default()),
        None
    );
    assert_eq!(
        export_data_uri(None::<&mut SoftwareSurface>, &CaptureRequest::default()),
        None
    );
}

#[test]
fn not_ready_surface_is_left_untouched() {
    let mut surface = RowSurface::new(30, 40);
    surface.ready = false;
    assert!(capture(&mut surface, &CaptureRequest::default()).is_err());
    assert!(surface.resizes.is_empty());
    assert!(surface.draws.is_empty());
}

#[test]
fn zero_sized_surface_is_unavailable() {
    let mut surface = RowSurface::new(0, 40);
    let err = capture(&mut surface, &CaptureRequest::default()).unwrap_err();
    assert!(matches!(err, ExportError::SurfaceUnavailable));
    assert!(surface.resizes.is_empty());
}

#[test]
fn data_uri_wraps_png_bytes() {
    let mut surface = RowSurface::solid(4, 3, [1, 2, 3, 255]);
    let uri = export_data_uri(Some(&mut surface), &CaptureRequest::new(1.0, 0.0)).unwrap();
    assert!(uri.starts_with("data:image/png;base64,iVBORw0KGgo"));

    let image = export::ExportedImage::encode(&PixelBuffer::filled(4, 3, [1, 2, 3, 255]).unwrap())
        .unwrap();
    assert_eq!(image.to_data_uri(), uri);
}
