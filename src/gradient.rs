//! The animated poster background.
//!
//! A domain-warped fractal value-noise field is mapped onto the five palette
//! stops, then film grain is added per pixel. [`shade`] is the CPU version
//! used by [`crate::surface::SoftwareSurface`]; [`FRAGMENT_SHADER`] is the
//! same function in GLSL ES 3.00 for the WebGL surface. Coordinates are
//! `gl_FragCoord`-style: pixel centres, origin at the bottom-left.

use crate::palette::{Palette, PALETTE_LEN};
use crate::settings::{PosterSettings, ShaderParams};

/// Full-screen triangle generated from `gl_VertexID`; no vertex buffers.
pub const VERTEX_SHADER: &str = r#"#version 300 es
const vec2 verts[3] = vec2[3](
    vec2(-1.0, -1.0),
    vec2(3.0, -1.0),
    vec2(-1.0, 3.0)
);

void main() {
    gl_Position = vec4(verts[gl_VertexID], 0.0, 1.0);
}
"#;

pub const FRAGMENT_SHADER: &str = r#"#version 300 es
precision highp float;

uniform vec2 u_resolution;
uniform float u_time;
uniform float u_scale;
uniform float u_grain;
uniform vec3 u_palette[5];

out vec4 frag_color;

float hash(vec2 p) {
    return fract(sin(dot(p, vec2(127.1, 311.7))) * 43758.5453);
}

float value_noise(vec2 p) {
    vec2 i = floor(p);
    vec2 f = fract(p);
    vec2 u = f * f * (3.0 - 2.0 * f);
    float a = hash(i);
    float b = hash(i + vec2(1.0, 0.0));
    float c = hash(i + vec2(0.0, 1.0));
    float d = hash(i + vec2(1.0, 1.0));
    return mix(mix(a, b, u.x), mix(c, d, u.x), u.y);
}

float fbm(vec2 p) {
    float sum = 0.0;
    float amp = 0.5;
    for (int i = 0; i < 4; i++) {
        sum += amp * value_noise(p);
        p = p * 2.03 + vec2(1.7, 9.2);
        amp *= 0.5;
    }
    return sum / 0.9375;
}

vec3 palette_at(float t) {
    float x = clamp(t, 0.0, 1.0) * 4.0;
    int i = int(min(floor(x), 3.0));
    float f = x - float(i);
    f = f * f * (3.0 - 2.0 * f);
    return mix(u_palette[i], u_palette[i + 1], f);
}

void main() {
    float m = min(u_resolution.x, u_resolution.y);
    vec2 p = gl_FragCoord.xy / m * u_scale;
    float t = u_time;

    vec2 q = vec2(fbm(p + vec2(0.30 * t, -0.20 * t)),
                  fbm(p + vec2(5.2 - 0.25 * t, 1.3 + 0.15 * t)));
    float n = fbm(p + 1.7 * q + vec2(9.2, 2.8 + 0.1 * t));

    vec3 color = palette_at(n);
    color += (hash(gl_FragCoord.xy + vec2(t * 13.0)) - 0.5) * u_grain;
    frag_color = vec4(clamp(color, 0.0, 1.0), 1.0);
}
"#;

/// Uniform values for one frame, minus resolution and time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientProgram {
    pub palette: [[f32; 3]; PALETTE_LEN],
    pub scale: f32,
    pub grain: f32,
}

impl GradientProgram {
    pub fn new(palette: &Palette, params: &ShaderParams) -> Self {
        let mut colors = [[0.0; 3]; PALETTE_LEN];
        for (slot, color) in colors.iter_mut().zip(palette.0.iter()) {
            *slot = color.to_unit();
        }
        Self {
            palette: colors,
            scale: params.scale,
            grain: params.grain,
        }
    }
}

impl From<&PosterSettings> for GradientProgram {
    fn from(settings: &PosterSettings) -> Self {
        Self::new(&settings.palette, &settings.shader)
    }
}

fn fract(x: f32) -> f32 {
    x - x.floor()
}

fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn hash(x: f32, y: f32) -> f32 {
    fract((x * 127.1 + y * 311.7).sin() * 43_758.547)
}

fn value_noise(x: f32, y: f32) -> f32 {
    let (ix, iy) = (x.floor(), y.floor());
    let (fx, fy) = (x - ix, y - iy);
    let ux = fx * fx * (3.0 - 2.0 * fx);
    let uy = fy * fy * (3.0 - 2.0 * fy);
    let a = hash(ix, iy);
    let b = hash(ix + 1.0, iy);
    let c = hash(ix, iy + 1.0);
    let d = hash(ix + 1.0, iy + 1.0);
    mix(mix(a, b, ux), mix(c, d, ux), uy)
}

fn fbm(mut x: f32, mut y: f32) -> f32 {
    let mut sum = 0.0;
    let mut amp = 0.5;
    for _ in 0..4 {
        sum += amp * value_noise(x, y);
        x = x * 2.03 + 1.7;
        y = y * 2.03 + 9.2;
        amp *= 0.5;
    }
    // 0.5 + 0.25 + 0.125 + 0.0625
    sum / 0.9375
}

fn palette_at(palette: &[[f32; 3]; PALETTE_LEN], t: f32) -> [f32; 3] {
    let x = t.clamp(0.0, 1.0) * 4.0;
    let i = x.floor().min(3.0) as usize;
    let f = x - i as f32;
    let f = f * f * (3.0 - 2.0 * f);
    let (a, b) = (palette[i], palette[i + 1]);
    [mix(a[0], b[0], f), mix(a[1], b[1], f), mix(a[2], b[2], f)]
}

/// Color of the fragment at `(frag_x, frag_y)` for a `width × height`
/// target at animation time `time`.
pub fn shade(
    program: &GradientProgram,
    (frag_x, frag_y): (f32, f32),
    (width, height): (f32, f32),
    time: f32,
) -> [u8; 4] {
    let m = width.min(height);
    let px = frag_x / m * program.scale;
    let py = frag_y / m * program.scale;
    let t = time;

    let qx = fbm(px + 0.30 * t, py - 0.20 * t);
    let qy = fbm(px + 5.2 - 0.25 * t, py + 1.3 + 0.15 * t);
    let n = fbm(px + 1.7 * qx + 9.2, py + 1.7 * qy + 2.8 + 0.1 * t);

    let mut color = palette_at(&program.palette, n);
    if program.grain > 0.0 {
        let g = (hash(frag_x + t * 13.0, frag_y + t * 13.0) - 0.5) * program.grain;
        for c in &mut color {
            *c += g;
        }
    }
    let to_byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    [to_byte(color[0]), to_byte(color[1]), to_byte(color[2]), 255]
}
