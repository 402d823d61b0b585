//! Poster colors and the five-stop palette the gradient blends through.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Number of colors in a poster palette.
pub const PALETTE_LEN: usize = 5;

/// An sRGB color, written as `#rrggbb` in settings files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels normalized to `0.0..=1.0`, the form the shader uniforms take.
    pub fn to_unit(self) -> [f32; 3] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        ]
    }
}

impl FromStr for Rgb {
    type Err = SettingsError;

    /// Accepts `#rrggbb` and the `#rgb` shorthand, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || SettingsError::Color(s.to_owned());
        let hex = s.trim().strip_prefix('#').ok_or_else(bad)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(bad());
        }
        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| bad());
        match hex.len() {
            6 => Ok(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let r = channel(&hex[0..1])?;
                let g = channel(&hex[1..2])?;
                let b = channel(&hex[2..3])?;
                Ok(Self::new(r * 17, g * 17, b * 17))
            }
            _ => Err(bad()),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Rgb {
    type Error = SettingsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

/// The five gradient stops, darkest-to-brightest by convention but used in
/// whatever order the user picks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Palette(pub [Rgb; PALETTE_LEN]);

impl Default for Palette {
    fn default() -> Self {
        Palette([
            Rgb::new(0x0f, 0x0c, 0x29),
            Rgb::new(0x30, 0x2b, 0x63),
            Rgb::new(0x6a, 0x3d, 0x9a),
            Rgb::new(0xff, 0x6a, 0x88),
            Rgb::new(0xff, 0xd1, 0x94),
        ])
    }
}

impl Palette {
    /// Builds a palette from exactly five color strings.
    pub fn from_hex<S: AsRef<str>>(colors: &[S]) -> Result<Self, SettingsError> {
        if colors.len() != PALETTE_LEN {
            return Err(SettingsError::PaletteLength(colors.len()));
        }
        let mut out = [Rgb::new(0, 0, 0); PALETTE_LEN];
        for (slot, hex) in out.iter_mut().zip(colors) {
            *slot = hex.as_ref().parse()?;
        }
        Ok(Palette(out))
    }
}
