// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Color palettes.  A palette is a lookup table with one entry per
//! iteration count; a point that never escaped is looked up past the
//! end of the table and gets the set color instead.

use image::Rgb;

use crate::error::{FractalError, Result};

/// An opaque 8-bit RGB color.
pub type Color = Rgb<u8>;

/// Black, the color of the set in the built-in palettes.
pub const BLACK: Color = Rgb([0, 0, 0]);

/// White.
pub const WHITE: Color = Rgb([255, 255, 255]);

const RED: Color = Rgb([255, 0, 0]);

/// Control colors of the built-in gradient.
pub const DEFAULT_COLORS: [Color; 7] = [
    Rgb([40, 0, 0]),
    RED,
    WHITE,
    RED,
    Rgb([100, 0, 0]),
    RED,
    Rgb([50, 0, 0]),
];

/// Stops of the built-in gradient, one per entry of [`DEFAULT_COLORS`].
pub const DEFAULT_STOPS: [f64; 7] = [0.0, 0.17, 0.25, 0.30, 0.5, 0.75, 1.0];

/// Parse a `#rrggbb` web color.  The `#` is optional.
pub fn parse_color(s: &str) -> Result<Color> {
    let hex = s.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(FractalError::ParseColor(s.to_string()));
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16).map_err(|_| FractalError::ParseColor(s.to_string()))
    };
    Ok(Rgb([channel(0..2)?, channel(2..4)?, channel(4..6)?]))
}

/// Render a color as `#rrggbb`.
pub fn format_color(color: &Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}

/// Linear interpolation between two colors, channel by channel.  `t`
/// is clamped to `[0, 1]`; NaN is treated as zero.
pub fn interpolate_color(from: &Color, to: &Color, t: f64) -> Color {
    let t = if t.is_nan() { 0.0 } else { t.max(0.0).min(1.0) };
    let mix = |a: u8, b: u8| {
        let (a, b) = (f64::from(a), f64::from(b));
        (a + (b - a) * t).round() as u8
    };
    Rgb([
        mix(from[0], to[0]),
        mix(from[1], to[1]),
        mix(from[2], to[2]),
    ])
}

/// Convert hue (degrees), saturation and brightness (both `[0, 1]`)
/// to RGB.
pub fn hsb_to_rgb(hue: f64, saturation: f64, brightness: f64) -> Color {
    let hue = hue.rem_euclid(360.0) / 60.0;
    let sector = hue.floor();
    let f = hue - sector;
    let p = brightness * (1.0 - saturation);
    let q = brightness * (1.0 - saturation * f);
    let t = brightness * (1.0 - saturation * (1.0 - f));
    let (r, g, b) = match sector as u8 {
        0 => (brightness, t, p),
        1 => (q, brightness, p),
        2 => (p, brightness, t),
        3 => (p, q, brightness),
        4 => (t, p, brightness),
        _ => (brightness, p, q),
    };
    let byte = |v: f64| (v * 255.0).round() as u8;
    Rgb([byte(r), byte(g), byte(b)])
}

/// A fixed-length gradient lookup table plus the color of the set.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorPalette {
    entries: Vec<Color>,
    color_set: Color,
}

impl ColorPalette {
    /// Build a palette of `length` entries from control colors and
    /// their stops.  The stops must start at 0, end at 1, never
    /// decrease, and pair up one-to-one with the colors.
    pub fn new(length: usize, colors: &[Color], stops: &[f64], color_set: Color) -> Result<Self> {
        validate(colors, stops)?;
        Ok(ColorPalette {
            entries: gradient(length, colors, stops),
            color_set,
        })
    }

    /// The built-in dark red gradient with a black set.
    pub fn default_gradient(length: usize) -> Self {
        ColorPalette {
            entries: gradient(length, &DEFAULT_COLORS, &DEFAULT_STOPS),
            color_set: BLACK,
        }
    }

    /// The same table with a different set color.
    pub fn with_color_set(mut self, color_set: Color) -> Self {
        self.color_set = color_set;
        self
    }

    /// A full turn around the hue circle at full saturation and
    /// brightness, with a black set.
    pub fn hue(length: usize) -> Self {
        let entries = (0..length)
            .map(|i| hsb_to_rgb(sample_position(i, length) * 360.0, 1.0, 1.0))
            .collect();
        ColorPalette {
            entries,
            color_set: BLACK,
        }
    }

    /// The color for a point that took `count` iterations.  Counts
    /// past the end of the table belong to the set.
    #[inline]
    pub fn lookup(&self, count: u32) -> Color {
        match self.entries.get(count as usize) {
            Some(color) => *color,
            None => self.color_set,
        }
    }

    /// Number of gradient entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True for a palette that maps everything to the set color.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The color of points inside the set.
    pub fn color_set(&self) -> Color {
        self.color_set
    }
}

// Position of entry i along [0, 1]; a one-entry table sits at 0.
fn sample_position(i: usize, length: usize) -> f64 {
    if length <= 1 {
        0.0
    } else {
        i as f64 / (length - 1) as f64
    }
}

// Sample `length` entries along stops that have already been validated.
fn gradient(length: usize, colors: &[Color], stops: &[f64]) -> Vec<Color> {
    let mut j = 0;
    (0..length)
        .map(|i| {
            let p = sample_position(i, length);
            while j + 2 < stops.len() && p > stops[j + 1] {
                j += 1;
            }
            let span = stops[j + 1] - stops[j];
            let t = if span > 0.0 { (p - stops[j]) / span } else { 1.0 };
            interpolate_color(&colors[j], &colors[j + 1], t)
        })
        .collect()
}

fn validate(colors: &[Color], stops: &[f64]) -> Result<()> {
    if colors.len() != stops.len() {
        return Err(FractalError::InvalidPalette(format!(
            "{} colors but {} stops",
            colors.len(),
            stops.len()
        )));
    }
    if stops.len() < 2 {
        return Err(FractalError::InvalidPalette(
            "at least two stops are needed".to_string(),
        ));
    }
    if stops.iter().any(|s| !s.is_finite()) {
        return Err(FractalError::InvalidPalette("stops must be finite".to_string()));
    }
    if stops[0] != 0.0 || stops[stops.len() - 1] != 1.0 {
        return Err(FractalError::InvalidPalette(
            "stops must start at 0 and end at 1".to_string(),
        ));
    }
    if stops.windows(2).any(|w| w[1] < w[0]) {
        return Err(FractalError::InvalidPalette(
            "stops must not decrease".to_string(),
        ));
    }
    Ok(())
}
