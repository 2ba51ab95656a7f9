// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Defaults for every request parameter, and the argument parsers and
//! validators the command line uses to turn text into them.

use std::str::FromStr;

use crate::complex::{parse_complex, Complex};
use crate::error::{FractalError, Result};
use crate::palette::{parse_color, Color, ColorPalette};

/// Escape-time iteration cap.
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// Exponent of the recurrence.
pub const DEFAULT_POWER: Complex = Complex { re: 2.0, im: 0.0 };

/// Julia constant.
pub const DEFAULT_CONSTANT: Complex = Complex { re: 0.285, im: 0.013 };

/// Upper-left corner of the initial view.
pub const DEFAULT_UP_LEFT: Complex = Complex { re: -2.0, im: 2.0 };

/// Lower-right corner of the initial view.
pub const DEFAULT_DOWN_RIGHT: Complex = Complex { re: 2.0, im: -2.0 };

/// Frames in an animation.
pub const DEFAULT_TOTAL_FRAMES: u32 = 10;

/// Delay between animation frames, in milliseconds.
pub const FRAME_DELAY_MS: u32 = 1000;

/// Where animations are written.
pub const DEFAULT_ANIMATION_PATH: &str = "anime.gif";

/// Canvas size.
pub const DEFAULT_SIZE: &str = "800x600";

/// Buddhabrot sub-samples per pixel side, minus one.
pub const DEFAULT_SUPERSAMPLING: u32 = 0;

/// Buddhabrot color for cells no trajectory visited.
pub const DEFAULT_COLOR_ZERO: &str = "#000000";

/// Buddhabrot color for the most visited cell.
pub const DEFAULT_COLOR_MAX: &str = "#ffffff";

/// Zoom base for one scroll step.
pub const ZOOM_BASE: f64 = 2.0;

/// Zoom base for one scroll step with the fine modifier held.
pub const ZOOM_BASE_FINE: f64 = 1.1;

/// Zoom base for one scroll step with the coarse modifier held.
pub const ZOOM_BASE_COARSE: f64 = 10.0;

/// The zoom factor for one scroll step.  Scrolling up zooms in.
pub fn scroll_zoom_factor(scroll_up: bool, base: f64) -> f64 {
    if scroll_up {
        1.0 / base
    } else {
        base
    }
}

/// Given a string and a separator, returns the two values
/// separated by the separator.
pub fn parse_pair<T: FromStr>(s: &str, separator: char) -> Option<(T, T)> {
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

/// Parse a `WIDTHxHEIGHT` canvas size.
pub fn parse_size(s: &str) -> Result<(u32, u32)> {
    match parse_pair::<u32>(s, 'x') {
        Some((w, h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => Err(FractalError::ParseNumber(s.to_string())),
    }
}

/// Parse a plain number.
pub fn parse_number<T: FromStr>(s: &str) -> Result<T> {
    T::from_str(s.trim()).map_err(|_| FractalError::ParseNumber(s.to_string()))
}

/// Parse a comma-separated list of `#rrggbb` colors.
pub fn parse_color_list(s: &str) -> Result<Vec<Color>> {
    s.split(',').map(parse_color).collect()
}

/// Parse a comma-separated list of gradient stops.
pub fn parse_stop_list(s: &str) -> Result<Vec<f64>> {
    s.split(',').map(parse_number::<f64>).collect()
}

/// Build the palette requested on the command line.  Without explicit
/// colors the built-in gradient is used.
pub fn palette_from_args(
    length: u32,
    colors: Option<&str>,
    stops: Option<&str>,
    color_set: &str,
) -> Result<ColorPalette> {
    let color_set = parse_color(color_set)?;
    match (colors, stops) {
        (Some(colors), Some(stops)) => ColorPalette::new(
            length as usize,
            &parse_color_list(colors)?,
            &parse_stop_list(stops)?,
            color_set,
        ),
        (Some(colors), None) => {
            let colors = parse_color_list(colors)?;
            let stops = even_stops(colors.len());
            ColorPalette::new(length as usize, &colors, &stops, color_set)
        }
        (None, Some(_)) => Err(FractalError::InvalidPalette(
            "stops were given without colors".to_string(),
        )),
        (None, None) => {
            Ok(ColorPalette::default_gradient(length as usize).with_color_set(color_set))
        }
    }
}

// Evenly spread stops for n colors.
fn even_stops(n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![0.0],
        _ => (0..n).map(|i| i as f64 / (n - 1) as f64).collect(),
    }
}

/// Validator for arguments made of two values around a separator.
pub fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> std::result::Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

/// Validator for bounded numeric arguments.
pub fn validate_range<T: FromStr + PartialOrd>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> std::result::Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

/// Validator for `(re, im)` arguments.
pub fn validate_complex(s: &str) -> std::result::Result<(), String> {
    parse_complex(s).map(|_| ()).map_err(|e| e.to_string())
}

/// Validator for `#rrggbb` arguments.
pub fn validate_color(s: &str) -> std::result::Result<(), String> {
    parse_color(s).map(|_| ()).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::{BLACK, WHITE};

    #[test]
    fn parses_sizes() {
        assert_eq!(parse_size("800x600").unwrap(), (800, 600));
        assert!(parse_size("800").is_err());
        assert!(parse_size("0x600").is_err());
        assert!(parse_size("axb").is_err());
    }

    #[test]
    fn validators_report_their_messages() {
        assert!(validate_pair::<u16>("640x480", 'x', "bad").is_ok());
        assert_eq!(validate_pair::<u16>("640", 'x', "bad"), Err("bad".to_string()));
        assert!(validate_range("5", 1, 10, "nan", "range").is_ok());
        assert_eq!(validate_range("50", 1, 10, "nan", "range"), Err("range".to_string()));
        assert_eq!(validate_range("x", 1, 10, "nan", "range"), Err("nan".to_string()));
        assert!(validate_complex("(1, 2)").is_ok());
        assert!(validate_complex("(1)").is_err());
        assert!(validate_color("#00ff00").is_ok());
        assert!(validate_color("green").is_err());
    }

    #[test]
    fn palette_defaults_to_builtin_gradient() {
        let palette = palette_from_args(50, None, None, "#000000").unwrap();
        assert_eq!(palette, ColorPalette::default_gradient(50));
    }

    #[test]
    fn builtin_gradient_takes_the_requested_set_color() {
        let palette = palette_from_args(10, None, None, "#ff0000").unwrap();
        assert_eq!(palette.lookup(10), image::Rgb([255, 0, 0]));
        assert_eq!(palette.lookup(0), ColorPalette::default_gradient(10).lookup(0));
    }

    #[test]
    fn palette_from_colors_and_stops() {
        let palette =
            palette_from_args(3, Some("#000000,#ffffff"), Some("0,1"), "#ff0000").unwrap();
        assert_eq!(palette.lookup(0), BLACK);
        assert_eq!(palette.lookup(2), WHITE);
        assert_eq!(palette.lookup(3), image::Rgb([255, 0, 0]));
    }

    #[test]
    fn palette_colors_without_stops_are_spread_evenly() {
        let palette = palette_from_args(3, Some("#000000,#ff0000,#ffffff"), None, "#000000")
            .unwrap();
        assert_eq!(palette.lookup(1), image::Rgb([255, 0, 0]));
    }

    #[test]
    fn stops_without_colors_are_rejected() {
        assert!(palette_from_args(3, None, Some("0,1"), "#000000").is_err());
    }

    #[test]
    fn scroll_direction_picks_the_factor() {
        assert_eq!(scroll_zoom_factor(true, ZOOM_BASE), 0.5);
        assert_eq!(scroll_zoom_factor(false, ZOOM_BASE_COARSE), 10.0);
    }
}
