// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contains the CartesianPlane struct, which relates a rectangle of
//! pixels with its origin at the upper-left corner to a rectangle of
//! the complex plane.  The imaginary axis grows upward while pixel
//! rows grow downward, so the mapping flips the vertical axis.
//!
//! The horizontal extent of the complex rectangle is authoritative.
//! The vertical extent is derived from the scale (pixels per unit)
//! and the pixel height, so a non-square request is silently
//! re-centered vertically.

use crate::complex::Complex;
use crate::config::{DEFAULT_DOWN_RIGHT, DEFAULT_UP_LEFT};
use crate::error::{FractalError, Result};

/// The x, y of an integral pixel inside the plane.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pixel(pub usize, pub usize);

/// A position on the canvas in fractional pixels.  Projections of
/// complex numbers land between pixels; truncate to get a [`Pixel`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CanvasPoint {
    /// Column, growing rightward.
    pub x: f64,
    /// Row, growing downward.
    pub y: f64,
}

/// The bidirectional mapping between canvas pixels and the complex
/// plane, with pan and zoom.
#[derive(Clone, Debug, PartialEq)]
pub struct CartesianPlane {
    width: f64,
    height: f64,
    up_left: Complex,
    down_right: Complex,
    // pixels per complex unit, identical on both axes
    scale: f64,
}

impl CartesianPlane {
    /// Constructor.  Takes the canvas size in pixels and the two
    /// corners of the complex rectangle to show.  Only the real parts
    /// of the corners and the vertical center are kept; the imaginary
    /// span is recomputed so a pixel is square.
    pub fn new(width: f64, height: f64, up_left: Complex, down_right: Complex) -> Result<Self> {
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(FractalError::InvalidPlane(format!(
                "the canvas must have an area, got {}x{}",
                width, height
            )));
        }
        let side_x = down_right.re - up_left.re;
        if !side_x.is_finite() || side_x <= 0.0 {
            return Err(FractalError::InvalidPlane(
                "the upper left corner is not to the left of the lower right corner".to_string(),
            ));
        }
        let side_y = up_left.im - down_right.im;
        let center_im = up_left.im - side_y / 2.0;

        let scale = width / side_x;
        let new_side_y = height / scale;

        Ok(CartesianPlane {
            width,
            height,
            up_left: Complex::new(up_left.re, center_im + new_side_y / 2.0),
            down_right: Complex::new(down_right.re, center_im - new_side_y / 2.0),
            scale,
        })
    }

    /// A plane of the given size showing the default view.
    pub fn with_default_view(width: f64, height: f64) -> Result<Self> {
        CartesianPlane::new(width, height, DEFAULT_UP_LEFT, DEFAULT_DOWN_RIGHT)
    }

    /// Go back to the default view, keeping the canvas size.
    pub fn reset(&mut self) {
        let side_x = DEFAULT_DOWN_RIGHT.re - DEFAULT_UP_LEFT.re;
        let center_im = (DEFAULT_UP_LEFT.im + DEFAULT_DOWN_RIGHT.im) / 2.0;
        self.scale = self.width / side_x;
        let side_y = self.height / self.scale;
        self.up_left = Complex::new(DEFAULT_UP_LEFT.re, center_im + side_y / 2.0);
        self.down_right = Complex::new(DEFAULT_DOWN_RIGHT.re, center_im - side_y / 2.0);
    }

    /// Canvas width in pixels.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Canvas height in pixels.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Number of whole pixel columns.
    pub fn pixel_width(&self) -> usize {
        self.width as usize
    }

    /// Number of whole pixel rows.
    pub fn pixel_height(&self) -> usize {
        self.height as usize
    }

    /// The total number of pixels.  Used to size buffers.
    pub fn len(&self) -> usize {
        self.pixel_width() * self.pixel_height()
    }

    /// True when the canvas rounds down to no pixels at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The complex number shown at the upper-left corner.
    pub fn up_left(&self) -> Complex {
        self.up_left
    }

    /// The complex number shown at the lower-right corner.
    pub fn down_right(&self) -> Complex {
        self.down_right
    }

    /// Pixels per complex unit.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// The complex number at the middle of the view.
    pub fn center(&self) -> Complex {
        Complex::new(
            (self.up_left.re + self.down_right.re) / 2.0,
            (self.up_left.im + self.down_right.im) / 2.0,
        )
    }

    /// Given a (possibly fractional) canvas position, return the
    /// complex number shown there.
    pub fn to_complex(&self, x: f64, y: f64) -> Complex {
        Complex::new(
            self.up_left.re + x / self.scale,
            self.up_left.im - y / self.scale,
        )
    }

    /// Given a pixel, return the complex number at its upper-left
    /// corner.
    pub fn pixel_to_point(&self, pixel: &Pixel) -> Complex {
        self.to_complex(pixel.0 as f64, pixel.1 as f64)
    }

    /// Given a complex number, return where it falls on the canvas.
    /// The result may lie outside the canvas.
    pub fn to_pixel(&self, re: f64, im: f64) -> CanvasPoint {
        CanvasPoint {
            x: (re - self.up_left.re) * self.scale,
            y: (self.up_left.im - im) * self.scale,
        }
    }

    /// Map a complex number to the pixel containing it, or `None` when
    /// it falls off the canvas.
    pub fn point_to_pixel(&self, point: &Complex) -> Option<Pixel> {
        let p = self.to_pixel(point.re, point.im);
        // NaN fails both comparisons and is dropped here too
        if !(p.x >= 0.0 && p.y >= 0.0) {
            return None;
        }
        let (column, row) = (p.x as usize, p.y as usize);
        if column < self.pixel_width() && row < self.pixel_height() {
            Some(Pixel(column, row))
        } else {
            None
        }
    }

    /// Same as [`point_to_pixel`](Self::point_to_pixel), flattened to a
    /// row-major offset into a buffer of [`len`](Self::len) cells.
    pub fn point_to_offset(&self, point: &Complex) -> Option<usize> {
        self.point_to_pixel(point)
            .map(|Pixel(column, row)| row * self.pixel_width() + column)
    }

    /// Drag-and-drop: translate the view so the content under `from`
    /// ends up under `to`.
    pub fn pan(&mut self, from: Complex, to: Complex) {
        let delta = from - to;
        self.up_left += delta;
        self.down_right += delta;
    }

    /// Center the view on `center` and multiply the visible width by
    /// `factor`.  A factor below one zooms in.
    pub fn zoom_center(&mut self, center: Complex, factor: f64) {
        let side_x = (self.down_right.re - self.up_left.re) * factor;
        self.scale = self.width / side_x;
        let side_y = self.height / self.scale;
        self.up_left = Complex::new(center.re - side_x / 2.0, center.im + side_y / 2.0);
        self.down_right = Complex::new(center.re + side_x / 2.0, center.im - side_y / 2.0);
    }

    /// Zoom by `factor` while keeping `point` (usually the complex
    /// number under the mouse) at the same place on the canvas.
    pub fn zoom_at(&mut self, point: Complex, factor: f64) {
        let delta_x = (point.re - self.up_left.re) * factor;
        let delta_y = (self.up_left.im - point.im) * factor;
        let new_scale = self.scale / factor;
        let new_up_left = Complex::new(point.re - delta_x, point.im + delta_y);
        let side_x = self.width / new_scale;
        let side_y = self.height / new_scale;
        let new_center = Complex::new(new_up_left.re + side_x / 2.0, new_up_left.im - side_y / 2.0);
        self.zoom_center(new_center, factor);
    }
}
