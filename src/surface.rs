// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The pixel surface renders are written into.  Every cell is its own
//! atomic, so any number of workers can write distinct pixels through
//! a shared reference without a lock around the whole image.

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::Result;
use crate::palette::Color;

/// A `width × height` grid of packed RGB cells.
#[derive(Debug)]
pub struct PixelSurface {
    width: usize,
    height: usize,
    cells: Vec<AtomicU32>,
}

#[inline]
fn pack(color: Color) -> u32 {
    (u32::from(color[0]) << 16) | (u32::from(color[1]) << 8) | u32::from(color[2])
}

#[inline]
fn unpack(cell: u32) -> Color {
    Rgb([(cell >> 16) as u8, (cell >> 8) as u8, cell as u8])
}

impl PixelSurface {
    /// A black surface.
    pub fn new(width: usize, height: usize) -> Self {
        PixelSurface {
            width,
            height,
            cells: (0..width * height).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Write one pixel.  Writes outside the surface are ignored.
    #[inline]
    pub fn set(&self, x: usize, y: usize, color: Color) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x].store(pack(color), Ordering::Relaxed);
        }
    }

    /// Read one pixel, or `None` outside the surface.
    pub fn get(&self, x: usize, y: usize) -> Option<Color> {
        if x < self.width && y < self.height {
            Some(unpack(self.cells[y * self.width + x].load(Ordering::Relaxed)))
        } else {
            None
        }
    }

    /// Paint every pixel the same color.
    pub fn fill(&self, color: Color) {
        let packed = pack(color);
        for cell in &self.cells {
            cell.store(packed, Ordering::Relaxed);
        }
    }

    /// Copy out as an `image` RGB buffer.
    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            unpack(self.cells[y as usize * self.width + x as usize].load(Ordering::Relaxed))
        })
    }

    /// Copy out as an opaque RGBA buffer, the pixel format the GIF
    /// encoder takes.
    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let Rgb([r, g, b]) =
                unpack(self.cells[y as usize * self.width + x as usize].load(Ordering::Relaxed));
            Rgba([r, g, b, 255])
        })
    }

    /// Write the surface to an image file; the format follows the
    /// extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_rgb_image().save(path)?;
        Ok(())
    }
}
