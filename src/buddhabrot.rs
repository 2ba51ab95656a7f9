// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Buddhabrot renderer
//!
//! The Buddhabrot is a variant of the Mandelbrot set that plots where
//! escaping points travel rather than how fast they leave.  Each
//! sample point `c` is iterated with `z = z^p + c` from zero; if the
//! orbit escapes, every iterate along the way, including the one
//! that escaped, is mapped back to the nearest pixel and that pixel's
//! counter goes up by one.  Orbits that never escape contribute
//! nothing.
//!
//! With a single sample per pixel the result is thin, so each pixel
//! can be split into a `(supersampling + 1)²` grid of sub-samples.
//! Once every row is traced, the densities are normalized by the
//! largest one and blended between two colors.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use itertools::iproduct;

use crate::complex::{Complex, ComplexExt};
use crate::error::{FractalError, Result};
use crate::palette::{interpolate_color, Color};
use crate::planes::{CartesianPlane, Pixel};
use crate::render::{check_surface, elapsed_ms, RenderHandle};
use crate::surface::PixelSurface;
use crate::task::{CancelToken, Progress, RenderObserver, RenderOutcome};
use crate::workers::{default_threads, dispatch};

/// Per-pixel visit counters.  Every cell is its own atomic, so any
/// number of workers can plot into the map at once.
#[derive(Debug)]
pub struct DensityMap {
    rows: usize,
    columns: usize,
    cells: Vec<AtomicU32>,
}

impl DensityMap {
    /// A zeroed map of `rows × columns` counters.
    pub fn new(rows: usize, columns: usize) -> Self {
        DensityMap {
            rows,
            columns,
            cells: (0..rows * columns).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Add one visit to `(row, column)` and return the new count.
    /// Out-of-range cells are ignored and read as zero.
    pub fn increment(&self, row: usize, column: usize) -> u32 {
        if row >= self.rows || column >= self.columns {
            return 0;
        }
        self.cells[row * self.columns + column].fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Visits recorded at `(row, column)`.
    pub fn get(&self, row: usize, column: usize) -> Option<u32> {
        if row >= self.rows || column >= self.columns {
            return None;
        }
        Some(self.cells[row * self.columns + column].load(Ordering::Relaxed))
    }

    /// The largest count in the map; zero for an empty map.
    pub fn max(&self) -> u32 {
        self.cells
            .iter()
            .map(|cell| cell.load(Ordering::Relaxed))
            .max()
            .unwrap_or(0)
    }

    /// Set every counter back to zero.
    pub fn reset(&self) {
        for cell in &self.cells {
            cell.store(0, Ordering::Relaxed);
        }
    }
}

/// Parameters of one Buddhabrot render.
#[derive(Clone, Debug)]
pub struct BuddhabrotEngine {
    plane: CartesianPlane,
    max_iterations: u32,
    power: Complex,
    supersampling: u32,
    color_zero: Color,
    color_max: Color,
    threads: usize,
}

impl BuddhabrotEngine {
    /// `color_zero` paints unvisited pixels, `color_max` the most
    /// visited one.
    pub fn new(
        plane: CartesianPlane,
        max_iterations: u32,
        power: Complex,
        supersampling: u32,
        color_zero: Color,
        color_max: Color,
    ) -> Self {
        BuddhabrotEngine {
            plane,
            max_iterations,
            power,
            supersampling,
            color_zero,
            color_max,
            threads: default_threads(),
        }
    }

    /// Use `threads` workers instead of one per core.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// The view being rendered.
    pub fn plane(&self) -> &CartesianPlane {
        &self.plane
    }

    /// A zeroed density map covering the plane.
    pub fn density_map(&self) -> DensityMap {
        DensityMap::new(self.plane.pixel_height(), self.plane.pixel_width())
    }

    /// The sample points inside the cell whose upper-left corner is
    /// `c`, row by row.
    pub fn sub_samples(&self, c: Complex) -> impl Iterator<Item = Complex> {
        let side = self.supersampling as usize + 1;
        let inc = 1.0 / self.plane.scale() / side as f64;
        iproduct!(0..side, 0..side)
            .map(move |(j, i)| Complex::new(c.re + i as f64 * inc, c.im - j as f64 * inc))
    }

    /// The iteration on which the orbit of `c` left the disk of radius
    /// two, or `None` if it stayed inside for the whole limit.
    pub fn escape_length(&self, c: Complex) -> Option<u32> {
        let mut z = Complex::new(0.0, 0.0);
        let mut count = 0;
        while count < self.max_iterations && z.modulus() < 2.0 {
            z = z.pow_complex(&self.power) + c;
            count += 1;
        }
        if z.modulus() < 2.0 {
            None
        } else {
            Some(count)
        }
    }

    /// Replay the first `length` iterates of `c` onto the map.
    /// Iterates off the canvas are dropped.
    fn plot(&self, c: Complex, length: u32, density: &DensityMap) {
        let mut z = Complex::new(0.0, 0.0);
        for _ in 0..length {
            z = z.pow_complex(&self.power) + c;
            if let Some(Pixel(column, row)) = self.plane.point_to_pixel(&z) {
                density.increment(row, column);
            }
        }
    }

    /// Trace every sub-sample of every pixel into `density`, one row
    /// per job.  Returns `true` when every row finished, `false` when
    /// the token stopped the pass early.
    pub fn accumulate(
        &self,
        density: &DensityMap,
        token: &CancelToken,
        progress: &Progress,
        observer: &dyn RenderObserver,
    ) -> Result<bool> {
        let (width, height) = (self.plane.pixel_width(), self.plane.pixel_height());
        if density.columns() != width || density.rows() != height {
            return Err(FractalError::SurfaceMismatch(
                density.columns(),
                density.rows(),
                width,
                height,
            ));
        }
        let rows_done = AtomicUsize::new(0);
        dispatch(height, self.threads, token, |y| {
            for x in 0..width {
                if token.is_cancelled() {
                    return;
                }
                let corner = self.plane.to_complex(x as f64, y as f64);
                for c in self.sub_samples(corner) {
                    if let Some(length) = self.escape_length(c) {
                        self.plot(c, length, density);
                    }
                }
            }
            if token.is_cancelled() {
                return;
            }
            rows_done.fetch_add(1, Ordering::Relaxed);
            observer.on_progress(progress.advance());
        })?;
        Ok(rows_done.load(Ordering::Relaxed) == height)
    }

    /// Paint `density` onto `surface`, blending from the zero color to
    /// the max color by `count / max`.
    pub fn draw(&self, density: &DensityMap, surface: &PixelSurface) {
        let max = density.max();
        for row in 0..density.rows() {
            for column in 0..density.columns() {
                let count = density.get(row, column).unwrap_or(0);
                let color = if max == 0 {
                    self.color_zero
                } else {
                    interpolate_color(
                        &self.color_zero,
                        &self.color_max,
                        f64::from(count) / f64::from(max),
                    )
                };
                surface.set(column, row, color);
            }
        }
    }

    /// Accumulate, then draw.  A cancelled pass leaves the surface
    /// untouched.
    pub fn run(
        &self,
        surface: &PixelSurface,
        token: &CancelToken,
        progress: &Progress,
        observer: &dyn RenderObserver,
    ) -> Result<RenderOutcome> {
        check_surface(&self.plane, surface)?;
        let started = Instant::now();
        let density = self.density_map();
        if !self.accumulate(&density, token, progress, observer)? {
            return Ok(RenderOutcome::Cancelled {
                elapsed_ms: elapsed_ms(started),
            });
        }
        self.draw(&density, surface);
        log::debug!("buddhabrot peak density {}", density.max());
        let elapsed_ms = elapsed_ms(started);
        observer.on_complete(elapsed_ms);
        Ok(RenderOutcome::Completed { elapsed_ms })
    }
}

/// Start a Buddhabrot render in the background.
pub fn render_buddhabrot(
    engine: BuddhabrotEngine,
    observer: Arc<dyn RenderObserver>,
) -> Result<RenderHandle> {
    log::info!(
        "rendering buddhabrot at {}x{}, {} iterations, supersampling {}",
        engine.plane.pixel_width(),
        engine.plane.pixel_height(),
        engine.max_iterations,
        engine.supersampling
    );
    let surface = PixelSurface::new(engine.plane.pixel_width(), engine.plane.pixel_height());
    let rows = engine.plane.pixel_height();
    RenderHandle::spawn("buddhabrot", surface, rows, move |surface, token, progress| {
        engine.run(surface, token, progress, observer.as_ref())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::{BLACK, WHITE};
    use crate::task::{NoopObserver, TaskState};

    fn far_plane() -> CartesianPlane {
        // scale is one pixel per unit and every point has modulus > 2
        CartesianPlane::new(4.0, 4.0, Complex::new(10.0, 14.0), Complex::new(14.0, 10.0)).unwrap()
    }

    fn engine(plane: CartesianPlane, supersampling: u32) -> BuddhabrotEngine {
        BuddhabrotEngine::new(plane, 50, Complex::new(2.0, 0.0), supersampling, BLACK, WHITE)
    }

    #[test]
    fn density_map_counts_and_clears() {
        let map = DensityMap::new(2, 3);
        assert_eq!(map.increment(1, 2), 1);
        assert_eq!(map.increment(1, 2), 2);
        assert_eq!(map.increment(5, 0), 0);
        assert_eq!(map.get(1, 2), Some(2));
        assert_eq!(map.get(2, 0), None);
        assert_eq!(map.max(), 2);
        map.reset();
        assert_eq!(map.max(), 0);
    }

    #[test]
    fn escaping_in_one_step_marks_each_pixel_once() {
        let engine = engine(far_plane(), 0);
        let density = engine.density_map();
        let done = engine
            .accumulate(&density, &CancelToken::new(), &Progress::new(4), &NoopObserver)
            .unwrap();
        assert!(done);
        for row in 0..4 {
            for column in 0..4 {
                assert_eq!(density.get(row, column), Some(1));
            }
        }
        assert_eq!(density.max(), 1);
    }

    #[test]
    fn supersampling_splits_the_cell() {
        let engine = engine(far_plane(), 1);
        let samples: Vec<Complex> = engine.sub_samples(Complex::new(10.0, 14.0)).collect();
        assert_eq!(
            samples,
            vec![
                Complex::new(10.0, 14.0),
                Complex::new(10.5, 14.0),
                Complex::new(10.0, 13.5),
                Complex::new(10.5, 13.5),
            ]
        );
    }

    #[test]
    fn trapped_orbits_contribute_nothing() {
        let plane = CartesianPlane::new(8.0, 8.0, Complex::new(-0.1, 0.1), Complex::new(0.1, -0.1))
            .unwrap();
        let engine = engine(plane, 0);
        assert_eq!(engine.escape_length(Complex::new(0.0, 0.0)), None);
        let density = engine.density_map();
        engine
            .accumulate(&density, &CancelToken::new(), &Progress::new(8), &NoopObserver)
            .unwrap();
        assert_eq!(density.max(), 0);
    }

    #[test]
    fn escape_length_counts_the_escaping_step() {
        let engine = engine(far_plane(), 0);
        assert_eq!(engine.escape_length(Complex::new(3.0, 0.0)), Some(1));
        // 1 -> 2, escapes on the second step
        assert_eq!(engine.escape_length(Complex::new(1.0, 0.0)), Some(2));
    }

    #[test]
    fn full_density_draws_the_max_color() {
        let engine = engine(far_plane(), 0);
        let surface = PixelSurface::new(4, 4);
        let outcome = engine
            .run(&surface, &CancelToken::new(), &Progress::new(4), &NoopObserver)
            .unwrap();
        assert_eq!(outcome.state(), TaskState::Completed);
        assert_eq!(surface.get(0, 0), Some(WHITE));
        assert_eq!(surface.get(3, 3), Some(WHITE));
    }

    #[test]
    fn empty_map_draws_the_zero_color() {
        let engine = engine(far_plane(), 0);
        let surface = PixelSurface::new(4, 4);
        surface.fill(WHITE);
        engine.draw(&engine.density_map(), &surface);
        assert_eq!(surface.get(2, 1), Some(BLACK));
    }

    #[test]
    fn cancelled_run_leaves_the_surface_alone() {
        let engine = engine(far_plane(), 0);
        let surface = PixelSurface::new(4, 4);
        let token = CancelToken::new();
        token.cancel();
        let outcome = engine
            .run(&surface, &token, &Progress::new(4), &NoopObserver)
            .unwrap();
        assert_eq!(outcome.state(), TaskState::Cancelled);
        assert_eq!(surface.get(0, 0), Some(BLACK));
    }

    #[test]
    fn background_buddhabrot_completes() {
        let handle = render_buddhabrot(engine(far_plane(), 0), Arc::new(NoopObserver)).unwrap();
        let surface = handle.surface();
        assert_eq!(handle.wait().unwrap().state(), TaskState::Completed);
        assert_eq!(surface.get(1, 1), Some(WHITE));
    }
}
