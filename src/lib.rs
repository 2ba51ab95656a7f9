#![warn(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Fractal viewer core
//!
//! Escape-time fractals (Mandelbrot, Julia, Burning Ship and their
//! relatives) are drawn by iterating a recurrence at every point of a
//! view of the complex plane and coloring each pixel by how many
//! steps it took the orbit to leave a disk.  Points whose orbits
//! never leave are painted in the set color.
//!
//! The crate has four entry points:
//!
//! * [`render`] draws one escape-time image in the background and
//!   returns a handle that can be polled, cancelled, or waited on.
//! * [`render_buddhabrot`] draws the density of escaping orbits
//!   instead of their speed.
//! * [`animate`] renders a run of frames between two parameter sets
//!   and writes them out as a looping GIF.
//! * [`RenderSession`] keeps at most one render alive per view,
//!   cancelling the previous request when a new one starts.
//!
//! Every request runs on a pool of worker threads sized to the
//! machine, checks its cancellation token at least once per row, and
//! reports progress through a [`RenderObserver`].

pub mod animation;
pub mod buddhabrot;
pub mod complex;
pub mod config;
pub mod databox;
pub mod error;
pub mod fractal;
pub mod palette;
pub mod periodic;
pub mod planes;
pub mod render;
pub mod surface;
pub mod task;
pub mod workers;

pub use animation::{animate, AnimationHandle, AnimationOutcome, AnimationPhase, GifFileSink};
pub use buddhabrot::{render_buddhabrot, BuddhabrotEngine, DensityMap};
pub use complex::{format_complex, parse_complex, Complex, ComplexExt};
pub use databox::DataBox;
pub use error::{FractalError, Result};
pub use fractal::{Evaluator, FractalKind, FractalVariant};
pub use palette::{Color, ColorPalette};
pub use planes::CartesianPlane;
pub use render::{render, GridRenderer, RenderHandle, RenderSession};
pub use surface::PixelSurface;
pub use task::{CancelToken, LogObserver, NoopObserver, RenderObserver, RenderOutcome, TaskState};
