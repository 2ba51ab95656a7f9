// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The parameter bundle handed to one evaluator run.

use crate::complex::{Complex, ComplexExt};
use crate::config::{DEFAULT_CONSTANT, DEFAULT_MAX_ITERATIONS, DEFAULT_POWER};
use crate::error::Result;
use crate::planes::CartesianPlane;
use crate::surface::PixelSurface;

/// Iteration limit, exponent, constant and view of one render.  The
/// output surface is not part of the bundle; [`DataBox::surface`]
/// allocates one sized to the plane when a request needs it.
#[derive(Clone, Debug, PartialEq)]
pub struct DataBox {
    /// Iterations after which a point is declared inside the set.
    pub max_iterations: u32,
    /// Exponent of the recurrence.
    pub power: Complex,
    /// Constant of the Julia-type recurrences.
    pub constant: Complex,
    /// The view being rendered.
    pub plane: CartesianPlane,
}

impl DataBox {
    /// Bundle the parameters of one run.
    pub fn new(max_iterations: u32, power: Complex, constant: Complex, plane: CartesianPlane) -> Self {
        DataBox {
            max_iterations,
            power,
            constant,
            plane,
        }
    }

    /// Default parameters over the default view.
    pub fn with_defaults(width: f64, height: f64) -> Result<Self> {
        Ok(DataBox::new(
            DEFAULT_MAX_ITERATIONS,
            DEFAULT_POWER,
            DEFAULT_CONSTANT,
            CartesianPlane::with_default_view(width, height)?,
        ))
    }

    /// A blank output buffer with one cell per pixel of the plane.
    pub fn surface(&self) -> PixelSurface {
        PixelSurface::new(self.plane.pixel_width(), self.plane.pixel_height())
    }

    /// The bundle a fraction `t` of the way from `self` to `end`.  The
    /// power, the constant and both corners move linearly; the
    /// iteration limit and canvas size stay those of `self`.
    pub fn interpolate(&self, end: &DataBox, t: f64) -> Result<DataBox> {
        let plane = CartesianPlane::new(
            self.plane.width(),
            self.plane.height(),
            self.plane.up_left().interpolate_linear(&end.plane.up_left(), t),
            self.plane.down_right().interpolate_linear(&end.plane.down_right(), t),
        )?;
        Ok(DataBox::new(
            self.max_iterations,
            self.power.interpolate_linear(&end.power, t),
            self.constant.interpolate_linear(&end.constant, t),
            plane,
        ))
    }
}
