// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The error type shared by every part of the renderer.  Parse and
//! configuration failures are raised before a render starts;
//! cancellation is never an error, it is an outcome.

use failure::Fail;

/// Everything that can stop a render request from being started or
/// finished.
#[derive(Debug, Fail)]
pub enum FractalError {
    /// The text did not contain two decimal numbers.
    #[fail(display = "could not parse a complex number from {:?}", _0)]
    ParseComplex(String),

    /// The text was not a `#rrggbb` color.
    #[fail(display = "could not parse a color from {:?}", _0)]
    ParseColor(String),

    /// A plain numeric argument could not be read.
    #[fail(display = "could not parse a number from {:?}", _0)]
    ParseNumber(String),

    /// No fractal is registered under this name.
    #[fail(display = "unknown fractal {:?}", _0)]
    UnknownFractal(String),

    /// The plane has no area, or its corners are the wrong way round.
    #[fail(display = "invalid plane: {}", _0)]
    InvalidPlane(String),

    /// The stops and colors do not describe a gradient over [0, 1].
    #[fail(display = "invalid palette: {}", _0)]
    InvalidPalette(String),

    /// Interpolation needs a first and a last frame.
    #[fail(display = "an animation needs at least two frames, got {}", _0)]
    InvalidFrameCount(u32),

    /// Complex division by a number of modulus zero.
    #[fail(display = "complex division by zero")]
    DivisionByZero,

    /// The output surface does not have the plane's pixel size.
    #[fail(
        display = "surface is {}x{} but the plane is {}x{}",
        _0, _1, _2, _3
    )]
    SurfaceMismatch(usize, usize, usize, usize),

    /// A worker thread panicked while rendering.
    #[fail(display = "a render worker panicked")]
    WorkerPanicked,

    /// Could not create a thread or write a file.
    #[fail(display = "I/O error: {}", _0)]
    Io(#[cause] std::io::Error),

    /// The image encoder rejected the frames.
    #[fail(display = "image encoding failed: {}", _0)]
    Encoding(#[cause] image::ImageError),
}

impl From<std::io::Error> for FractalError {
    fn from(err: std::io::Error) -> Self {
        FractalError::Io(err)
    }
}

impl From<image::ImageError> for FractalError {
    fn from(err: image::ImageError) -> Self {
        FractalError::Encoding(err)
    }
}

/// Shorthand used throughout the crate.
pub type Result<T> = std::result::Result<T, FractalError>;
