// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Complex arithmetic beyond what `num` provides: De Moivre integer
//! powers, complex exponents, interpolation for animations, and the
//! `"(re, im)"` text format used at the configuration boundary.

use num::Zero;
use std::str::FromStr;

use crate::error::{FractalError, Result};

/// Every coordinate in the renderer is a double-precision complex.
pub type Complex = num::Complex<f64>;

/// Fractal-specific operations on [`Complex`].
pub trait ComplexExt: Sized {
    /// `sqrt(re² + im²)`
    fn modulus(&self) -> f64;

    /// `atan2(im, re)`, in radians.
    fn argument(&self) -> f64;

    /// Raise to an integer power through the polar form.
    fn pow_int(&self, n: i32) -> Self;

    /// Raise to a complex power.  Zero raised to anything is zero.
    fn pow_complex(&self, exponent: &Self) -> Self;

    /// `self + (other - self) * t`.  Returns the endpoints exactly at
    /// `t = 0` and `t = 1`.
    fn interpolate_linear(&self, other: &Self, t: f64) -> Self;

    /// True when both components differ by strictly less than `delta`.
    fn approx_eq(&self, other: &Self, delta: f64) -> bool;

    /// Division that reports a zero divisor instead of producing NaN.
    fn checked_quotient(&self, divisor: &Self) -> Result<Self>;
}

impl ComplexExt for Complex {
    #[inline]
    fn modulus(&self) -> f64 {
        self.norm_sqr().sqrt()
    }

    #[inline]
    fn argument(&self) -> f64 {
        self.im.atan2(self.re)
    }

    fn pow_int(&self, n: i32) -> Self {
        Complex::from_polar(self.modulus().powi(n), self.argument() * f64::from(n))
    }

    fn pow_complex(&self, exponent: &Self) -> Self {
        if self.is_zero() {
            return Complex::zero();
        }
        let norm_sqr = self.norm_sqr();
        let arg = self.argument();
        let modulus = norm_sqr.powf(exponent.re / 2.0) * (-exponent.im * arg).exp();
        let angle = exponent.re * arg + 0.5 * exponent.im * norm_sqr.ln();
        Complex::from_polar(modulus, angle)
    }

    fn interpolate_linear(&self, other: &Self, t: f64) -> Self {
        if t == 0.0 {
            *self
        } else if t == 1.0 {
            *other
        } else {
            self + (other - self) * t
        }
    }

    fn approx_eq(&self, other: &Self, delta: f64) -> bool {
        (self.re - other.re).abs() < delta && (self.im - other.im).abs() < delta
    }

    fn checked_quotient(&self, divisor: &Self) -> Result<Self> {
        if divisor.norm_sqr() == 0.0 {
            return Err(FractalError::DivisionByZero);
        }
        Ok(self / divisor)
    }
}

/// Returns the signed decimal tokens in `s`, in order.  A token is an
/// optional `-`, one or more digits, an optional `.` and any further
/// digits; everything else separates tokens.
fn decimal_tokens(s: &str) -> Vec<&str> {
    let bytes = s.as_bytes();
    let mut tokens = vec![];
    let mut i = 0;
    while i < bytes.len() {
        let negative = bytes[i] == b'-' && i + 1 < bytes.len() && bytes[i + 1].is_ascii_digit();
        if !(negative || bytes[i].is_ascii_digit()) {
            i += 1;
            continue;
        }
        let start = i;
        if negative {
            i += 1;
        }
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i < bytes.len() && bytes[i] == b'.' {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }
        tokens.push(&s[start..i]);
    }
    tokens
}

/// Parse a complex number written as `(re, im)`.  Only the first two
/// numbers found are used, so `"re,im"` and `"re im"` work as well.
pub fn parse_complex(s: &str) -> Result<Complex> {
    let tokens = decimal_tokens(s);
    if tokens.len() < 2 {
        return Err(FractalError::ParseComplex(s.to_string()));
    }
    match (f64::from_str(tokens[0]), f64::from_str(tokens[1])) {
        (Ok(re), Ok(im)) => Ok(Complex::new(re, im)),
        _ => Err(FractalError::ParseComplex(s.to_string())),
    }
}

/// The inverse of [`parse_complex`].
pub fn format_complex(z: &Complex) -> String {
    format!("({:?}, {:?})", z.re, z.im)
}
