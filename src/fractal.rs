// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape-time family.
//!
//! Every variant shares one driver: start from an initial `z`, apply
//! the variant's recurrence until the iteration limit is reached or
//! the escape test fires, then color the point by the iteration
//! count.  A count equal to the limit means the point never escaped
//! and is looked up past the end of the palette, which yields the set
//! color.
//!
//! | kind                | initial z | recurrence                  | escape            |
//! |---------------------|-----------|-----------------------------|-------------------|
//! | Mandelbrot          | 0         | `z^p + c`                   | `abs(z) >= 2`     |
//! | Julia               | c         | `z^p + k`                   | `abs(z) >= max(2, abs(c))` |
//! | Burning Ship        | 0         | `(abs re, abs im)^p - c`    | `abs(z) >= 2`     |
//! | Burning Julia       | c         | `(abs re, abs im)^p - k`    | `abs(z) >= max(2, abs(c))` |
//! | Periodic Mandelbrot | 0         | `z^p + c`                   | cycle found when `re p < 0`, else as Mandelbrot |
//! | Lyapunov            | 0         | `z^p + c`                   | never; sign of the mean `ln abs(z)` decides |

use std::fmt;
use std::str::FromStr;

use crate::complex::{Complex, ComplexExt};
use crate::databox::DataBox;
use crate::error::FractalError;
use crate::palette::{Color, ColorPalette, BLACK, WHITE};
use crate::periodic::PeriodicityDetector;

/// The iteration algorithm.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FractalKind {
    /// `z = z^p + c` from zero.
    Mandelbrot,
    /// `z = z^p + k` from the point itself.
    Julia,
    /// Absolute-value fold before the power, subtracting `c`.
    BurningShip,
    /// Absolute-value fold before the power, subtracting `k`.
    BurningJulia,
    /// Mandelbrot with cycle detection for negative exponents.
    PeriodicMandelbrot,
    /// Mandelbrot classified by its Lyapunov exponent.
    Lyapunov,
}

/// Where a variant takes its colors from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PaletteSource {
    /// The palette supplied with the request.
    Provided,
    /// The built-in gradient, sized to the iteration limit.
    Default,
    /// The hue ramp, sized to the iteration limit.
    Hue,
}

/// One entry of the fractal registry: an algorithm plus a palette
/// choice.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FractalVariant {
    /// The algorithm.
    pub kind: FractalKind,
    /// The colors.
    pub palette: PaletteSource,
}

static REGISTRY: [(&str, FractalKind, PaletteSource); 16] = [
    ("Mandelbrot Simple", FractalKind::Mandelbrot, PaletteSource::Provided),
    ("Mandelbrot Simple (default color)", FractalKind::Mandelbrot, PaletteSource::Default),
    ("Mandelbrot Simple (HUE color)", FractalKind::Mandelbrot, PaletteSource::Hue),
    ("Julia Simple", FractalKind::Julia, PaletteSource::Provided),
    ("Julia Simple (default color)", FractalKind::Julia, PaletteSource::Default),
    ("Julia Simple (HUE color)", FractalKind::Julia, PaletteSource::Hue),
    ("Mandelbrot Periodic", FractalKind::PeriodicMandelbrot, PaletteSource::Provided),
    ("Mandelbrot Periodic (default color)", FractalKind::PeriodicMandelbrot, PaletteSource::Default),
    ("Mandelbrot Periodic (HUE color)", FractalKind::PeriodicMandelbrot, PaletteSource::Hue),
    ("Burning Ship Simple", FractalKind::BurningShip, PaletteSource::Provided),
    ("Burning Ship Simple (default color)", FractalKind::BurningShip, PaletteSource::Default),
    ("Burning Ship Simple (HUE color)", FractalKind::BurningShip, PaletteSource::Hue),
    ("Burning Julia Simple", FractalKind::BurningJulia, PaletteSource::Provided),
    ("Burning Julia Simple (default color)", FractalKind::BurningJulia, PaletteSource::Default),
    ("Burning Julia Simple (HUE color)", FractalKind::BurningJulia, PaletteSource::Hue),
    ("Mandelbrot Lyapunov", FractalKind::Lyapunov, PaletteSource::Default),
];

impl FractalVariant {
    /// Every registered variant, in menu order.
    pub fn all() -> impl Iterator<Item = FractalVariant> {
        REGISTRY
            .iter()
            .map(|&(_, kind, palette)| FractalVariant { kind, palette })
    }

    /// Every registered name, in menu order.
    pub fn names() -> impl Iterator<Item = &'static str> {
        REGISTRY.iter().map(|&(name, _, _)| name)
    }

    /// The registered name of this variant.
    pub fn name(&self) -> &'static str {
        REGISTRY
            .iter()
            .find(|&&(_, kind, palette)| kind == self.kind && palette == self.palette)
            .map_or("Mandelbrot Lyapunov", |&(name, _, _)| name)
    }
}

impl FromStr for FractalVariant {
    type Err = FractalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        REGISTRY
            .iter()
            .find(|&&(name, _, _)| name == s.trim())
            .map(|&(_, kind, palette)| FractalVariant { kind, palette })
            .ok_or_else(|| FractalError::UnknownFractal(s.to_string()))
    }
}

impl fmt::Display for FractalVariant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fold both components onto the positive quadrant.
#[inline]
fn fold(z: Complex) -> Complex {
    Complex::new(z.re.abs(), z.im.abs())
}

/// The starting iterate for `c`.
#[inline]
pub fn initial_z(kind: FractalKind, c: Complex) -> Complex {
    match kind {
        FractalKind::Julia | FractalKind::BurningJulia => c,
        _ => Complex::new(0.0, 0.0),
    }
}

/// One step of the recurrence.
#[inline]
pub fn next_z(kind: FractalKind, z: Complex, c: Complex, power: &Complex, constant: &Complex) -> Complex {
    match kind {
        FractalKind::Mandelbrot | FractalKind::PeriodicMandelbrot | FractalKind::Lyapunov => {
            z.pow_complex(power) + c
        }
        FractalKind::Julia => z.pow_complex(power) + constant,
        FractalKind::BurningShip => fold(z).pow_complex(power) - c,
        FractalKind::BurningJulia => fold(z).pow_complex(power) - constant,
    }
}

/// The modulus at which an orbit started from `c` counts as escaped.
#[inline]
pub fn escape_radius(kind: FractalKind, c: Complex) -> f64 {
    match kind {
        FractalKind::Julia | FractalKind::BurningJulia => c.modulus().max(2.0),
        _ => 2.0,
    }
}

/// Per-pixel evaluator: a variant with its parameters and resolved
/// palette.  Cheap to share between workers.
#[derive(Clone, Debug)]
pub struct Evaluator {
    kind: FractalKind,
    max_iterations: u32,
    power: Complex,
    constant: Complex,
    palette: ColorPalette,
}

impl Evaluator {
    /// Resolve the variant's palette against the one supplied with the
    /// request and capture the parameters of `data`.
    pub fn new(variant: FractalVariant, data: &DataBox, palette: &ColorPalette) -> Self {
        let length = data.max_iterations as usize;
        let palette = match variant.palette {
            PaletteSource::Provided => palette.clone(),
            PaletteSource::Default => ColorPalette::default_gradient(length),
            PaletteSource::Hue => ColorPalette::hue(length),
        };
        Evaluator {
            kind: variant.kind,
            max_iterations: data.max_iterations,
            power: data.power,
            constant: data.constant,
            palette,
        }
    }

    /// The algorithm.
    pub fn kind(&self) -> FractalKind {
        self.kind
    }

    /// The palette the evaluator colors with.
    pub fn palette(&self) -> &ColorPalette {
        &self.palette
    }

    /// Iterations before `c` escaped, or the limit if it never did.
    /// Meaningless for Lyapunov, which never escapes early.
    pub fn escape_count(&self, c: Complex) -> u32 {
        if self.kind == FractalKind::PeriodicMandelbrot && self.power.re < 0.0 {
            return self.cycle_count(c);
        }
        let radius = escape_radius(self.kind, c);
        let mut z = initial_z(self.kind, c);
        let mut count = 0;
        while count < self.max_iterations && z.modulus() < radius {
            z = next_z(self.kind, z, c, &self.power, &self.constant);
            count += 1;
        }
        count
    }

    // Iterate until a cycle shows up in the orbit, or the limit.
    fn cycle_count(&self, c: Complex) -> u32 {
        let mut detector = PeriodicityDetector::for_iterations(self.max_iterations);
        let mut z = Complex::new(0.0, 0.0);
        let mut count = 0;
        while count < self.max_iterations && !detector.check(z) {
            z = next_z(self.kind, z, c, &self.power, &self.constant);
            count += 1;
        }
        count
    }

    /// Mean of `ln abs(z)` over the whole orbit.
    pub fn lyapunov_exponent(&self, c: Complex) -> f64 {
        let mut z = Complex::new(0.0, 0.0);
        let mut sum = 0.0;
        for _ in 0..self.max_iterations {
            z = next_z(self.kind, z, c, &self.power, &self.constant);
            sum += z.modulus().ln();
        }
        sum / f64::from(self.max_iterations)
    }

    /// The color of the point `c`.
    #[inline]
    pub fn evaluate(&self, c: Complex) -> Color {
        match self.kind {
            FractalKind::Lyapunov => {
                if self.lyapunov_exponent(c) <= 0.0 {
                    BLACK
                } else {
                    WHITE
                }
            }
            _ => self.palette.lookup(self.escape_count(c)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planes::CartesianPlane;
    use image::Rgb;

    fn data(max_iterations: u32, power: (f64, f64), constant: (f64, f64)) -> DataBox {
        DataBox::new(
            max_iterations,
            Complex::new(power.0, power.1),
            Complex::new(constant.0, constant.1),
            CartesianPlane::with_default_view(8.0, 8.0).unwrap(),
        )
    }

    fn palette(length: usize) -> ColorPalette {
        ColorPalette::new(length, &[Rgb([0, 0, 255]), Rgb([255, 255, 0])], &[0.0, 1.0], Rgb([9, 9, 9]))
            .unwrap()
    }

    fn evaluator(name: &str, data: &DataBox) -> Evaluator {
        Evaluator::new(name.parse().unwrap(), data, &palette(data.max_iterations as usize))
    }

    #[test]
    fn registry_has_sixteen_unique_names() {
        let names: Vec<_> = FractalVariant::names().collect();
        assert_eq!(names.len(), 16);
        for variant in FractalVariant::all() {
            assert_eq!(variant.name().parse::<FractalVariant>().unwrap(), variant);
        }
    }

    #[test]
    fn unknown_names_are_an_error() {
        match "Newton".parse::<FractalVariant>() {
            Err(FractalError::UnknownFractal(name)) => assert_eq!(name, "Newton"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn origin_never_escapes_the_mandelbrot_set() {
        let data = data(100, (2.0, 0.0), (0.0, 0.0));
        let eval = evaluator("Mandelbrot Simple", &data);
        assert_eq!(eval.escape_count(Complex::new(0.0, 0.0)), 100);
        assert_eq!(eval.evaluate(Complex::new(0.0, 0.0)), Rgb([9, 9, 9]));
    }

    #[test]
    fn far_point_escapes_after_one_step() {
        let data = data(100, (2.0, 0.0), (0.0, 0.0));
        let eval = evaluator("Mandelbrot Simple", &data);
        assert_eq!(eval.escape_count(Complex::new(2.0, 2.0)), 1);
        assert_eq!(eval.evaluate(Complex::new(2.0, 2.0)), eval.palette().lookup(1));
    }

    #[test]
    fn julia_escape_radius_grows_with_the_point() {
        let data = data(50, (2.0, 0.0), (0.285, 0.013));
        let eval = evaluator("Julia Simple", &data);
        // starts outside the radius: zero iterations
        assert_eq!(eval.escape_count(Complex::new(3.0, 0.0)), 0);
        assert_eq!(escape_radius(FractalKind::Julia, Complex::new(3.0, 4.0)), 5.0);
        assert_eq!(escape_radius(FractalKind::Julia, Complex::new(0.1, 0.0)), 2.0);
    }

    #[test]
    fn burning_ship_folds_before_the_power() {
        let z = Complex::new(-1.0, -0.5);
        let c = Complex::new(0.25, 0.25);
        let power = Complex::new(2.0, 0.0);
        let expected = Complex::new(1.0, 0.5) * Complex::new(1.0, 0.5) - c;
        let got = next_z(FractalKind::BurningShip, z, c, &power, &Complex::new(0.0, 0.0));
        assert!(got.approx_eq(&expected, 1e-12));
        let k = Complex::new(0.5, 0.0);
        let got = next_z(FractalKind::BurningJulia, z, c, &power, &k);
        assert!(got.approx_eq(&(Complex::new(1.0, 0.5) * Complex::new(1.0, 0.5) - k), 1e-12));
    }

    #[test]
    fn burning_ship_escape_counts() {
        let data = data(100, (2.0, 0.0), (0.0, 0.0));
        let eval = evaluator("Burning Ship Simple", &data);
        assert_eq!(eval.escape_count(Complex::new(0.0, 0.0)), 100);
        assert_eq!(eval.escape_count(Complex::new(-2.0, -2.0)), 1);
    }

    #[test]
    fn periodic_mandelbrot_matches_mandelbrot_for_positive_powers() {
        let data = data(80, (2.0, 0.0), (0.0, 0.0));
        let plain = evaluator("Mandelbrot Simple", &data);
        let periodic = evaluator("Mandelbrot Periodic", &data);
        for &(re, im) in &[(0.0, 0.0), (0.3, 0.5), (-1.0, 0.2), (1.0, 1.0)] {
            let c = Complex::new(re, im);
            assert_eq!(plain.escape_count(c), periodic.escape_count(c));
        }
    }

    #[test]
    fn periodic_mandelbrot_stops_on_a_cycle() {
        // 1/z + 0.5 settles on a fixed point, which repeats at every period
        let data = data(1000, (-1.0, 0.0), (0.0, 0.0));
        let periodic = evaluator("Mandelbrot Periodic", &data);
        let count = periodic.escape_count(Complex::new(0.5, 0.0));
        assert!(count < 1000, "count {}", count);
    }

    #[test]
    fn lyapunov_is_two_colored() {
        let data = data(200, (2.0, 0.0), (0.0, 0.0));
        let eval = evaluator("Mandelbrot Lyapunov", &data);
        // -1 settles on the 2-cycle 0, -1: ln 0 drives the mean down
        assert_eq!(eval.evaluate(Complex::new(-1.0, 0.0)), BLACK);
        assert_eq!(eval.evaluate(Complex::new(-0.1, 0.0)), BLACK);
        assert_eq!(eval.evaluate(Complex::new(1.0, 1.0)), WHITE);
    }

    #[test]
    fn builtin_palettes_are_sized_to_the_limit() {
        let data = data(64, (2.0, 0.0), (0.0, 0.0));
        assert_eq!(evaluator("Julia Simple (HUE color)", &data).palette(), &ColorPalette::hue(64));
        assert_eq!(
            evaluator("Burning Julia Simple (default color)", &data).palette(),
            &ColorPalette::default_gradient(64)
        );
    }
}
