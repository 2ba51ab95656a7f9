// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Cycle detection for orbits that neither escape nor settle, used
//! when the exponent has a negative real part and the modulus test
//! says nothing useful.

use std::collections::VecDeque;

use crate::complex::{Complex, ComplexExt};

/// Two iterates closer than this on both axes count as equal.
pub const PERIODICITY_DELTA: f64 = 0.01;

/// Longest window kept, whatever the iteration limit.
pub const MAX_WINDOW: usize = 100;

/// A sliding window over the most recent iterates.  Once the window
/// is full, every new iterate triggers a search for a period between
/// half the window and 2: the latest `len` values are compared with
/// the `len` values just before them.
#[derive(Debug)]
pub struct PeriodicityDetector {
    window: VecDeque<Complex>,
    capacity: usize,
}

impl PeriodicityDetector {
    /// A detector whose window is sized for the iteration limit: a
    /// tenth of it, at most [`MAX_WINDOW`].
    pub fn for_iterations(max_iterations: u32) -> Self {
        PeriodicityDetector::with_capacity((max_iterations as usize / 10).min(MAX_WINDOW))
    }

    /// A detector with a fixed window length.  Windows shorter than
    /// four can never hold a repeated pattern and never report one.
    pub fn with_capacity(capacity: usize) -> Self {
        PeriodicityDetector {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Window length.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record `z` and report whether the window now ends in a cycle.
    pub fn check(&mut self, z: Complex) -> bool {
        if self.capacity == 0 {
            return false;
        }
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(z);
        self.window.len() == self.capacity && self.has_cycle()
    }

    fn has_cycle(&self) -> bool {
        let n = self.window.len();
        (2..=n / 2).rev().any(|len| {
            (0..len).all(|k| {
                self.window[n - len + k].approx_eq(&self.window[n - 2 * len + k], PERIODICITY_DELTA)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(detector: &mut PeriodicityDetector, values: &[f64]) -> Vec<bool> {
        values
            .iter()
            .map(|&re| detector.check(Complex::new(re, 0.0)))
            .collect()
    }

    #[test]
    fn window_scales_with_iterations() {
        assert_eq!(PeriodicityDetector::for_iterations(100).capacity(), 10);
        assert_eq!(PeriodicityDetector::for_iterations(1000).capacity(), 100);
        assert_eq!(PeriodicityDetector::for_iterations(50_000).capacity(), 100);
        assert_eq!(PeriodicityDetector::for_iterations(5).capacity(), 0);
    }

    #[test]
    fn nothing_is_reported_before_the_window_fills() {
        let mut detector = PeriodicityDetector::with_capacity(6);
        let hits = feed(&mut detector, &[1.0, 2.0, 1.0, 2.0, 1.0]);
        assert!(hits.iter().all(|h| !h));
    }

    #[test]
    fn finds_a_two_cycle() {
        let mut detector = PeriodicityDetector::with_capacity(6);
        let hits = feed(&mut detector, &[5.0, 7.0, 1.0, 2.0, 1.0, 2.0]);
        assert_eq!(hits.last(), Some(&true));
    }

    #[test]
    fn finds_a_three_cycle_within_tolerance() {
        let mut detector = PeriodicityDetector::with_capacity(8);
        let hits = feed(
            &mut detector,
            &[9.0, 8.0, 1.0, 2.0, 3.0, 1.005, 2.004, 2.996],
        );
        assert_eq!(hits.last(), Some(&true));
    }

    #[test]
    fn ignores_a_non_repeating_orbit() {
        let mut detector = PeriodicityDetector::with_capacity(8);
        let values: Vec<f64> = (0..40).map(|i| i as f64 * 0.5).collect();
        assert!(feed(&mut detector, &values).iter().all(|h| !h));
    }

    #[test]
    fn small_windows_never_match() {
        let mut detector = PeriodicityDetector::with_capacity(3);
        assert!(feed(&mut detector, &[1.0, 1.0, 1.0, 1.0]).iter().all(|h| !h));
        let mut empty = PeriodicityDetector::with_capacity(0);
        assert!(!empty.check(Complex::new(0.0, 0.0)));
    }
}
