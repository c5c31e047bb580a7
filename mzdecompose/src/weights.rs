/*! Integer discretization of real-valued alphabet masses */
use std::ops::{Index, RangeInclusive};
use std::slice;

use num_traits::PrimInt;
use tracing::trace;

use crate::error::DecompositionError;

/// The integer type a discretized mass is stored in
pub type WeightType = u64;

/// The greatest common divisor of two integers, by Euclid's algorithm
pub fn gcd<T: PrimInt>(mut a: T, mut b: T) -> T {
    while !b.is_zero() {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

#[inline(always)]
fn discretize(mass: f64, precision: f64) -> WeightType {
    // `f64::round` ties away from zero
    (mass / precision).round() as WeightType
}

fn check_precision(precision: f64) -> Result<(), DecompositionError> {
    if precision.is_finite() && precision > 0.0 {
        Ok(())
    } else {
        Err(DecompositionError::InvalidPrecision(precision))
    }
}

/// An ordered alphabet of real masses paired with their integer discretization at
/// a given precision.
///
/// For every index `i`, `weight(i) == round(mass(i) / precision())` holds until
/// [`Weights::divide_by_gcd`] rescales the integers, after which the weights are the
/// originals divided by the common divisor and the precision is multiplied by it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Weights {
    alphabet_masses: Vec<f64>,
    weights: Vec<WeightType>,
    precision: f64,
}

impl Weights {
    /// Discretize `masses` at `precision`.
    ///
    /// # Errors
    /// If `precision` is not a finite positive number, or if any mass is negative,
    /// NaN or infinite.
    pub fn new<I: IntoIterator<Item = f64>>(
        masses: I,
        precision: f64,
    ) -> Result<Self, DecompositionError> {
        check_precision(precision)?;
        let alphabet_masses: Vec<f64> = masses.into_iter().collect();
        if let Some((index, mass)) = alphabet_masses
            .iter()
            .copied()
            .enumerate()
            .find(|(_, m)| !m.is_finite() || *m < 0.0)
        {
            return Err(DecompositionError::InvalidMass { index, mass });
        }
        let weights = alphabet_masses
            .iter()
            .map(|m| discretize(*m, precision))
            .collect();
        Ok(Self {
            alphabet_masses,
            weights,
            precision,
        })
    }

    /// Re-discretize the stored masses at a new precision, replacing every weight.
    ///
    /// Any decomposer built from these weights beforehand keeps its own snapshot and
    /// will not observe the change.
    pub fn set_precision(&mut self, precision: f64) -> Result<(), DecompositionError> {
        check_precision(precision)?;
        self.precision = precision;
        for (w, m) in self.weights.iter_mut().zip(self.alphabet_masses.iter()) {
            *w = discretize(*m, precision);
        }
        Ok(())
    }

    /// A copy of these masses discretized at `precision`
    pub fn with_precision(&self, precision: f64) -> Result<Self, DecompositionError> {
        Self::new(self.alphabet_masses.iter().copied(), precision)
    }

    /// Divide every weight by the greatest common divisor of all weights and scale
    /// the precision up by the same factor.
    ///
    /// The integer weights are scaled directly rather than re-derived from the masses
    /// so that no new rounding error is introduced.
    ///
    /// Returns `true` if the weights changed, `false` if there are fewer than two weights
    /// or they are already coprime.
    pub fn divide_by_gcd(&mut self) -> bool {
        if self.weights.len() < 2 {
            return false;
        }
        let divisor = self.weights.iter().copied().fold(0, gcd);
        if divisor <= 1 {
            return false;
        }
        trace!("Dividing {} weights by {divisor}", self.weights.len());
        for w in self.weights.iter_mut() {
            *w /= divisor;
        }
        self.precision *= divisor as f64;
        true
    }

    /// Exchange the entries at `i` and `j`, keeping masses and weights paired.
    ///
    /// # Panics
    /// If either index is out of bounds.
    pub fn swap(&mut self, i: usize, j: usize) {
        self.weights.swap(i, j);
        self.alphabet_masses.swap(i, j);
    }

    /// Reorder the entries so that weights are non-decreasing
    pub fn sort_ascending(&mut self) {
        for i in 1..self.len() {
            let mut j = i;
            while j > 0 && self.weights[j - 1] > self.weights[j] {
                self.swap(j - 1, j);
                j -= 1;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// The integer weight at `i`
    ///
    /// # Panics
    /// If `i` is out of bounds.
    #[inline]
    pub fn weight(&self, i: usize) -> WeightType {
        self.weights[i]
    }

    /// The original real mass at `i`
    ///
    /// # Panics
    /// If `i` is out of bounds.
    #[inline]
    pub fn mass(&self, i: usize) -> f64 {
        self.alphabet_masses[i]
    }

    pub fn precision(&self) -> f64 {
        self.precision
    }

    pub fn weights(&self) -> &[WeightType] {
        &self.weights
    }

    pub fn masses(&self) -> &[f64] {
        &self.alphabet_masses
    }

    /// Iterate over `(mass, weight)` pairs
    pub fn iter(&self) -> std::iter::Zip<slice::Iter<'_, f64>, slice::Iter<'_, WeightType>> {
        self.alphabet_masses.iter().zip(self.weights.iter())
    }

    pub fn min_weight(&self) -> Option<WeightType> {
        self.weights.iter().copied().min()
    }

    pub fn max_weight(&self) -> Option<WeightType> {
        self.weights.iter().copied().max()
    }

    fn rounding_errors(&self) -> impl Iterator<Item = f64> + '_ {
        let precision = self.precision;
        self.iter()
            .filter(|(m, _)| **m > 0.0)
            .map(move |(m, w)| (*w as f64 * precision - *m) / *m)
    }

    /// The smallest relative error `(weight * precision - mass) / mass` over the alphabet
    pub fn min_rounding_error(&self) -> f64 {
        self.rounding_errors().fold(0.0, f64::min)
    }

    /// The largest relative error `(weight * precision - mass) / mass` over the alphabet
    pub fn max_rounding_error(&self) -> f64 {
        self.rounding_errors().fold(0.0, f64::max)
    }

    /// Convert a real mass interval into the range of integer masses that can hold any
    /// composition whose real mass falls in `[lower, upper]`.
    ///
    /// Both ends are rounded outwards and widened by the alphabet's relative rounding
    /// error, so the range is a superset and results must be re-checked against the
    /// real masses. Returns `None` when the interval lies entirely below zero.
    pub fn integer_range(&self, lower: f64, upper: f64) -> Option<RangeInclusive<WeightType>> {
        let upper_int = ((1.0 + self.max_rounding_error()) * upper / self.precision).ceil();
        if upper_int < 0.0 || lower > upper {
            return None;
        }
        let lower_int = ((1.0 + self.min_rounding_error()) * lower / self.precision)
            .floor()
            .max(0.0);
        Some(lower_int as WeightType..=upper_int as WeightType)
    }
}

impl Index<usize> for Weights {
    type Output = WeightType;

    fn index(&self, index: usize) -> &Self::Output {
        &self.weights[index]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    macro_rules! assert_is_close {
        ($t1:expr, $t2:expr, $tol:expr, $label:literal) => {
            assert!(
                ($t1 - $t2).abs() < $tol,
                "Observed {} {}, expected {}, difference {}",
                $label,
                $t1,
                $t2,
                $t1 - $t2,
            );
        };
    }

    #[test]
    fn test_gcd() {
        assert_eq!(gcd(30u64, 50), 10);
        assert_eq!(gcd(0u64, 7), 7);
        assert_eq!(gcd(7u64, 0), 7);
        assert_eq!(gcd(17u32, 5), 1);
    }

    #[test]
    fn test_rounding_ties_away() {
        let weights = Weights::new([1.25, 3.75, 1.0], 0.5).unwrap();
        assert_eq!(weights.weights(), &[3, 8, 2]);
    }

    #[test]
    fn test_construction_errors() {
        assert_eq!(
            Weights::new([1.0, 2.0], 0.0),
            Err(DecompositionError::InvalidPrecision(0.0))
        );
        assert!(matches!(
            Weights::new([1.0, 2.0], -0.1),
            Err(DecompositionError::InvalidPrecision(_))
        ));
        assert!(matches!(
            Weights::new([1.0, f64::NAN], 0.1),
            Err(DecompositionError::InvalidMass { index: 1, .. })
        ));
        assert!(matches!(
            Weights::new([-1.0], 0.1),
            Err(DecompositionError::InvalidMass { index: 0, .. })
        ));
    }

    #[test]
    fn test_set_precision() {
        let mut weights = Weights::new([57.02146, 71.03711, 87.03203], 0.01).unwrap();
        assert_eq!(weights.weights(), &[5702, 7104, 8703]);
        weights.set_precision(1.0).unwrap();
        assert_eq!(weights.weights(), &[57, 71, 87]);
        assert_eq!(weights.precision(), 1.0);
        assert_eq!(weights.mass(1), 71.03711);
        assert!(weights.set_precision(f64::INFINITY).is_err());
        assert_eq!(weights.precision(), 1.0);
    }

    #[test]
    fn test_divide_by_gcd() {
        let mut weights = Weights::new([3.0, 5.0, 8.0], 0.1).unwrap();
        assert_eq!(weights.weights(), &[30, 50, 80]);
        assert!(weights.divide_by_gcd());
        assert_eq!(weights.weights(), &[3, 5, 8]);
        assert_is_close!(weights.precision(), 1.0, 1e-9, "precision");
        assert_eq!(weights.masses(), &[3.0, 5.0, 8.0]);

        assert!(!weights.divide_by_gcd());
        assert_eq!(weights.weights(), &[3, 5, 8]);

        let mut single = Weights::new([4.0], 1.0).unwrap();
        assert!(!single.divide_by_gcd());
        assert_eq!(single.weights(), &[4]);
    }

    #[test]
    fn test_swap_and_sort() {
        let mut weights = Weights::new([8.0, 3.0, 5.0], 1.0).unwrap();
        weights.swap(0, 2);
        assert_eq!(weights.weights(), &[5, 3, 8]);
        assert_eq!(weights.masses(), &[5.0, 3.0, 8.0]);
        weights.sort_ascending();
        assert_eq!(weights.weights(), &[3, 5, 8]);
        assert_eq!(weights.masses(), &[3.0, 5.0, 8.0]);
        assert_eq!(weights[2], 8);
        assert_eq!(weights.min_weight(), Some(3));
        assert_eq!(weights.max_weight(), Some(8));
    }

    #[test]
    fn test_rounding_errors() {
        let weights = Weights::new([1.04, 2.96], 0.1).unwrap();
        assert_eq!(weights.weights(), &[10, 30]);
        assert_is_close!(weights.min_rounding_error(), (1.0 - 1.04) / 1.04, 1e-9, "min");
        assert_is_close!(weights.max_rounding_error(), (3.0 - 2.96) / 2.96, 1e-9, "max");

        let range = weights.integer_range(9.0, 11.0).unwrap();
        assert!(*range.start() <= 86);
        assert!(*range.end() >= 112);
        assert!(weights.integer_range(-5.0, -1.0).is_none());
    }
}
