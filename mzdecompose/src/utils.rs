//! Helpers for checking decompositions against the real alphabet masses
use itertools::Itertools;
use mzpeaks::Tolerance;

use crate::composition::Composition;
use crate::error::DecompositionError;
use crate::weights::{WeightType, Weights};

/// The real mass of `composition`, summing the original, undiscretized alphabet masses.
///
/// # Panics
/// If `composition` does not have one multiplicity per alphabet entry.
pub fn get_parent_mass(weights: &Weights, composition: &Composition) -> f64 {
    weights
        .masses()
        .iter()
        .zip_eq(composition.iter())
        .map(|(m, c)| *m * *c as f64)
        .sum()
}

/// The discretized mass of `composition` under the current integer weights.
///
/// # Panics
/// If `composition` does not have one multiplicity per alphabet entry.
pub fn get_integer_mass(weights: &Weights, composition: &Composition) -> WeightType {
    weights
        .weights()
        .iter()
        .zip_eq(composition.iter())
        .map(|(w, c)| *w * *c as WeightType)
        .sum()
}

/// The signed difference between the real mass of `composition` and `target`
pub fn mass_error(weights: &Weights, composition: &Composition, target: f64) -> f64 {
    get_parent_mass(weights, composition) - target
}

/// The inclusive real mass interval `error_tolerance` describes around `mass`.
///
/// # Errors
/// If the interval is inverted or not finite, as from a negative tolerance.
pub fn mass_window(mass: f64, error_tolerance: Tolerance) -> Result<(f64, f64), DecompositionError> {
    let (lower, upper) = error_tolerance.bounds(mass);
    if lower.is_finite() && upper.is_finite() && lower <= upper {
        Ok((lower, upper))
    } else {
        Err(DecompositionError::InvalidTolerance((upper - lower) / 2.0))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parent_mass() {
        let weights = Weights::new([3.0, 5.0, 8.0], 0.1).unwrap();
        let comp = Composition::new(vec![1, 2, 3]);
        assert!((get_parent_mass(&weights, &comp) - 37.0).abs() < 1e-9);
        assert_eq!(get_integer_mass(&weights, &comp), 370);
        assert!((mass_error(&weights, &comp, 36.5) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_parent_mass_survives_gcd() {
        let mut weights = Weights::new([3.0, 5.0, 8.0], 0.1).unwrap();
        let comp = Composition::new(vec![4, 0, 7]);
        let before = get_parent_mass(&weights, &comp);
        assert!(weights.divide_by_gcd());
        assert_eq!(get_parent_mass(&weights, &comp), before);
        assert_eq!(get_integer_mass(&weights, &comp), 68);
    }

    #[test]
    #[should_panic]
    fn test_parent_mass_length_mismatch() {
        let weights = Weights::new([3.0, 5.0], 0.1).unwrap();
        get_parent_mass(&weights, &Composition::new(vec![1, 2, 3]));
    }

    #[test]
    fn test_mass_window() {
        let (lo, hi) = mass_window(1000.0, Tolerance::Da(0.5)).unwrap();
        assert_eq!((lo, hi), (999.5, 1000.5));
        let (lo, hi) = mass_window(1000.0, Tolerance::PPM(10.0)).unwrap();
        assert!((lo - 999.99).abs() < 1e-9);
        assert!((hi - 1000.01).abs() < 1e-9);
        assert!(mass_window(1000.0, Tolerance::Da(-0.5)).is_err());
        assert!(mass_window(f64::NAN, Tolerance::Da(0.5)).is_err());
    }
}
