use thiserror::Error;

/// An error that might occur while building weights or issuing a decomposition query
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecompositionError {
    #[error("The discretization precision must be a finite, positive number, got {0}")]
    InvalidPrecision(f64),
    #[error("The alphabet mass at index {index} must be a finite, non-negative number, got {mass}")]
    InvalidMass { index: usize, mass: f64 },
    #[error("Dual-target alphabets must have the same number of entries, got {0} and {1}")]
    CardinalityMismatch(usize, usize),
    #[error("The error tolerance must describe a finite, non-negative window, got a half-width of {0}")]
    InvalidTolerance(f64),
    #[error("Unknown element symbol {0:?}")]
    UnknownElement(String),
}
