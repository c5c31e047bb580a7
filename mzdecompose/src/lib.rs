//! Decompose a real mass into every combination of alphabet building blocks whose
//! summed mass falls inside an error window.
//!
//! Masses are discretized into integer [`Weights`](weights::Weights), candidate integer
//! masses are enumerated with a residue-table pruned search and each candidate composition
//! is re-checked against the original real masses.
pub mod alphabet;
pub mod composition;
pub mod decomposer;
pub mod dual;
pub mod error;
pub mod residues;
pub mod utils;
pub mod weights;

pub use crate::alphabet::{Alphabet, AlphabetEntry};
pub use crate::composition::{Composition, CountType, Decompositions};
pub use crate::decomposer::{MassDecomposer, RecursiveDecomposer, ResidueDecomposer};
pub use crate::dual::DualMassDecomposer;
pub use crate::error::DecompositionError;
pub use crate::utils::{get_integer_mass, get_parent_mass, mass_error};
pub use crate::weights::{WeightType, Weights};

pub use mzpeaks::Tolerance;
