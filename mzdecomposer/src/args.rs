use std::fmt::Display;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use mzdecompose::{
    Alphabet, DecompositionError, Decompositions, MassDecomposer, RecursiveDecomposer,
    ResidueDecomposer, WeightType, Weights,
};
use mzpeaks::Tolerance;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArgAlphabet {
    #[default]
    /// The twenty standard amino acid residues
    Peptide,
    /// Carbon, hydrogen, nitrogen, oxygen, phosphorus and sulfur
    Elements,
    /// The four DNA nucleotide residues
    Nucleotides,
}

impl From<ArgAlphabet> for Alphabet {
    fn from(value: ArgAlphabet) -> Self {
        match value {
            ArgAlphabet::Peptide => Alphabet::amino_acids(),
            ArgAlphabet::Elements => Alphabet::elements(),
            ArgAlphabet::Nucleotides => Alphabet::nucleotides(),
        }
    }
}

impl Display for ArgAlphabet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArgMethod {
    #[default]
    /// Residue table pruned search
    Residue,
    /// Plain memoized backtracking, much slower on large alphabets
    Recursive,
}

impl Display for ArgMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    /// Tab separated values with a header line
    Tsv,
    /// One JSON object per line
    Json,
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The decomposer selected by [`ArgMethod`], built once and cloned into each worker
#[derive(Debug, Clone)]
pub enum Engine {
    Residue(ResidueDecomposer),
    Recursive(RecursiveDecomposer),
}

impl Engine {
    pub fn new(method: ArgMethod, weights: &Weights) -> Self {
        match method {
            ArgMethod::Residue => Self::Residue(ResidueDecomposer::new(weights)),
            ArgMethod::Recursive => Self::Recursive(RecursiveDecomposer::new(weights)),
        }
    }
}

impl MassDecomposer for Engine {
    fn weights(&self) -> &Weights {
        match self {
            Engine::Residue(d) => d.weights(),
            Engine::Recursive(d) => d.weights(),
        }
    }

    fn decompose_integer(&mut self, integer_mass: WeightType) -> Decompositions {
        match self {
            Engine::Residue(d) => d.decompose_integer(integer_mass),
            Engine::Recursive(d) => d.decompose_integer(integer_mass),
        }
    }

    fn decompose(
        &mut self,
        mass: f64,
        error_tolerance: Tolerance,
    ) -> Result<Decompositions, DecompositionError> {
        match self {
            Engine::Residue(d) => d.decompose(mass, error_tolerance),
            Engine::Recursive(d) => d.decompose(mass, error_tolerance),
        }
    }

    fn count_decompositions(
        &mut self,
        mass: f64,
        error_tolerance: Tolerance,
    ) -> Result<usize, DecompositionError> {
        match self {
            Engine::Residue(d) => d.count_decompositions(mass, error_tolerance),
            Engine::Recursive(d) => d.count_decompositions(mass, error_tolerance),
        }
    }
}

pub fn non_negative_float(s: &str) -> Result<f64, String> {
    let value = s.parse::<f64>().map_err(|e| e.to_string())?;
    if value < 0.0 {
        Err(format!("`{s}` is less than zero"))
    } else {
        Ok(value)
    }
}

pub fn positive_float(s: &str) -> Result<f64, String> {
    let value = s.parse::<f64>().map_err(|e| e.to_string())?;
    if value <= 0.0 || !value.is_finite() {
        Err(format!("`{s}` is not a finite number greater than zero"))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_value_parsers() {
        assert_eq!(non_negative_float("0.5"), Ok(0.5));
        assert_eq!(non_negative_float("0"), Ok(0.0));
        assert!(non_negative_float("-1").is_err());
        assert!(non_negative_float("a").is_err());
        assert!(positive_float("0").is_err());
        assert_eq!(positive_float("0.001"), Ok(0.001));
    }

    #[test]
    fn test_engines_agree() {
        let weights = Alphabet::amino_acids().to_weights(0.1).unwrap();
        let mut residue = Engine::new(ArgMethod::Residue, &weights);
        let mut recursive = Engine::new(ArgMethod::Recursive, &weights);
        let mut a = residue.decompose(312.143, Tolerance::Da(0.02)).unwrap();
        let mut b = recursive.decompose(312.143, Tolerance::Da(0.02)).unwrap();
        a.sort();
        b.sort();
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn test_serde_names() {
        let value: ArgAlphabet = serde_json::from_str("\"nucleotides\"").unwrap();
        assert_eq!(value, ArgAlphabet::Nucleotides);
        assert_eq!(
            serde_json::to_string(&OutputFormat::Json).unwrap(),
            "\"json\""
        );
    }
}
