//! Named building blocks and their masses, with a few commonly used alphabets built in.
use std::slice;

use chemical_elements::{ChemicalComposition, ElementSpecification};
use itertools::Itertools;

use crate::composition::Composition;
use crate::error::DecompositionError;
use crate::weights::Weights;

/// A single named building block
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AlphabetEntry {
    pub name: String,
    pub mass: f64,
}

impl AlphabetEntry {
    pub fn new(name: impl Into<String>, mass: f64) -> Self {
        Self {
            name: name.into(),
            mass,
        }
    }
}

/// An ordered list of named masses. The position of an entry is its index in every
/// [`Weights`] and [`Composition`] derived from the alphabet.
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Alphabet {
    entries: Vec<AlphabetEntry>,
}

/// The monoisotopic residue masses of the twenty standard amino acids
const AMINO_ACIDS: [(&str, f64); 20] = [
    ("G", 57.02146),
    ("A", 71.03711),
    ("S", 87.03203),
    ("P", 97.05276),
    ("V", 99.06841),
    ("T", 101.04768),
    ("C", 103.00919),
    ("L", 113.08406),
    ("I", 113.08406),
    ("N", 114.04293),
    ("D", 115.02694),
    ("Q", 128.05858),
    ("K", 128.09496),
    ("E", 129.04259),
    ("M", 131.04049),
    ("H", 137.05891),
    ("F", 147.06841),
    ("R", 156.10111),
    ("Y", 163.06333),
    ("W", 186.07931),
];

/// The monoisotopic masses of the DNA nucleotide monophosphate residues
const NUCLEOTIDES: [(&str, f64); 4] = [
    ("dA", 313.05761),
    ("dC", 289.04637),
    ("dG", 329.05252),
    ("dT", 304.04604),
];

const ORGANIC_ELEMENTS: [&str; 6] = ["C", "H", "N", "O", "P", "S"];

/// The monoisotopic mass of an elemental formula given as `(symbol, count)` pairs
pub fn formula_mass(formula: &[(&str, i32)]) -> Result<f64, DecompositionError> {
    let mut composition = ChemicalComposition::new();
    for (symbol, count) in formula {
        let element = ElementSpecification::parse(symbol)
            .map_err(|_| DecompositionError::UnknownElement(symbol.to_string()))?;
        composition.set(element, *count);
    }
    Ok(composition.mass())
}

impl Alphabet {
    pub fn new(entries: Vec<AlphabetEntry>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, name: impl Into<String>, mass: f64) {
        self.entries.push(AlphabetEntry::new(name, mass));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, AlphabetEntry> {
        self.entries.iter()
    }

    pub fn get(&self, index: usize) -> Option<&AlphabetEntry> {
        self.entries.get(index)
    }

    /// # Panics
    /// If `index` is out of bounds.
    pub fn name(&self, index: usize) -> &str {
        &self.entries[index].name
    }

    /// # Panics
    /// If `index` is out of bounds.
    pub fn mass(&self, index: usize) -> f64 {
        self.entries[index].mass
    }

    pub fn masses(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.mass).collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    /// Order the entries by increasing mass, keeping ties in their current order
    pub fn sort_by_mass(&mut self) {
        self.entries.sort_by(|a, b| a.mass.total_cmp(&b.mass));
    }

    /// Discretize the alphabet's masses at `precision`
    pub fn to_weights(&self, precision: f64) -> Result<Weights, DecompositionError> {
        Weights::new(self.entries.iter().map(|e| e.mass), precision)
    }

    /// Render `composition` as concatenated name and count pairs, e.g. `G2A1`,
    /// omitting entries with a count of zero.
    ///
    /// # Panics
    /// If `composition` does not have one multiplicity per alphabet entry.
    pub fn format_composition(&self, composition: &Composition) -> String {
        self.entries
            .iter()
            .zip_eq(composition.iter())
            .filter(|(_, c)| **c > 0)
            .map(|(entry, count)| format!("{}{}", entry.name, count))
            .collect()
    }

    /// Build an alphabet from named elemental formulas.
    ///
    /// # Errors
    /// If any formula names an element that is not in the periodic table.
    pub fn from_formulas<'a, I, S>(formulas: I) -> Result<Self, DecompositionError>
    where
        I: IntoIterator<Item = (S, &'a [(&'a str, i32)])>,
        S: Into<String>,
    {
        formulas
            .into_iter()
            .map(|(name, formula)| formula_mass(formula).map(|m| AlphabetEntry::new(name, m)))
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    /// Build an alphabet of single elements, using the mass of each element's most
    /// abundant isotope.
    pub fn from_elements<'a, I: IntoIterator<Item = &'a str>>(
        symbols: I,
    ) -> Result<Self, DecompositionError> {
        symbols
            .into_iter()
            .map(|symbol| {
                ElementSpecification::parse(symbol)
                    .map(|spec| AlphabetEntry::new(symbol, spec.element.most_abundant_mass))
                    .map_err(|_| DecompositionError::UnknownElement(symbol.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    /// The twenty standard amino acid residues
    pub fn amino_acids() -> Self {
        AMINO_ACIDS
            .iter()
            .map(|(name, mass)| AlphabetEntry::new(*name, *mass))
            .collect()
    }

    /// The four DNA nucleotide residues
    pub fn nucleotides() -> Self {
        NUCLEOTIDES
            .iter()
            .map(|(name, mass)| AlphabetEntry::new(*name, *mass))
            .collect()
    }

    /// Carbon, hydrogen, nitrogen, oxygen, phosphorus and sulfur
    pub fn elements() -> Self {
        Self::from_elements(ORGANIC_ELEMENTS).expect("Failed to look up organic element")
    }
}

impl FromIterator<AlphabetEntry> for Alphabet {
    fn from_iter<T: IntoIterator<Item = AlphabetEntry>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Extend<AlphabetEntry> for Alphabet {
    fn extend<T: IntoIterator<Item = AlphabetEntry>>(&mut self, iter: T) {
        self.entries.extend(iter)
    }
}

impl<'a> IntoIterator for &'a Alphabet {
    type Item = &'a AlphabetEntry;
    type IntoIter = slice::Iter<'a, AlphabetEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
