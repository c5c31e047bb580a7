use std::fmt::Display;
use std::ops::{Deref, Index, IndexMut};

/// The multiplicity of a single alphabet entry in a [`Composition`]
pub type CountType = u32;

/// A multiplicity vector over alphabet indices. Two compositions are equal
/// when every multiplicity matches.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Composition(Vec<CountType>);

/// The compositions satisfying a single query, free of duplicates
pub type Decompositions = Vec<Composition>;

impl Composition {
    pub fn new(counts: Vec<CountType>) -> Self {
        Self(counts)
    }

    /// A composition of `size` zero multiplicities
    pub fn zeros(size: usize) -> Self {
        Self(vec![0; size])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[CountType] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<CountType> {
        self.0
    }

    /// The total number of building blocks in the composition
    pub fn total(&self) -> u64 {
        self.0.iter().map(|c| *c as u64).sum()
    }
}

impl Deref for Composition {
    type Target = [CountType];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Index<usize> for Composition {
    type Output = CountType;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl IndexMut<usize> for Composition {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl From<Vec<CountType>> for Composition {
    fn from(value: Vec<CountType>) -> Self {
        Self::new(value)
    }
}

impl FromIterator<CountType> for Composition {
    fn from_iter<T: IntoIterator<Item = CountType>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Display for Composition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_composition() {
        let mut c = Composition::zeros(3);
        assert_eq!(c.len(), 3);
        assert_eq!(c.total(), 0);
        c[1] = 4;
        c[2] = 1;
        assert_eq!(c.as_slice(), &[0, 4, 1]);
        assert_eq!(c.total(), 5);
        assert_eq!(c, Composition::from(vec![0, 4, 1]));
        assert_eq!(c.to_string(), "[0, 4, 1]");
        let d: Composition = [0, 4, 2].into_iter().collect();
        assert!(c < d);
        assert!(Composition::default().is_empty());
    }
}
