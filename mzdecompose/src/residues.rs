//! Residue class feasibility tables for integer weight alphabets.
//!
//! For an ordered list of weights `a_0, a_1, ..., a_k`, the table stores, for every
//! prefix `a_0..=a_i` and every residue `r` modulo `a_0`, the smallest integer congruent
//! to `r` that is a non-negative integer combination of that prefix. An integer `m` is
//! decomposable over the prefix if and only if `m >= table[i][m mod a_0]`.
//!
//! The table is built with the round robin algorithm of Böcker and Lipták[^1].
//!
//! # References
//! [^1]: Böcker, S., & Lipták, Z. (2007). A Fast and Simple Algorithm for the Money Changing
//!       Problem. Algorithmica, 48(4), 413–432. <https://doi.org/10.1007/s00453-007-0162-8>
use tracing::debug;

use crate::weights::{gcd, WeightType};

/// Marks a residue class with no representable member
pub const INFEASIBLE: WeightType = WeightType::MAX;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidueTable {
    weights: Vec<WeightType>,
    table: Vec<Vec<WeightType>>,
}

impl ResidueTable {
    /// Build the table for `weights` in the given order, using the first weight as
    /// the modulus.
    ///
    /// Returns `None` if `weights` is empty or if any weight is zero.
    pub fn new(weights: Vec<WeightType>) -> Option<Self> {
        let modulus = *weights.first()?;
        if weights.contains(&0) {
            return None;
        }
        let width = modulus as usize;
        let mut current = vec![INFEASIBLE; width];
        current[0] = 0;

        let mut table = Vec::with_capacity(weights.len());
        table.push(current.clone());

        for &w in weights.iter().skip(1) {
            let d = gcd(modulus, w);
            let cycle = modulus / d;
            for p in 0..d {
                let mut n = (p..modulus)
                    .step_by(d as usize)
                    .map(|q| current[q as usize])
                    .min()
                    .unwrap_or(INFEASIBLE);
                if n == INFEASIBLE {
                    continue;
                }
                for _ in 1..cycle {
                    n += w;
                    let r = (n % modulus) as usize;
                    n = n.min(current[r]);
                    current[r] = n;
                }
            }
            table.push(current.clone());
        }
        debug!(
            "Built residue table over {} weights with modulus {}",
            weights.len(),
            modulus
        );
        Some(Self { weights, table })
    }

    /// The number of prefix levels, equal to the number of weights
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// The first weight, which every residue is taken modulo
    #[inline(always)]
    pub fn modulus(&self) -> WeightType {
        self.weights[0]
    }

    #[inline(always)]
    pub fn weight(&self, level: usize) -> WeightType {
        self.weights[level]
    }

    pub fn weights(&self) -> &[WeightType] {
        &self.weights
    }

    /// The smallest integer in residue class `residue` representable with the weights
    /// `0..=level`, if any.
    pub fn minimal_representative(&self, level: usize, residue: WeightType) -> Option<WeightType> {
        let value = self.table[level][(residue % self.modulus()) as usize];
        (value != INFEASIBLE).then_some(value)
    }

    /// Whether `value` is a non-negative integer combination of the weights `0..=level`
    #[inline]
    pub fn is_representable(&self, level: usize, value: WeightType) -> bool {
        value >= self.table[level][(value % self.modulus()) as usize]
    }

    /// Whether any integer in `[lower, upper]` is representable with the weights `0..=level`.
    ///
    /// At most one candidate per residue class is inspected.
    pub fn any_representable(&self, level: usize, lower: WeightType, upper: WeightType) -> bool {
        if lower > upper {
            return false;
        }
        let modulus = self.modulus();
        let row = &self.table[level];
        let last = upper.min(lower.saturating_add(modulus - 1));
        (lower..=last).any(|value| {
            let least = row[(value % modulus) as usize];
            least != INFEASIBLE && value.max(least) <= upper
        })
    }

    /// The largest integer that is not representable by the full set of weights,
    /// if the weights are coprime. Returns `None` if infinitely many integers are
    /// not representable.
    pub fn frobenius_number(&self) -> Option<WeightType> {
        let row = self.table.last()?;
        if row.contains(&INFEASIBLE) {
            return None;
        }
        let largest = row.iter().copied().max().unwrap_or_default();
        Some(largest.saturating_sub(self.modulus()))
    }
}
