/*! Enumeration of all compositions of an alphabet matching a mass */
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use identity_hash::{BuildIdentityHasher, IdentityHashable};
use mzpeaks::Tolerance;
use tracing::{debug, trace, warn};

use crate::composition::{Composition, CountType, Decompositions};
use crate::error::DecompositionError;
use crate::residues::ResidueTable;
use crate::utils::{get_parent_mass, mass_window};
use crate::weights::{WeightType, Weights};

/// The capability to enumerate the compositions of an integer weight alphabet.
///
/// Implementors hold their own snapshot of the [`Weights`] they were built from, so
/// the caller's copy may be changed freely afterwards.
pub trait MassDecomposer {
    /// The weights this decomposer searches over
    fn weights(&self) -> &Weights;

    /// Every composition whose integer mass is exactly `integer_mass`
    fn decompose_integer(&mut self, integer_mass: WeightType) -> Decompositions;

    /// Whether any composition has integer mass `integer_mass`
    fn exists(&mut self, integer_mass: WeightType) -> bool {
        !self.decompose_integer(integer_mass).is_empty()
    }

    /// The number of compositions with integer mass `integer_mass`
    fn count_integer(&mut self, integer_mass: WeightType) -> usize {
        self.decompose_integer(integer_mass).len()
    }

    /// Every composition whose real mass lies within `error_tolerance` of `mass`.
    ///
    /// All integer masses that could hold such a composition are decomposed and each
    /// result is re-checked against the real alphabet masses.
    ///
    /// # Errors
    /// If `error_tolerance` does not describe a valid window around `mass`.
    fn decompose(
        &mut self,
        mass: f64,
        error_tolerance: Tolerance,
    ) -> Result<Decompositions, DecompositionError> {
        let (lower, upper) = mass_window(mass, error_tolerance)?;
        let mut acc = Decompositions::new();
        let Some(range) = self.weights().integer_range(lower, upper) else {
            return Ok(acc);
        };
        for integer_mass in range {
            for comp in self.decompose_integer(integer_mass) {
                let parent_mass = get_parent_mass(self.weights(), &comp);
                if lower <= parent_mass && parent_mass <= upper {
                    acc.push(comp);
                }
            }
        }
        Ok(acc)
    }

    /// The number of compositions [`MassDecomposer::decompose`] would produce
    fn count_decompositions(
        &mut self,
        mass: f64,
        error_tolerance: Tolerance,
    ) -> Result<usize, DecompositionError> {
        self.decompose(mass, error_tolerance).map(|d| d.len())
    }
}

/// The search order for an alphabet: the positions of the non-zero weights, smallest
/// weight first. Zero weights are left out and stay at multiplicity zero.
pub(crate) fn search_order(weights: &Weights) -> Vec<usize> {
    let mut order: Vec<usize> = (0..weights.len())
        .filter(|i| weights.weight(*i) > 0)
        .collect();
    order.sort_by_key(|i| (weights.weight(*i), *i));
    if order.len() != weights.len() {
        warn!(
            "{} zero weight alphabet entries will be held at multiplicity zero",
            weights.len() - order.len()
        );
    }
    order
}

/// The prefix level whose partial solutions are memoized by [`ResidueDecomposer`]
const PREFIX_CACHE_LEVEL: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PrefixKey(WeightType);

impl Hash for PrefixKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_u64(self.0);
    }
}

impl IdentityHashable for PrefixKey {}

/// Partial solutions over the weights `0..=PREFIX_CACHE_LEVEL`, stored flat with one
/// multiplicity per prefix weight, keyed by the integer mass they sum to.
type PrefixCache = HashMap<PrefixKey, Arc<[CountType]>, BuildIdentityHasher<PrefixKey>>;

#[derive(Debug, Clone, Copy)]
struct Frame {
    level: usize,
    remaining: WeightType,
    count: CountType,
}

/// Visit every solution of `value` over the weights `0..=top` of `residues`, passing the
/// multiplicities in search order to `emit`.
///
/// The search walks the levels from `top` downwards with an explicit stack, taking
/// every multiplicity at a level whose remainder is still representable by the levels
/// below it, so every branch it enters ends in at least one solution.
fn search_exact<F: FnMut(&[CountType])>(
    residues: &ResidueTable,
    top: usize,
    value: WeightType,
    mut cache: Option<&mut PrefixCache>,
    emit: &mut F,
) {
    if !residues.is_representable(top, value) {
        return;
    }
    let mut counts: Vec<CountType> = vec![0; top + 1];
    if top == 0 {
        counts[0] = (value / residues.modulus()) as CountType;
        emit(&counts);
        return;
    }

    let mut stack = vec![Frame {
        level: top,
        remaining: value,
        count: 0,
    }];

    while let Some(frame) = stack.last_mut() {
        let level = frame.level;
        let used = frame.count as WeightType * residues.weight(level);
        if used > frame.remaining {
            stack.pop();
            continue;
        }
        counts[level] = frame.count;
        frame.count += 1;
        let rest = frame.remaining - used;
        let below = level - 1;

        if !residues.is_representable(below, rest) {
            continue;
        }
        if below == 0 {
            counts[0] = (rest / residues.modulus()) as CountType;
            emit(&counts);
            continue;
        }
        if below == PREFIX_CACHE_LEVEL {
            if let Some(cache) = cache.as_deref_mut() {
                let prefixes = prefix_solutions(residues, cache, rest);
                for prefix in prefixes.chunks_exact(PREFIX_CACHE_LEVEL + 1) {
                    counts[..=PREFIX_CACHE_LEVEL].copy_from_slice(prefix);
                    emit(&counts);
                }
                continue;
            }
        }
        stack.push(Frame {
            level: below,
            remaining: rest,
            count: 0,
        });
    }
}

fn prefix_solutions(
    residues: &ResidueTable,
    cache: &mut PrefixCache,
    value: WeightType,
) -> Arc<[CountType]> {
    cache
        .entry(PrefixKey(value))
        .or_insert_with(|| {
            let mut flat = Vec::new();
            search_exact(residues, PREFIX_CACHE_LEVEL, value, None, &mut |counts| {
                flat.extend_from_slice(counts)
            });
            flat.into()
        })
        .clone()
}

/// Walk down from `top` taking the smallest feasible multiplicity at each level
fn search_first(residues: &ResidueTable, value: WeightType) -> Option<Vec<CountType>> {
    let top = residues.len() - 1;
    if !residues.is_representable(top, value) {
        return None;
    }
    let mut counts = vec![0; residues.len()];
    let mut remaining = value;
    for level in (1..=top).rev() {
        let weight = residues.weight(level);
        let mut count = 0;
        while !residues.is_representable(level - 1, remaining) {
            remaining -= weight;
            count += 1;
        }
        counts[level] = count;
    }
    counts[0] = (remaining / residues.modulus()) as CountType;
    Some(counts)
}

/// A decomposer that prunes its search with a [`ResidueTable`] over the alphabet
/// sorted by increasing weight.
///
/// Every integer mass is first checked for feasibility against the full table, and
/// each branch of the search is only entered if its remainder can still be completed.
/// Partial solutions over the two smallest weights are memoized and shared across
/// queries for the lifetime of the instance.
///
/// # Memory
/// The memo is never evicted and grows with every distinct remainder visited, so a
/// long-lived instance serving many unrelated queries should call
/// [`ResidueDecomposer::clear_cache`] periodically.
///
/// The decomposer holds a copy of the [`Weights`] it was built from.
#[derive(Debug, Clone)]
pub struct ResidueDecomposer {
    weights: Weights,
    order: Vec<usize>,
    residues: Option<ResidueTable>,
    cache: PrefixCache,
}

impl From<Weights> for ResidueDecomposer {
    fn from(weights: Weights) -> Self {
        let order = search_order(&weights);
        let residues = ResidueTable::new(order.iter().map(|i| weights.weight(*i)).collect());
        debug!(
            "Created residue decomposer over {} weights at precision {}",
            weights.len(),
            weights.precision()
        );
        Self {
            weights,
            order,
            residues,
            cache: PrefixCache::default(),
        }
    }
}

impl ResidueDecomposer {
    pub fn new(weights: &Weights) -> Self {
        weights.clone().into()
    }

    /// The feasibility table, or `None` if the alphabet has no non-zero weights
    pub fn residues(&self) -> Option<&ResidueTable> {
        self.residues.as_ref()
    }

    /// The number of memoized partial solution lists
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Drop all memoized partial solutions
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Map multiplicities in search order back onto the caller's alphabet order
    fn reorder(&self, counts: &[CountType]) -> Composition {
        let mut comp = Composition::zeros(self.weights.len());
        for (count, index) in counts.iter().zip(self.order.iter()) {
            comp[*index] = *count;
        }
        comp
    }

    /// The composition in alphabet order, if its real mass lies in `[lower, upper]`
    fn accept(&self, counts: &[CountType], lower: f64, upper: f64) -> Option<Composition> {
        let comp = self.reorder(counts);
        let parent_mass = get_parent_mass(&self.weights, &comp);
        (lower <= parent_mass && parent_mass <= upper).then_some(comp)
    }

    fn visit_integer<F: FnMut(&[CountType])>(&mut self, integer_mass: WeightType, emit: &mut F) {
        match self.residues.as_ref() {
            Some(residues) => {
                let top = residues.len() - 1;
                search_exact(residues, top, integer_mass, Some(&mut self.cache), emit);
            }
            None => {
                if integer_mass == 0 {
                    emit(&[]);
                }
            }
        }
    }

    /// A single composition with integer mass `integer_mass`, if one exists
    pub fn first_decomposition(&self, integer_mass: WeightType) -> Option<Composition> {
        match self.residues.as_ref() {
            Some(residues) => {
                search_first(residues, integer_mass).map(|counts| self.reorder(&counts))
            }
            None => (integer_mass == 0).then(|| Composition::zeros(self.weights.len())),
        }
    }

    /// Decompose every feasible integer mass in the window on the rayon thread pool.
    ///
    /// Only the immutable residue table is shared between tasks, so the memoized
    /// partial solutions are neither read nor written.
    #[cfg(feature = "parallel")]
    pub fn decompose_parallel(
        &self,
        mass: f64,
        error_tolerance: Tolerance,
    ) -> Result<Decompositions, DecompositionError> {
        use rayon::prelude::*;

        let (lower, upper) = mass_window(mass, error_tolerance)?;
        let Some(range) = self.weights.integer_range(lower, upper) else {
            return Ok(Decompositions::new());
        };
        let Some(residues) = self.residues.as_ref() else {
            let empty = Composition::zeros(self.weights.len());
            return Ok(if range.contains(&0) && lower <= 0.0 && 0.0 <= upper {
                vec![empty]
            } else {
                Decompositions::new()
            });
        };
        let top = residues.len() - 1;
        let acc = range
            .into_par_iter()
            .filter(|v| residues.is_representable(top, *v))
            .flat_map_iter(|integer_mass| {
                let mut found = Decompositions::new();
                search_exact(residues, top, integer_mass, None, &mut |counts| {
                    found.extend(self.accept(counts, lower, upper));
                });
                found
            })
            .collect();
        Ok(acc)
    }
}

impl MassDecomposer for ResidueDecomposer {
    fn weights(&self) -> &Weights {
        &self.weights
    }

    fn decompose_integer(&mut self, integer_mass: WeightType) -> Decompositions {
        let mut found = Vec::new();
        self.visit_integer(integer_mass, &mut |counts| found.push(counts.to_vec()));
        found.iter().map(|counts| self.reorder(counts)).collect()
    }

    fn exists(&mut self, integer_mass: WeightType) -> bool {
        match self.residues.as_ref() {
            Some(residues) => residues.is_representable(residues.len() - 1, integer_mass),
            None => integer_mass == 0,
        }
    }

    fn count_integer(&mut self, integer_mass: WeightType) -> usize {
        let mut n = 0;
        self.visit_integer(integer_mass, &mut |_| n += 1);
        n
    }

    #[tracing::instrument(skip_all, level = "trace")]
    fn decompose(
        &mut self,
        mass: f64,
        error_tolerance: Tolerance,
    ) -> Result<Decompositions, DecompositionError> {
        let (lower, upper) = mass_window(mass, error_tolerance)?;
        let mut acc = Decompositions::new();
        let Some(range) = self.weights.integer_range(lower, upper) else {
            return Ok(acc);
        };
        trace!("Decomposing {mass} over integer masses {range:?}");
        let mut hits = Vec::new();
        for integer_mass in range {
            self.visit_integer(integer_mass, &mut |counts| hits.push(counts.to_vec()));
            for counts in hits.drain(..) {
                acc.extend(self.accept(&counts, lower, upper));
            }
        }
        trace!("Found {} decompositions of {mass}", acc.len());
        Ok(acc)
    }

    fn count_decompositions(
        &mut self,
        mass: f64,
        error_tolerance: Tolerance,
    ) -> Result<usize, DecompositionError> {
        let (lower, upper) = mass_window(mass, error_tolerance)?;
        let Some(range) = self.weights.integer_range(lower, upper) else {
            return Ok(0);
        };
        let masses = self.weights.masses().to_vec();
        let order = self.order.clone();
        // multiplicities in alphabet order, summed the same way as `get_parent_mass`
        let mut scratch: Vec<CountType> = vec![0; masses.len()];
        let mut n = 0;
        for integer_mass in range {
            self.visit_integer(integer_mass, &mut |counts| {
                for (c, i) in counts.iter().zip(order.iter()) {
                    scratch[*i] = *c;
                }
                let parent_mass: f64 = masses
                    .iter()
                    .zip(scratch.iter())
                    .map(|(m, c)| *m * *c as f64)
                    .sum();
                if lower <= parent_mass && parent_mass <= upper {
                    n += 1;
                }
            });
        }
        Ok(n)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MemoKey {
    level: u32,
    remaining: WeightType,
}

impl Hash for MemoKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_u64(self.remaining.rotate_left(8) ^ self.level as u64);
    }
}

impl IdentityHashable for MemoKey {}

type SolutionList = Arc<[Box<[CountType]>]>;

/// A plain backtracking decomposer without residue pruning.
///
/// Each sub-problem "decompose `remaining` using the first `level + 1` non-zero weights"
/// is solved once and memoized for the lifetime of the instance, so queries sharing
/// sub-sums reuse each other's work. It is exhaustive and simple enough to serve as a
/// reference for [`ResidueDecomposer`], but it allocates every partial solution.
#[derive(Debug, Clone)]
pub struct RecursiveDecomposer {
    weights: Weights,
    order: Vec<usize>,
    memo: HashMap<MemoKey, SolutionList, BuildIdentityHasher<MemoKey>>,
}

impl From<Weights> for RecursiveDecomposer {
    fn from(weights: Weights) -> Self {
        let order = search_order(&weights);
        Self {
            weights,
            order,
            memo: HashMap::default(),
        }
    }
}

impl RecursiveDecomposer {
    pub fn new(weights: &Weights) -> Self {
        weights.clone().into()
    }

    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }

    fn solve(&mut self, level: usize, remaining: WeightType) -> SolutionList {
        let key = MemoKey {
            level: level as u32,
            remaining,
        };
        if let Some(hit) = self.memo.get(&key) {
            return hit.clone();
        }
        let weight = self.weights.weight(self.order[level]);
        let solutions: SolutionList = if level == 0 {
            if remaining % weight == 0 {
                let single: Box<[CountType]> = Box::new([(remaining / weight) as CountType]);
                Arc::from(vec![single])
            } else {
                Arc::from(Vec::new())
            }
        } else {
            let mut acc = Vec::new();
            let mut count: CountType = 0;
            let mut used: WeightType = 0;
            while used <= remaining {
                for sub in self.solve(level - 1, remaining - used).iter() {
                    let mut counts = Vec::with_capacity(level + 1);
                    counts.extend_from_slice(sub);
                    counts.push(count);
                    acc.push(counts.into_boxed_slice());
                }
                count += 1;
                used += weight;
            }
            Arc::from(acc)
        };
        self.memo.insert(key, solutions.clone());
        solutions
    }
}

impl MassDecomposer for RecursiveDecomposer {
    fn weights(&self) -> &Weights {
        &self.weights
    }

    fn decompose_integer(&mut self, integer_mass: WeightType) -> Decompositions {
        if self.order.is_empty() {
            return if integer_mass == 0 {
                vec![Composition::zeros(self.weights.len())]
            } else {
                Decompositions::new()
            };
        }
        let top = self.order.len() - 1;
        self.solve(top, integer_mass)
            .iter()
            .map(|counts| {
                let mut comp = Composition::zeros(self.weights.len());
                for (count, index) in counts.iter().zip(self.order.iter()) {
                    comp[*index] = *count;
                }
                comp
            })
            .collect()
    }
}
