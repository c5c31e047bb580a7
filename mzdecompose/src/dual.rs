//! Decomposition against two index-aligned alphabets at once.
//!
//! A composition is accepted only when its mass under the first alphabet falls in
//! the first window and its mass under the second alphabet falls in the second window.
use std::collections::HashSet;

use mzpeaks::Tolerance;
use tracing::{debug, trace, warn};

use crate::composition::{Composition, CountType, Decompositions};
use crate::decomposer::{MassDecomposer, ResidueDecomposer};
use crate::error::DecompositionError;
use crate::residues::ResidueTable;
use crate::utils::{get_parent_mass, mass_window};
use crate::weights::{WeightType, Weights};

#[derive(Debug, Clone, Copy)]
struct Frame {
    level: usize,
    remaining: WeightType,
    second_sum: WeightType,
    count: CountType,
}

/// The integer and real windows a dual query is bounded by
#[derive(Debug, Clone, Copy)]
struct Windows {
    first: (f64, f64),
    second: (f64, f64),
    second_lower: WeightType,
    second_upper: WeightType,
}

/// Searches the joint composition space of two alphabets of equal cardinality.
///
/// The search runs over the entries whose weight is non-zero in both alphabets,
/// ordered by increasing first weight. Each branch carries the running integer sum
/// under both alphabets and is cut when the first alphabet's residue table says the
/// exact first remainder cannot be completed, or when the second alphabet's residue
/// table says no completion lands in the second window. Entries with a zero weight in
/// either alphabet are held at multiplicity zero.
#[derive(Debug, Clone)]
pub struct DualMassDecomposer {
    first: Weights,
    second: Weights,
    order: Vec<usize>,
    first_residues: Option<ResidueTable>,
    second_residues: Option<ResidueTable>,
}

impl DualMassDecomposer {
    /// # Errors
    /// If `first` and `second` do not have the same number of entries.
    pub fn new(first: &Weights, second: &Weights) -> Result<Self, DecompositionError> {
        if first.len() != second.len() {
            return Err(DecompositionError::CardinalityMismatch(
                first.len(),
                second.len(),
            ));
        }
        let mut order: Vec<usize> = (0..first.len())
            .filter(|i| first.weight(*i) > 0 && second.weight(*i) > 0)
            .collect();
        order.sort_by_key(|i| (first.weight(*i), *i));
        if order.len() != first.len() {
            warn!(
                "{} alphabet entries have a zero weight in at least one alphabet and will be held at multiplicity zero",
                first.len() - order.len()
            );
        }
        let first_residues = ResidueTable::new(order.iter().map(|i| first.weight(*i)).collect());
        let second_residues =
            ResidueTable::new(order.iter().map(|i| second.weight(*i)).collect());
        debug!(
            "Created dual decomposer over {} entries, {} searchable",
            first.len(),
            order.len()
        );
        Ok(Self {
            first: first.clone(),
            second: second.clone(),
            order,
            first_residues,
            second_residues,
        })
    }

    pub fn first_weights(&self) -> &Weights {
        &self.first
    }

    pub fn second_weights(&self) -> &Weights {
        &self.second
    }

    pub fn len(&self) -> usize {
        self.first.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_empty()
    }

    fn reorder(&self, counts: &[CountType]) -> Composition {
        let mut comp = Composition::zeros(self.first.len());
        for (count, index) in counts.iter().zip(self.order.iter()) {
            comp[*index] = *count;
        }
        comp
    }

    fn accepts(&self, counts: &[CountType], windows: &Windows) -> bool {
        let comp = self.reorder(counts);
        let first_mass = get_parent_mass(&self.first, &comp);
        let second_mass = get_parent_mass(&self.second, &comp);
        windows.first.0 <= first_mass
            && first_mass <= windows.first.1
            && windows.second.0 <= second_mass
            && second_mass <= windows.second.1
    }

    /// Solve the bottom level directly: the first remainder fixes its multiplicity
    fn close<F: FnMut(&[CountType])>(
        &self,
        counts: &mut [CountType],
        rest: WeightType,
        second_sum: WeightType,
        windows: &Windows,
        emit: &mut F,
    ) {
        let first_weight = self.first.weight(self.order[0]);
        if rest % first_weight != 0 {
            return;
        }
        let count = rest / first_weight;
        let total = second_sum + count * self.second.weight(self.order[0]);
        if total < windows.second_lower || total > windows.second_upper {
            return;
        }
        counts[0] = count as CountType;
        if self.accepts(counts, windows) {
            emit(counts);
        }
    }

    fn search<F: FnMut(&[CountType])>(
        &self,
        first_residues: &ResidueTable,
        second_residues: &ResidueTable,
        value: WeightType,
        windows: &Windows,
        emit: &mut F,
    ) {
        let top = self.order.len() - 1;
        let mut counts: Vec<CountType> = vec![0; self.order.len()];
        if top == 0 {
            self.close(&mut counts, value, 0, windows, emit);
            return;
        }
        let mut stack = vec![Frame {
            level: top,
            remaining: value,
            second_sum: 0,
            count: 0,
        }];
        while let Some(frame) = stack.last_mut() {
            let level = frame.level;
            let used = frame.count as WeightType * first_residues.weight(level);
            let second_sum =
                frame.second_sum + frame.count as WeightType * second_residues.weight(level);
            if used > frame.remaining || second_sum > windows.second_upper {
                stack.pop();
                continue;
            }
            counts[level] = frame.count;
            frame.count += 1;
            let rest = frame.remaining - used;
            let below = level - 1;

            if !first_residues.is_representable(below, rest) {
                continue;
            }
            if !second_residues.any_representable(
                below,
                windows.second_lower.saturating_sub(second_sum),
                windows.second_upper - second_sum,
            ) {
                continue;
            }
            if below == 0 {
                self.close(&mut counts, rest, second_sum, windows, emit);
                continue;
            }
            stack.push(Frame {
                level: below,
                remaining: rest,
                second_sum,
                count: 0,
            });
        }
    }

    fn visit<F: FnMut(&[CountType])>(
        &self,
        first_mass: f64,
        first_tolerance: Tolerance,
        second_mass: f64,
        second_tolerance: Tolerance,
        emit: &mut F,
    ) -> Result<(), DecompositionError> {
        let first_window = mass_window(first_mass, first_tolerance)?;
        let second_window = mass_window(second_mass, second_tolerance)?;
        let (Some(first_range), Some(second_range)) = (
            self.first.integer_range(first_window.0, first_window.1),
            self.second.integer_range(second_window.0, second_window.1),
        ) else {
            return Ok(());
        };
        let windows = Windows {
            first: first_window,
            second: second_window,
            second_lower: *second_range.start(),
            second_upper: *second_range.end(),
        };
        trace!("Searching first integer masses {first_range:?} and second integer masses {second_range:?}");

        let (Some(first_residues), Some(second_residues)) =
            (self.first_residues.as_ref(), self.second_residues.as_ref())
        else {
            if first_range.contains(&0) && second_range.contains(&0) && self.accepts(&[], &windows)
            {
                emit(&[]);
            }
            return Ok(());
        };
        let top = first_residues.len() - 1;
        for value in first_range {
            if !first_residues.is_representable(top, value) {
                continue;
            }
            self.search(first_residues, second_residues, value, &windows, emit);
        }
        Ok(())
    }

    /// Every composition whose mass under the first alphabet is within `first_tolerance`
    /// of `first_mass` and whose mass under the second alphabet is within
    /// `second_tolerance` of `second_mass`.
    ///
    /// # Errors
    /// If either tolerance does not describe a valid window around its mass.
    #[tracing::instrument(skip_all, level = "trace")]
    pub fn decompose(
        &self,
        first_mass: f64,
        first_tolerance: Tolerance,
        second_mass: f64,
        second_tolerance: Tolerance,
    ) -> Result<Decompositions, DecompositionError> {
        let mut found = Vec::new();
        self.visit(
            first_mass,
            first_tolerance,
            second_mass,
            second_tolerance,
            &mut |counts| found.push(counts.to_vec()),
        )?;
        let acc: Decompositions = found.iter().map(|counts| self.reorder(counts)).collect();
        trace!("Found {} dual decompositions", acc.len());
        Ok(acc)
    }

    pub fn count_decompositions(
        &self,
        first_mass: f64,
        first_tolerance: Tolerance,
        second_mass: f64,
        second_tolerance: Tolerance,
    ) -> Result<usize, DecompositionError> {
        let mut n = 0;
        self.visit(
            first_mass,
            first_tolerance,
            second_mass,
            second_tolerance,
            &mut |_| n += 1,
        )?;
        Ok(n)
    }

    /// The same query as [`DualMassDecomposer::decompose`], answered by decomposing each
    /// window independently and keeping the compositions found by both. Results come
    /// in the first search's order.
    pub fn decompose_by_intersection(
        &self,
        first_mass: f64,
        first_tolerance: Tolerance,
        second_mass: f64,
        second_tolerance: Tolerance,
    ) -> Result<Decompositions, DecompositionError> {
        let mut first = ResidueDecomposer::new(&self.first);
        let mut second = ResidueDecomposer::new(&self.second);
        let second_hits: HashSet<Composition> = second
            .decompose(second_mass, second_tolerance)?
            .into_iter()
            .collect();
        if second_hits.is_empty() {
            return Ok(Decompositions::new());
        }
        let acc = first
            .decompose(first_mass, first_tolerance)?
            .into_iter()
            .filter(|comp| second_hits.contains(comp))
            .collect();
        Ok(acc)
    }
}
