use ndarray::Axis;
use rand::seq::SliceRandom;

use super::{check_target_neighbors, LmnnFunction};
use crate::constraints::Constraints;
use crate::error::{LmnnError, Result};
use crate::math::{inverse_permutation, permute_columns};
use crate::metric::Metric;

impl<M: Metric, C: Constraints> LmnnFunction<M, C> {
    /// Reorder the points by a random permutation drawn from the instance's
    /// generator.
    pub fn shuffle(&mut self) -> Result<()> {
        let mut ordering: Vec<usize> = (0..self.points()).collect();
        ordering.shuffle(&mut self.rng);
        self.permute(&ordering)
    }

    /// Reorder the points so that new point `p` is old point `ordering[p]`.
    ///
    /// Everything indexed by point moves along: dataset, labels, cached
    /// triplet values, stamps, norms and impostor slots (whose stored
    /// indices are rewritten to the new positions). Target neighbors are
    /// then recomputed, and cache entries of every target slot whose
    /// neighbor changed are invalidated.
    pub fn permute(&mut self, ordering: &[usize]) -> Result<()> {
        let n = self.points();
        if !is_permutation(ordering, n) {
            return Err(LmnnError::InvalidPermutation { points: n });
        }
        let inverse = inverse_permutation(ordering);

        let dataset = permute_columns(&self.dataset, ordering);
        let labels = self.labels.select(Axis(0), ordering);
        self.constraints.invalidate();
        let target_neighbors = self
            .constraints
            .target_neighbors(dataset.view(), labels.view())?;
        check_target_neighbors(&target_neighbors, self.k, n)?;

        let previous = permute_columns(&self.target_neighbors, ordering).mapv(|old| inverse[old]);

        self.dataset = dataset;
        self.labels = labels;
        self.transformed = permute_columns(&self.transformed, ordering);
        self.max_impostor_norm = permute_columns(&self.max_impostor_norm, ordering);
        self.eval_cache.permute(ordering);
        if let Some(stamps) = self.point_stamps.as_mut() {
            stamps.permute(ordering);
        }
        self.impostors.permute(ordering, &inverse);

        let mut changed = 0;
        for ((j, i), &target) in target_neighbors.indexed_iter() {
            if target != previous[[j, i]] {
                self.eval_cache.clear_target(j, i);
                changed += 1;
            }
        }
        self.target_neighbors = target_neighbors;
        self.precalculate();

        log::info!(
            "Reordered {} points, {} target neighbor slots changed",
            n,
            changed
        );
        Ok(())
    }
}

fn is_permutation(ordering: &[usize], n: usize) -> bool {
    if ordering.len() != n {
        return false;
    }
    let mut seen = vec![false; n];
    for &old in ordering {
        if old >= n || seen[old] {
            return false;
        }
        seen[old] = true;
    }
    true
}
