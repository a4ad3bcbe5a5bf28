//! Target-neighbor and impostor selection.
//!
//! The objective never searches for neighbors itself; it consults a
//! [`Constraints`] provider once for target neighbors (and again after a
//! shuffle) and periodically for impostors. [`KnnConstraints`] is the
//! reference provider: exact brute-force search over a class partition,
//! parallelised over query points.
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};
use std::ops::Range;

use ndarray::{Array2, ArrayView1, ArrayView2};
use rayon::prelude::*;

use crate::error::{LmnnError, Result};
use crate::metric::{Metric, SquaredEuclidean};

/// Impostor indices and distances, `k` slots per point.
///
/// Slots of a point are sorted by increasing distance. A point may have
/// fewer than `k` valid slots when its class leaves too few other points.
#[derive(Debug, Clone)]
pub struct ImpostorTable {
    indices: Array2<usize>,
    distances: Array2<f64>,
    filled: Vec<usize>,
}

impl ImpostorTable {
    pub fn new(k: usize, points: usize) -> Self {
        Self {
            indices: Array2::zeros((k, points)),
            distances: Array2::zeros((k, points)),
            filled: vec![0; points],
        }
    }

    #[inline]
    pub fn index(&self, slot: usize, point: usize) -> usize {
        self.indices[[slot, point]]
    }

    /// Distance recorded for this slot at the last refresh.
    #[inline]
    pub fn distance(&self, slot: usize, point: usize) -> f64 {
        self.distances[[slot, point]]
    }

    /// Number of valid slots for `point`.
    #[inline]
    pub fn filled(&self, point: usize) -> usize {
        self.filled[point]
    }

    /// Overwrite the slots of `point` with `neighbors`, given as
    /// `(distance, index)` pairs in increasing distance order.
    pub fn write(&mut self, point: usize, neighbors: &[(f64, usize)]) {
        let k = self.k();
        assert!(neighbors.len() <= k, "more impostors than slots");
        for (slot, &(distance, index)) in neighbors.iter().enumerate() {
            self.indices[[slot, point]] = index;
            self.distances[[slot, point]] = distance;
        }
        self.filled[point] = neighbors.len();
    }

    /// Move point columns along `ordering` and rewrite stored indices
    /// through `inverse` (old position -> new position).
    pub fn permute(&mut self, ordering: &[usize], inverse: &[usize]) {
        self.indices = crate::math::permute_columns(&self.indices, ordering)
            .mapv(|old| inverse[old]);
        self.distances = crate::math::permute_columns(&self.distances, ordering);
        self.filled = ordering.iter().map(|&old| self.filled[old]).collect();
    }

    /// Whether every valid slot of the points in `points` holds a finite
    /// distance.
    pub fn is_finite(&self, points: Range<usize>) -> bool {
        points.into_iter().all(|i| {
            (0..self.filled[i]).all(|slot| self.distances[[slot, i]].is_finite())
        })
    }

    pub fn k(&self) -> usize {
        self.indices.nrows()
    }

    pub fn indices(&self) -> &Array2<usize> {
        &self.indices
    }
}

/// Provider of the LMNN constraint sets.
pub trait Constraints {
    /// Exactly `k` same-class nearest neighbors per point, as a
    /// `(k, n_points)` index matrix, nearest first.
    fn target_neighbors(
        &mut self,
        dataset: ArrayView2<f64>,
        labels: ArrayView1<usize>,
    ) -> Result<Array2<usize>>;

    /// Refresh the impostor slots of the points in `points`.
    ///
    /// Candidates are all points of a different class in `dataset`, not
    /// only those inside `points`.
    fn impostors(
        &mut self,
        table: &mut ImpostorTable,
        dataset: ArrayView2<f64>,
        labels: ArrayView1<usize>,
        points: Range<usize>,
    ) -> Result<()>;

    /// Drop any state derived from the previous point ordering.
    fn invalidate(&mut self);
}

/// Exact k-nearest-neighbor constraints.
#[derive(Debug, Clone)]
pub struct KnnConstraints<M = SquaredEuclidean> {
    k: usize,
    metric: M,
    classes: Option<BTreeMap<usize, Vec<usize>>>,
}

impl<M: Metric> KnnConstraints<M> {
    pub fn new(k: usize, metric: M) -> Self {
        Self {
            k,
            metric,
            classes: None,
        }
    }

    /// Whether the class partition is currently cached.
    pub fn is_precalculated(&self) -> bool {
        self.classes.is_some()
    }

    fn precalculate(&mut self, labels: ArrayView1<usize>) -> &BTreeMap<usize, Vec<usize>> {
        self.classes.get_or_insert_with(|| {
            let mut classes: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
            for (i, &label) in labels.iter().enumerate() {
                classes.entry(label).or_default().push(i);
            }
            log::trace!("Partitioned {} points into {} classes", labels.len(), classes.len());
            classes
        })
    }
}

impl<M: Metric> Constraints for KnnConstraints<M> {
    fn target_neighbors(
        &mut self,
        dataset: ArrayView2<f64>,
        labels: ArrayView1<usize>,
    ) -> Result<Array2<usize>> {
        let k = self.k;
        let metric = self.metric.clone();
        let classes = self.precalculate(labels);

        let neighbors = (0..dataset.ncols())
            .into_par_iter()
            .map(|i| {
                let label = labels[i];
                let members = &classes[&label];
                let available = members.len() - 1;
                if available < k {
                    return Err(LmnnError::NotEnoughTargetNeighbors {
                        point: i,
                        label,
                        available,
                        k,
                    });
                }
                let candidates = members.iter().copied().filter(|&j| j != i);
                Ok(nearest(&metric, dataset, i, candidates, k))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut out = Array2::zeros((k, dataset.ncols()));
        for (i, list) in neighbors.iter().enumerate() {
            for (slot, &(_, index)) in list.iter().enumerate() {
                out[[slot, i]] = index;
            }
        }
        Ok(out)
    }

    fn impostors(
        &mut self,
        table: &mut ImpostorTable,
        dataset: ArrayView2<f64>,
        labels: ArrayView1<usize>,
        points: Range<usize>,
    ) -> Result<()> {
        if points.end > dataset.ncols() {
            return Err(LmnnError::BatchOutOfBounds {
                begin: points.start,
                batch_size: points.len(),
                points: dataset.ncols(),
            });
        }
        let k = self.k.min(table.k());
        let metric = self.metric.clone();
        let classes = self.precalculate(labels);

        let found: Vec<Vec<(f64, usize)>> = points
            .clone()
            .into_par_iter()
            .map(|i| {
                let label = labels[i];
                let candidates = classes
                    .iter()
                    .filter(|(other, _)| **other != label)
                    .flat_map(|(_, members)| members.iter().copied());
                nearest(&metric, dataset, i, candidates, k)
            })
            .collect();

        for (i, list) in points.zip(found.iter()) {
            table.write(i, list);
        }
        Ok(())
    }

    fn invalidate(&mut self) {
        self.classes = None;
    }
}

/// Max-heap entry keeping the `k` smallest `(distance, index)` pairs.
#[derive(PartialEq)]
struct Candidate(f64, usize);

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0).then(self.1.cmp(&other.1))
    }
}

/// Brute-force `k` nearest candidates of column `point`, nearest first.
fn nearest<M, I>(
    metric: &M,
    dataset: ArrayView2<f64>,
    point: usize,
    candidates: I,
    k: usize,
) -> Vec<(f64, usize)>
where
    M: Metric,
    I: Iterator<Item = usize>,
{
    let query = dataset.column(point);
    let mut heap = BinaryHeap::with_capacity(k + 1);

    for j in candidates {
        let candidate = Candidate(metric.evaluate(query, dataset.column(j)), j);
        if heap.len() < k {
            heap.push(candidate);
        } else if let Some(top) = heap.peek() {
            if candidate < *top {
                heap.pop();
                heap.push(candidate);
            }
        }
    }

    heap.into_sorted_vec()
        .into_iter()
        .map(|Candidate(distance, index)| (distance, index))
        .collect()
}
