//! The LMNN objective: cost and gradient of a linear transformation.
//!
//! `LmnnFunction` owns the dataset and labels it was built from, plus all
//! memory carried between calls: the triplet cache, the running maximum
//! impostor norms, the last transformation (globally and per point) and the
//! impostor-refresh schedule. Every operation takes `&mut self`; calls are
//! order-sensitive and must not be interleaved across threads.
//!
//! The cost of a transformation `L` is
//!
//! ```text
//! (1 - mu) * sum_ij d(Lx_i, Lx_j) + mu * sum_ijl [1 + d(Lx_i, Lx_j) - d(Lx_i, Lx_l)]_+
//! ```
//!
//! over points `i`, target neighbors `j` and impostors `l`, with `mu` the
//! regularization weight.
mod evaluate;
mod gradient;
mod shuffle;

use std::ops::Range;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::cache::{PointStamps, TripletCache};
use crate::config::LmnnConfig;
use crate::constraints::{Constraints, ImpostorTable, KnnConstraints};
use crate::error::{LmnnError, Result};
use crate::math::{add_outer, column_norms, frobenius_distance};
use crate::metric::{Metric, SquaredEuclidean};
use crate::schedule::RefreshSchedule;

/// A triplet whose margin-violation value is at or below this floor is
/// inactive, and so is every later impostor slot of the same pair.
pub const PRUNE_FLOOR: f64 = -1.0;

#[inline]
pub(crate) fn is_pruned(value: f64) -> bool {
    value <= PRUNE_FLOOR
}

pub struct LmnnFunction<M = SquaredEuclidean, C = KnnConstraints<M>> {
    dataset: Array2<f64>,
    labels: Array1<usize>,
    k: usize,
    regularization: f64,
    metric: M,
    constraints: C,
    schedule: RefreshSchedule,
    transformed: Array2<f64>,
    target_neighbors: Array2<usize>,
    impostors: ImpostorTable,
    eval_cache: TripletCache,
    max_impostor_norm: Array2<f64>,
    transformation_old: Option<Array2<f64>>,
    point_stamps: Option<PointStamps>,
    pull: Array2<f64>,
    norms: Array1<f64>,
    rng: StdRng,
}

impl<M: Metric> LmnnFunction<M, KnnConstraints<M>> {
    /// Build an objective over `dataset` (features x points) using exact
    /// k-nearest-neighbor constraints under `metric`.
    pub fn new(
        dataset: Array2<f64>,
        labels: Array1<usize>,
        config: &LmnnConfig,
        metric: M,
    ) -> Result<Self> {
        let constraints = KnnConstraints::new(config.k, metric.clone());
        Self::with_constraints(dataset, labels, config, metric, constraints)
    }
}

impl<M: Metric, C: Constraints> LmnnFunction<M, C> {
    /// Build an objective with a caller-supplied constraint provider.
    ///
    /// Target neighbors and an initial impostor set are computed on the
    /// untransformed dataset, then the point norms and the pull aggregate are
    /// precalculated.
    pub fn with_constraints(
        dataset: Array2<f64>,
        labels: Array1<usize>,
        config: &LmnnConfig,
        metric: M,
        mut constraints: C,
    ) -> Result<Self> {
        config.validate()?;
        if dataset.ncols() != labels.len() {
            return Err(LmnnError::ShapeMismatch {
                points: dataset.ncols(),
                labels: labels.len(),
            });
        }

        let (features, points) = dataset.dim();
        let k = config.k;

        let target_neighbors = constraints.target_neighbors(dataset.view(), labels.view())?;
        check_target_neighbors(&target_neighbors, k, points)?;

        let mut impostors = ImpostorTable::new(k, points);
        constraints.impostors(&mut impostors, dataset.view(), labels.view(), 0..points)?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut function = LmnnFunction {
            transformed: dataset.clone(),
            dataset,
            labels,
            k,
            regularization: config.regularization,
            metric,
            constraints,
            schedule: RefreshSchedule::new(config.range),
            target_neighbors,
            impostors,
            eval_cache: TripletCache::new(k, points),
            max_impostor_norm: Array2::zeros((k, points)),
            transformation_old: None,
            point_stamps: None,
            pull: Array2::zeros((features, features)),
            norms: Array1::zeros(points),
            rng,
        };
        function.precalculate();

        log::info!(
            "LMNN objective over {} points with {} features (k = {}, regularization = {}, impostor refresh every {} calls)",
            points,
            features,
            k,
            config.regularization,
            config.range
        );
        Ok(function)
    }

    /// Recompute point norms and the pull aggregate from the current target
    /// neighbors.
    pub(crate) fn precalculate(&mut self) {
        self.norms = column_norms(&self.dataset);
        self.pull = self.pull_over(0..self.points());
    }

    /// Sum of `(x_i - x_j)(x_i - x_j)^T` over target neighbors `j` of each
    /// point `i` in `points`.
    fn pull_over(&self, points: Range<usize>) -> Array2<f64> {
        let features = self.features();
        let mut pull = Array2::zeros((features, features));
        for i in points {
            for j in 0..self.k {
                let target = self.target_neighbors[[j, i]];
                let diff = &self.dataset.column(i) - &self.dataset.column(target);
                add_outer(&mut pull, diff.view(), 1.0);
            }
        }
        pull
    }

    /// Apply `transformation` to every point.
    fn transform(&mut self, transformation: &Array2<f64>) -> Result<()> {
        if transformation.ncols() != self.features() || transformation.nrows() == 0 {
            return Err(LmnnError::TransformationShape {
                features: self.features(),
                found: transformation.dim(),
            });
        }
        if transformation.iter().any(|v| !v.is_finite()) {
            return Err(LmnnError::NonFiniteTransformation);
        }
        let transformed = transformation.dot(&self.dataset);
        if transformed.iter().any(|v| !v.is_finite()) {
            return Err(LmnnError::NonFiniteTransformation);
        }
        self.transformed = transformed;
        Ok(())
    }

    fn batch(&self, begin: usize, batch_size: usize) -> Result<Range<usize>> {
        match begin.checked_add(batch_size) {
            Some(end) if end <= self.points() => Ok(begin..end),
            _ => Err(LmnnError::BatchOutOfBounds {
                begin,
                batch_size,
                points: self.points(),
            }),
        }
    }

    /// Tick the schedule and, when due, refresh the impostors of `points`
    /// on the transformed dataset. Returns whether a refresh happened.
    ///
    /// A failed refresh leaves both the impostor table and the schedule
    /// untouched.
    fn refresh_if_due(&mut self, points: Range<usize>) -> Result<bool> {
        let call = self.schedule.calls();
        if !self.schedule.is_due() {
            self.schedule.tick();
            return Ok(false);
        }
        log::debug!("Refreshing impostors of points {:?} on call {}", points, call);
        let mut refreshed = self.impostors.clone();
        self.constraints.impostors(
            &mut refreshed,
            self.transformed.view(),
            self.labels.view(),
            points.clone(),
        )?;
        if !refreshed.is_finite(points) {
            return Err(LmnnError::NonFiniteTransformation);
        }
        self.impostors = refreshed;
        self.schedule.tick();
        Ok(true)
    }

    /// `2 L ((1 - mu) pull + mu push)`.
    fn combine(&self, transformation: &Array2<f64>, pull: &Array2<f64>, push: &Array2<f64>) -> Array2<f64> {
        let mix = pull * (1.0 - self.regularization) + push * self.regularization;
        transformation.dot(&mix) * 2.0
    }

    /// Cost contribution of point `i`.
    ///
    /// Pull distances are always exact. Triplets are scanned target slots in
    /// reverse and impostor slots forward; a cached value is first widened by
    /// the drift bound, and only recomputed when the bound no longer proves
    /// the triplet inactive. When `push` is given, the outer products of every
    /// active triplet are accumulated into it.
    fn sweep_point(
        &mut self,
        i: usize,
        drift: Option<f64>,
        refreshed: bool,
        mut push: Option<&mut Array2<f64>>,
        stats: &mut SweepStats,
    ) -> Result<f64> {
        let k = self.k;
        let mu = self.regularization;
        let point = self.transformed.column(i);

        let target_distances: Vec<f64> = (0..k)
            .map(|j| {
                let target = self.target_neighbors[[j, i]];
                self.metric.evaluate(point, self.transformed.column(target))
            })
            .collect();
        let mut cost = (1.0 - mu) * target_distances.iter().sum::<f64>();

        for j in (0..k).rev() {
            let target = self.target_neighbors[[j, i]];
            let target_diff = push
                .is_some()
                .then(|| &self.dataset.column(i) - &self.dataset.column(target));

            let active = self.impostors.filled(i);
            for l in 0..active {
                let impostor = self.impostors.index(l, i);

                let mut bounded = None;
                if let (Some(drift), Some(cached)) = (drift, self.eval_cache.get(l, j, i)) {
                    let widest = self.max_impostor_norm[[l, i]].max(self.norms[impostor]);
                    self.max_impostor_norm[[l, i]] = widest;
                    let bound = cached
                        + drift * (self.norms[target] + widest + 2.0 * self.norms[i]);
                    if is_pruned(bound) {
                        bounded = Some(bound);
                    } else {
                        self.max_impostor_norm[[l, i]] = 0.0;
                        self.eval_cache.clear(l, j, i);
                    }
                }

                let value = match bounded {
                    Some(bound) => {
                        stats.bounded += 1;
                        bound
                    }
                    None => {
                        stats.exact += 1;
                        let impostor_distance = if refreshed {
                            self.impostors.distance(l, i)
                        } else {
                            self.metric.evaluate(point, self.transformed.column(impostor))
                        };
                        target_distances[j] - impostor_distance
                    }
                };

                if !value.is_finite() {
                    return Err(LmnnError::NonFinite {
                        point: i,
                        target_slot: j,
                        impostor_slot: l,
                    });
                }
                self.eval_cache.set(l, j, i, value);

                if is_pruned(value) {
                    stats.pruned += 1;
                    break;
                }

                cost += mu * (1.0 + value);
                if let (Some(push), Some(target_diff)) = (push.as_deref_mut(), target_diff.as_ref()) {
                    let impostor_diff = &self.dataset.column(i) - &self.dataset.column(impostor);
                    add_outer(push, target_diff.view(), 1.0);
                    add_outer(push, impostor_diff.view(), -1.0);
                }
            }
        }

        Ok(cost)
    }

    /// Accumulate the impostor outer products of point `i` into `push`,
    /// trusting cached triplet values when present.
    fn push_point(&self, i: usize, push: &mut Array2<f64>) -> Result<()> {
        let point = self.transformed.column(i);
        for j in (0..self.k).rev() {
            let target = self.target_neighbors[[j, i]];
            let target_diff = &self.dataset.column(i) - &self.dataset.column(target);

            for l in 0..self.impostors.filled(i) {
                let impostor = self.impostors.index(l, i);
                let value = match self.eval_cache.get(l, j, i) {
                    Some(cached) => cached,
                    None => {
                        self.metric.evaluate(point, self.transformed.column(target))
                            - self.metric.evaluate(point, self.transformed.column(impostor))
                    }
                };
                if !value.is_finite() {
                    return Err(LmnnError::NonFinite {
                        point: i,
                        target_slot: j,
                        impostor_slot: l,
                    });
                }
                if is_pruned(value) {
                    break;
                }

                let impostor_diff = &self.dataset.column(i) - &self.dataset.column(impostor);
                add_outer(push, target_diff.view(), 1.0);
                add_outer(push, impostor_diff.view(), -1.0);
            }
        }
        Ok(())
    }

    /// Drift of `transformation` from the last one applied to point `i`.
    fn point_drift(&self, i: usize, transformation: &Array2<f64>) -> Option<f64> {
        self.point_stamps
            .as_ref()
            .and_then(|stamps| stamps.get(i))
            .filter(|old| old.dim() == transformation.dim())
            .map(|old| frobenius_distance(transformation, old))
    }

    /// Drift of `transformation` from the last full-dataset call.
    fn global_drift(&self, transformation: &Array2<f64>) -> Option<f64> {
        self.transformation_old
            .as_ref()
            .filter(|old| old.dim() == transformation.dim())
            .map(|old| frobenius_distance(transformation, old))
    }

    /// Bookkeeping after a full-dataset call: every point's cached values now
    /// stem from `transformation`.
    fn remember_full(&mut self, transformation: &Array2<f64>) {
        self.transformation_old = Some(transformation.to_owned());
        if let Some(stamps) = self.point_stamps.as_mut() {
            stamps.fill(transformation);
        }
    }

    /// Bookkeeping before a batch call: allocate per-point stamps on first
    /// use.
    fn ensure_stamps(&mut self) {
        if self.point_stamps.is_none() {
            self.point_stamps = Some(PointStamps::new(self.points()));
        }
    }

    /// Bookkeeping after point `i` was swept by a batch call.
    fn remember_point(&mut self, i: usize, transformation: &Array2<f64>) {
        if let Some(stamps) = self.point_stamps.as_mut() {
            stamps.set(i, transformation);
        }
    }

    /// Drop every transformation stamp after a failed sweep left the cache
    /// holding values from mixed transformations. Triplets are recomputed
    /// exactly until the next successful full call.
    fn forget_transformations(&mut self) {
        self.transformation_old = None;
        self.point_stamps = None;
    }

    /// The identity transformation, a natural starting point for optimizers.
    pub fn initial_point(&self) -> Array2<f64> {
        Array2::eye(self.features())
    }

    pub fn points(&self) -> usize {
        self.dataset.ncols()
    }

    pub fn features(&self) -> usize {
        self.dataset.nrows()
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn regularization(&self) -> f64 {
        self.regularization
    }

    pub fn dataset(&self) -> ArrayView2<f64> {
        self.dataset.view()
    }

    pub fn labels(&self) -> ArrayView1<usize> {
        self.labels.view()
    }

    /// Dataset after the last applied transformation.
    pub fn transformed(&self) -> ArrayView2<f64> {
        self.transformed.view()
    }

    pub fn target_neighbors(&self) -> &Array2<usize> {
        &self.target_neighbors
    }

    pub fn impostors(&self) -> &ImpostorTable {
        &self.impostors
    }

    pub fn eval_cache(&self) -> &TripletCache {
        &self.eval_cache
    }

    pub fn pull_aggregate(&self) -> &Array2<f64> {
        &self.pull
    }

    pub fn point_norms(&self) -> &Array1<f64> {
        &self.norms
    }

    pub fn metric(&self) -> &M {
        &self.metric
    }

    pub fn constraints(&self) -> &C {
        &self.constraints
    }

    /// Number of objective calls registered by the refresh schedule.
    pub fn calls(&self) -> usize {
        self.schedule.calls()
    }

    /// Give back the (possibly reordered) dataset and labels.
    pub fn into_parts(self) -> (Array2<f64>, Array1<usize>) {
        (self.dataset, self.labels)
    }
}

/// Reject provider output that is not `k x points` or that names a point
/// outside the dataset.
pub(crate) fn check_target_neighbors(targets: &Array2<usize>, k: usize, points: usize) -> Result<()> {
    if targets.dim() != (k, points) {
        return Err(LmnnError::InvalidTargetNeighbors(format!(
            "expected shape {:?}, found {:?}",
            (k, points),
            targets.dim()
        )));
    }
    if let Some(&index) = targets.iter().find(|&&index| index >= points) {
        return Err(LmnnError::InvalidTargetNeighbors(format!(
            "index {} outside {} points",
            index, points
        )));
    }
    Ok(())
}

/// Per-call triplet counters, logged at trace level.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct SweepStats {
    pub exact: usize,
    pub bounded: usize,
    pub pruned: usize,
}

impl SweepStats {
    fn log(&self, call: usize, points: &Range<usize>) {
        log::trace!(
            "Call {} over points {:?}: {} exact triplets, {} skipped by bound, {} pruned pairs",
            call,
            points,
            self.exact,
            self.bounded,
            self.pruned
        );
    }
}
