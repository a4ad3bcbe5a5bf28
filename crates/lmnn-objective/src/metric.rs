//! Pairwise distance functions over (transformed) column vectors.
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// A distance between two points of the working space.
///
/// Implementations must be pure and return a non-negative value. The
/// objective evaluates the metric on transformed columns, and the
/// constraint provider uses the same metric so that impostor distances
/// recorded at refresh time are comparable with fresh evaluations.
pub trait Metric: Clone + Send + Sync {
    fn evaluate(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64;
}

/// `||a - b||^2`. The default LMNN metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SquaredEuclidean;

impl Metric for SquaredEuclidean {
    #[inline]
    fn evaluate(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
    }
}

/// `||a - b||`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Euclidean;

impl Metric for Euclidean {
    #[inline]
    fn evaluate(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        SquaredEuclidean.evaluate(a, b).sqrt()
    }
}
