#![allow(dead_code)]

use ndarray::{array, Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Four points in two classes:
///
/// ```text
/// (0, 1.0) class 0    (1, 1.5) class 1
/// (0, 0.0) class 0    (1, 0.0) class 1
/// ```
pub fn four_points() -> (Array2<f64>, Array1<usize>) {
    let x = array![[0.0, 0.0, 1.0, 1.0], [0.0, 1.0, 0.0, 1.5]];
    let y = Array1::from_vec(vec![0, 0, 1, 1]);
    (x, y)
}

/// `classes * per_class` points in `features` dimensions. Class `c` is
/// centered at `c * separation` on every feature, with uniform noise of
/// half-width `spread`.
pub fn blobs(
    seed: u64,
    classes: usize,
    per_class: usize,
    features: usize,
    spread: f64,
    separation: f64,
) -> (Array2<f64>, Array1<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = classes * per_class;
    let mut x = Array2::zeros((features, n));
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let class = i % classes;
        y[i] = class;
        for f in 0..features {
            x[[f, i]] = class as f64 * separation + rng.gen_range(-spread..spread);
        }
    }
    (x, y)
}

/// Identity plus uniform noise of half-width `scale`.
pub fn near_identity(seed: u64, features: usize, scale: f64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((features, features), |(a, b)| {
        let base = if a == b { 1.0 } else { 0.0 };
        base + rng.gen_range(-scale..scale)
    })
}

pub fn max_abs_diff(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}
