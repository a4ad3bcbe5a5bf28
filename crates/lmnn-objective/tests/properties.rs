mod common;

use lmnn_objective::metric::Metric;
use lmnn_objective::{LmnnConfig, LmnnFunction, SquaredEuclidean};
use ndarray::Array2;

fn overlapping(seed: u64, range: usize) -> LmnnFunction {
    let (x, y) = common::blobs(seed, 3, 10, 3, 1.0, 1.0);
    let config = LmnnConfig::new(2, 0.5, range).with_seed(seed);
    LmnnFunction::new(x, y, &config, SquaredEuclidean).unwrap()
}

fn relative_gap(a: f64, b: f64) -> f64 {
    (a - b).abs() / a.abs().max(b.abs()).max(1.0)
}

#[test]
fn test_cost_is_non_negative() {
    let mut f = overlapping(1, 2);
    for seed in 0..6 {
        let t = common::near_identity(seed, 3, 0.5);
        assert!(f.evaluate(&t).unwrap() >= 0.0);
    }
}

#[test]
fn test_separated_classes_only_pay_pull() {
    let (x, y) = common::blobs(5, 2, 8, 2, 0.1, 20.0);
    let config = LmnnConfig::new(2, 0.5, 1);
    let mut f = LmnnFunction::new(x, y, &config, SquaredEuclidean).unwrap();
    let t = f.initial_point();
    let cost = f.evaluate(&t).unwrap();

    let transformed = f.transformed();
    let targets = f.target_neighbors();
    let mut pull = 0.0;
    for ((_, i), &target) in targets.indexed_iter() {
        pull += SquaredEuclidean.evaluate(transformed.column(i), transformed.column(target));
    }
    assert!(relative_gap(cost, 0.5 * pull) < 1e-12);
}

#[test]
fn test_repeated_evaluation_is_stable() {
    let mut f = overlapping(2, 1);
    let t = common::near_identity(9, 3, 0.3);
    let first = f.evaluate(&t).unwrap();
    let second = f.evaluate(&t).unwrap();
    assert_eq!(first, second);
}

/// Recompute the cost from the cache contents: pull terms exactly, then the
/// same slot walk the engine performs. Every non-pruned value must be exact.
fn rebuild_cost(f: &LmnnFunction) -> f64 {
    let mu = f.regularization();
    let transformed = f.transformed();
    let d = |a: usize, b: usize| SquaredEuclidean.evaluate(transformed.column(a), transformed.column(b));

    let mut rebuilt = 0.0;
    for i in 0..f.points() {
        for j in (0..f.k()).rev() {
            let target = f.target_neighbors()[[j, i]];
            rebuilt += (1.0 - mu) * d(i, target);
            for l in 0..f.impostors().filled(i) {
                let value = f
                    .eval_cache()
                    .get(l, j, i)
                    .expect("visited triplets are cached");
                if value <= -1.0 {
                    break;
                }
                let exact = d(i, target) - d(i, f.impostors().index(l, i));
                assert!((value - exact).abs() < 1e-9, "point {} slot ({}, {})", i, j, l);
                rebuilt += mu * (1.0 + value);
            }
        }
    }
    rebuilt
}

/// `base` nudged by noise of half-width `scale`.
fn nudged(base: &Array2<f64>, seed: u64, scale: f64) -> Array2<f64> {
    base + &(common::near_identity(seed, base.nrows(), scale) - Array2::<f64>::eye(base.nrows()))
}

#[test]
fn test_cached_values_reproduce_cost() {
    let mut f = overlapping(3, 1);
    let t1 = common::near_identity(1, 3, 0.3);
    let t2 = nudged(&t1, 2, 1e-3);
    f.evaluate(&t1).unwrap();
    let cost = f.evaluate(&t2).unwrap();
    assert!(relative_gap(cost, rebuild_cost(&f)) < 1e-12);
}

#[test]
fn test_cached_values_reproduce_batch_cost() {
    // Points end up stamped with different transformations: 5..15 with
    // `t2`, the rest with `t1`. The last round then bounds each point
    // against its own stamp.
    let mut f = overlapping(3, 1);
    let t1 = common::near_identity(1, 3, 0.3);
    let t2 = nudged(&t1, 2, 1e-3);
    let t3 = nudged(&t2, 3, 1e-3);

    f.evaluate_batch(&t1, 0, 10).unwrap();
    f.evaluate_batch(&t1, 10, 20).unwrap();
    f.evaluate_batch(&t2, 5, 10).unwrap();

    let cost = f.evaluate_batch(&t3, 15, 15).unwrap() + f.evaluate_batch(&t3, 0, 15).unwrap();
    assert!(relative_gap(cost, rebuild_cost(&f)) < 1e-12);

    // Same check when the last round returns gradients too.
    let t4 = nudged(&t3, 4, 1e-3);
    let (first, _) = f.evaluate_with_gradient_batch(&t4, 12, 18).unwrap();
    let (second, _) = f.evaluate_with_gradient_batch(&t4, 0, 12).unwrap();
    assert!(relative_gap(first + second, rebuild_cost(&f)) < 1e-12);
}

#[test]
fn test_full_and_batch_calls_agree() {
    let t1 = common::near_identity(1, 3, 0.2);
    let t2 = common::near_identity(2, 3, 0.2);
    let batches = [(0, 7), (7, 8), (15, 15)];

    let mut full = overlapping(4, 1);
    let mut batched = overlapping(4, 1);
    for t in [&t1, &t2] {
        let expected = full.evaluate(t).unwrap();
        let summed: f64 = batches
            .iter()
            .map(|&(begin, size)| batched.evaluate_batch(t, begin, size).unwrap())
            .sum();
        assert!(relative_gap(expected, summed) < 1e-9, "{} vs {}", expected, summed);
    }
}

#[test]
fn test_full_and_batch_gradients_agree() {
    let t1 = common::near_identity(3, 3, 0.2);
    let t2 = common::near_identity(4, 3, 0.2);
    let batches = [(0, 10), (10, 10), (20, 10)];

    let mut full = overlapping(5, 1);
    let mut batched = overlapping(5, 1);
    for t in [&t1, &t2] {
        let (cost, gradient) = full.evaluate_with_gradient(t).unwrap();
        let mut summed_cost = 0.0;
        let mut summed_gradient = Array2::zeros((3, 3));
        for &(begin, size) in &batches {
            let (c, g) = batched.evaluate_with_gradient_batch(t, begin, size).unwrap();
            summed_cost += c;
            summed_gradient += &g;
        }
        assert!(relative_gap(cost, summed_cost) < 1e-9);
        let scale = gradient.iter().fold(1.0_f64, |m, v| m.max(v.abs()));
        assert!(common::max_abs_diff(&gradient, &summed_gradient) / scale < 1e-9);
    }
}

#[test]
fn test_shuffle_preserves_cost() {
    for range in [1, 4] {
        let mut f = overlapping(6, range);
        let t = common::near_identity(6, 3, 0.3);
        let before = f.evaluate(&t).unwrap();
        f.shuffle().unwrap();
        let after = f.evaluate(&t).unwrap();
        assert!(relative_gap(before, after) < 1e-12, "range {}: {} vs {}", range, before, after);
    }
}

#[test]
fn test_shuffle_keeps_points_with_their_labels() {
    let (x, y) = common::blobs(7, 3, 10, 3, 1.0, 1.0);
    let config = LmnnConfig::new(2, 0.5, 1).with_seed(11);
    let mut f = LmnnFunction::new(x.clone(), y.clone(), &config, SquaredEuclidean).unwrap();
    f.shuffle().unwrap();
    let (shuffled, labels) = f.into_parts();

    for p in 0..shuffled.ncols() {
        let original = (0..x.ncols())
            .find(|&o| x.column(o) == shuffled.column(p))
            .expect("every shuffled column comes from the dataset");
        assert_eq!(labels[p], y[original]);
    }
}

#[test]
fn test_seeded_instances_are_deterministic() {
    fn run(f: &mut LmnnFunction) -> (Vec<f64>, Vec<Array2<f64>>) {
        let t1 = common::near_identity(1, 3, 0.3);
        let t2 = common::near_identity(2, 3, 0.3);
        let t3 = common::near_identity(3, 3, 0.3);
        let mut costs = Vec::new();
        let mut gradients = Vec::new();

        costs.push(f.evaluate(&t1).unwrap());
        gradients.push(f.gradient(&t1).unwrap());
        f.shuffle().unwrap();
        costs.push(f.evaluate_batch(&t2, 0, 10).unwrap());
        let (c, g) = f.evaluate_with_gradient_batch(&t2, 10, 20).unwrap();
        costs.push(c);
        gradients.push(g);
        let (c, g) = f.evaluate_with_gradient(&t3).unwrap();
        costs.push(c);
        gradients.push(g);
        (costs, gradients)
    }

    let mut a = overlapping(8, 2);
    let mut b = overlapping(8, 2);
    assert_eq!(run(&mut a), run(&mut b));
    assert_eq!(a.labels(), b.labels());
}

#[test]
fn test_gradient_matches_finite_differences() {
    // Every pairwise squared distance stays well below 0.5 under the
    // transformations used here, so no triplet is ever pruned and the cost
    // is a single quadratic form around `t`.
    let (x, y) = common::blobs(11, 3, 8, 3, 0.15, 0.0);
    let config = LmnnConfig::new(2, 0.5, 1000);
    let mut f = LmnnFunction::new(x, y, &config, SquaredEuclidean).unwrap();
    let t = common::near_identity(4, 3, 0.1);
    f.evaluate(&t).unwrap();

    let h = 1e-5;
    let mut numeric = Array2::zeros((3, 3));
    for a in 0..3 {
        for b in 0..3 {
            let mut plus = t.clone();
            plus[[a, b]] += h;
            let mut minus = t.clone();
            minus[[a, b]] -= h;
            numeric[[a, b]] = (f.evaluate(&plus).unwrap() - f.evaluate(&minus).unwrap()) / (2.0 * h);
        }
    }

    let scale = numeric.iter().fold(1.0_f64, |m, v| m.max(v.abs()));
    let gradient = f.gradient(&t).unwrap();
    assert!(common::max_abs_diff(&gradient, &numeric) / scale < 1e-6);
    let (_, gradient) = f.evaluate_with_gradient(&t).unwrap();
    assert!(common::max_abs_diff(&gradient, &numeric) / scale < 1e-6);
}
