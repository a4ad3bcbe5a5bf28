use ndarray::{Array2, ArrayBase, ArrayView1, Axis, Data, Ix2};

/// Frobenius norm of `a - b`.
///
/// Both matrices must share a shape.
pub fn frobenius_distance<S, T>(a: &ArrayBase<S, Ix2>, b: &ArrayBase<T, Ix2>) -> f64
where
    S: Data<Elem = f64>,
    T: Data<Elem = f64>,
{
    assert_eq!(a.shape(), b.shape(), "frobenius_distance requires equal shapes");
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Rank-1 update `acc += sign * diff * diff^T`.
pub fn add_outer(acc: &mut Array2<f64>, diff: ArrayView1<f64>, sign: f64) {
    debug_assert_eq!(acc.nrows(), diff.len());
    debug_assert_eq!(acc.ncols(), diff.len());
    for (mut row, &d) in acc.axis_iter_mut(Axis(0)).zip(diff.iter()) {
        row.scaled_add(sign * d, &diff);
    }
}

/// Reorder columns so that column `p` of the result is column
/// `ordering[p]` of the input.
pub fn permute_columns<A, S>(x: &ArrayBase<S, Ix2>, ordering: &[usize]) -> Array2<A>
where
    A: Clone,
    S: Data<Elem = A>,
{
    x.select(Axis(1), ordering)
}
