use ndarray::{Array1, ArrayBase, Axis, Data, Ix2};

/// Compute the Euclidean norm of every column of a 2D array.
///
/// Columns are points, so the result has one entry per point.
///
/// # Examples
///
/// ```rust
/// use ndarray::array;
/// use lmnn_objective::math::column_norms;
///
/// let x = array![[3.0, 0.0], [4.0, 2.0]];
/// let norms = column_norms(&x);
/// assert_eq!(norms.to_vec(), vec![5.0, 2.0]);
/// ```
pub fn column_norms<S>(x: &ArrayBase<S, Ix2>) -> Array1<f64>
where
    S: Data<Elem = f64>,
{
    let mut norms = Array1::zeros(x.ncols());

    for (i, col) in x.axis_iter(Axis(1)).enumerate() {
        let sum_of_squares: f64 = col.iter().map(|&val| val.powi(2)).sum();
        norms[i] = sum_of_squares.sqrt();
    }

    norms
}

/// Invert a permutation: if `ordering[new] == old`, the result maps
/// `old -> new`.
pub fn inverse_permutation(ordering: &[usize]) -> Vec<usize> {
    let mut inverse = vec![0; ordering.len()];
    for (new, &old) in ordering.iter().enumerate() {
        inverse[old] = new;
    }
    inverse
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_permutation() {
        let ordering = [2, 0, 3, 1];
        let inverse = inverse_permutation(&ordering);
        assert_eq!(inverse, vec![1, 3, 0, 2]);
        for (new, &old) in ordering.iter().enumerate() {
            assert_eq!(inverse[old], new);
        }
    }
}
