//! Dense linear-algebra helpers shared by the objective.
//!
//! Thin functions over `ndarray` types: per-column norms, Frobenius
//! distances between transformations, rank-1 outer-product updates and
//! column permutations. Kept free of engine state so they can be tested
//! on their own.
pub mod matrix;
pub mod vector;

pub use matrix::{add_outer, frobenius_distance, permute_columns};
pub use vector::{column_norms, inverse_permutation};
