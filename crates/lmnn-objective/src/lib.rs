//! lmnn-objective: the Large Margin Nearest Neighbor metric-learning
//! objective, ready to be driven by a gradient-based optimizer.
//!
//! [`LmnnFunction`] evaluates the LMNN cost and gradient of a linear
//! transformation over a labelled dataset, over the whole dataset or over
//! contiguous mini-batches. Repeated calls are made cheap by caching triplet
//! values across iterations, skipping triplets whose inactivity is proven by
//! a drift bound on the transformation, and refreshing the impostor set only
//! every `range` calls.
//!
//! Neighbor search is delegated to a [`Constraints`] provider;
//! [`KnnConstraints`] performs exact brute-force search in parallel.
//!
//! ```rust
//! use lmnn_objective::{LmnnConfig, LmnnFunction, SquaredEuclidean};
//! use ndarray::{array, Array1};
//!
//! let dataset = array![[0.0, 0.0, 1.0, 1.0], [0.0, 1.0, 0.0, 1.5]];
//! let labels = Array1::from_vec(vec![0, 0, 1, 1]);
//! let config = LmnnConfig::new(1, 0.5, 1);
//!
//! let mut lmnn = LmnnFunction::new(dataset, labels, &config, SquaredEuclidean)?;
//! let identity = lmnn.initial_point();
//! let cost = lmnn.evaluate(&identity)?;
//! assert!((cost - 6.25).abs() < 1e-12);
//! # Ok::<(), lmnn_objective::LmnnError>(())
//! ```
pub mod cache;
pub mod config;
pub mod constraints;
pub mod error;
pub mod function;
pub mod math;
pub mod metric;
pub mod objective;
pub mod schedule;

pub use config::LmnnConfig;
pub use constraints::{Constraints, ImpostorTable, KnnConstraints};
pub use error::{LmnnError, Result};
pub use function::LmnnFunction;
pub use metric::{Euclidean, Metric, SquaredEuclidean};
pub use objective::{DifferentiableObjective, SeparableObjective};
