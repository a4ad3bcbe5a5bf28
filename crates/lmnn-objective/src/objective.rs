//! Optimizer-facing traits.
//!
//! An optimizer only sees coordinates (here a transformation matrix) and
//! asks for values and gradients. Separable objectives are sums of
//! per-point terms and additionally support mini-batches and reordering.
use ndarray::Array2;

use crate::constraints::Constraints;
use crate::error::Result;
use crate::function::LmnnFunction;
use crate::metric::Metric;

/// Objective function to be minimized.
pub trait DifferentiableObjective {
    /// Function value at `coordinates`.
    fn evaluate(&mut self, coordinates: &Array2<f64>) -> Result<f64>;

    /// Gradient at `coordinates`, shaped like `coordinates`.
    fn gradient(&mut self, coordinates: &Array2<f64>) -> Result<Array2<f64>>;

    /// Value and gradient together. Implementations that share work between
    /// the two should override this.
    fn evaluate_with_gradient(&mut self, coordinates: &Array2<f64>) -> Result<(f64, Array2<f64>)> {
        let value = self.evaluate(coordinates)?;
        let gradient = self.gradient(coordinates)?;
        Ok((value, gradient))
    }
}

/// A sum of `num_functions()` separable terms.
pub trait SeparableObjective: DifferentiableObjective {
    fn num_functions(&self) -> usize;

    /// Randomly reorder the separable terms.
    fn shuffle(&mut self) -> Result<()>;

    /// Sum of terms `[begin, begin + batch_size)` at `coordinates`.
    fn evaluate_batch(&mut self, coordinates: &Array2<f64>, begin: usize, batch_size: usize) -> Result<f64>;

    fn gradient_batch(
        &mut self,
        coordinates: &Array2<f64>,
        begin: usize,
        batch_size: usize,
    ) -> Result<Array2<f64>>;

    fn evaluate_with_gradient_batch(
        &mut self,
        coordinates: &Array2<f64>,
        begin: usize,
        batch_size: usize,
    ) -> Result<(f64, Array2<f64>)> {
        let value = self.evaluate_batch(coordinates, begin, batch_size)?;
        let gradient = self.gradient_batch(coordinates, begin, batch_size)?;
        Ok((value, gradient))
    }
}

impl<M: Metric, C: Constraints> DifferentiableObjective for LmnnFunction<M, C> {
    fn evaluate(&mut self, coordinates: &Array2<f64>) -> Result<f64> {
        LmnnFunction::evaluate(self, coordinates)
    }

    fn gradient(&mut self, coordinates: &Array2<f64>) -> Result<Array2<f64>> {
        LmnnFunction::gradient(self, coordinates)
    }

    fn evaluate_with_gradient(&mut self, coordinates: &Array2<f64>) -> Result<(f64, Array2<f64>)> {
        LmnnFunction::evaluate_with_gradient(self, coordinates)
    }
}

impl<M: Metric, C: Constraints> SeparableObjective for LmnnFunction<M, C> {
    fn num_functions(&self) -> usize {
        self.points()
    }

    fn shuffle(&mut self) -> Result<()> {
        LmnnFunction::shuffle(self)
    }

    fn evaluate_batch(&mut self, coordinates: &Array2<f64>, begin: usize, batch_size: usize) -> Result<f64> {
        LmnnFunction::evaluate_batch(self, coordinates, begin, batch_size)
    }

    fn gradient_batch(
        &mut self,
        coordinates: &Array2<f64>,
        begin: usize,
        batch_size: usize,
    ) -> Result<Array2<f64>> {
        LmnnFunction::gradient_batch(self, coordinates, begin, batch_size)
    }

    fn evaluate_with_gradient_batch(
        &mut self,
        coordinates: &Array2<f64>,
        begin: usize,
        batch_size: usize,
    ) -> Result<(f64, Array2<f64>)> {
        LmnnFunction::evaluate_with_gradient_batch(self, coordinates, begin, batch_size)
    }
}
