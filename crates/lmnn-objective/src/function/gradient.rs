use ndarray::Array2;

use super::LmnnFunction;
use crate::constraints::Constraints;
use crate::error::Result;
use crate::metric::Metric;

impl<M: Metric, C: Constraints> LmnnFunction<M, C> {
    /// Gradient of the cost at `transformation` over the whole dataset.
    ///
    /// Triplet activity is read from the cache left by the last evaluation
    /// where available, so calling this right after
    /// [`evaluate`](Self::evaluate) on the same transformation reuses its
    /// pruning decisions. The impostor set is never refreshed here.
    pub fn gradient(&mut self, transformation: &Array2<f64>) -> Result<Array2<f64>> {
        self.transform(transformation)?;
        let features = self.features();
        let mut push = Array2::zeros((features, features));
        for i in 0..self.points() {
            self.push_point(i, &mut push)?;
        }
        Ok(self.combine(transformation, &self.pull, &push))
    }

    /// Gradient restricted to points `[begin, begin + batch_size)`.
    pub fn gradient_batch(
        &mut self,
        transformation: &Array2<f64>,
        begin: usize,
        batch_size: usize,
    ) -> Result<Array2<f64>> {
        let points = self.batch(begin, batch_size)?;
        self.transform(transformation)?;
        let features = self.features();
        let mut push = Array2::zeros((features, features));
        for i in points.clone() {
            self.push_point(i, &mut push)?;
        }
        let pull = self.pull_over(points);
        Ok(self.combine(transformation, &pull, &push))
    }
}
