use ndarray::Array2;

use super::{LmnnFunction, SweepStats};
use crate::constraints::Constraints;
use crate::error::Result;
use crate::metric::Metric;

impl<M: Metric, C: Constraints> LmnnFunction<M, C> {
    /// Cost of `transformation` over the whole dataset.
    pub fn evaluate(&mut self, transformation: &Array2<f64>) -> Result<f64> {
        let (cost, _) = self.full_sweep(transformation, false)?;
        Ok(cost)
    }

    /// Cost of `transformation` restricted to points
    /// `[begin, begin + batch_size)`.
    pub fn evaluate_batch(
        &mut self,
        transformation: &Array2<f64>,
        begin: usize,
        batch_size: usize,
    ) -> Result<f64> {
        let (cost, _) = self.batch_sweep(transformation, begin, batch_size, false)?;
        Ok(cost)
    }

    /// Cost and gradient of `transformation` over the whole dataset in one
    /// pass.
    pub fn evaluate_with_gradient(
        &mut self,
        transformation: &Array2<f64>,
    ) -> Result<(f64, Array2<f64>)> {
        let (cost, push) = self.full_sweep(transformation, true)?;
        let push = push.unwrap_or_else(|| Array2::zeros(self.pull.dim()));
        let gradient = self.combine(transformation, &self.pull, &push);
        Ok((cost, gradient))
    }

    /// Cost and gradient restricted to points `[begin, begin + batch_size)`.
    pub fn evaluate_with_gradient_batch(
        &mut self,
        transformation: &Array2<f64>,
        begin: usize,
        batch_size: usize,
    ) -> Result<(f64, Array2<f64>)> {
        let (cost, push) = self.batch_sweep(transformation, begin, batch_size, true)?;
        let pull = self.pull_over(begin..begin + batch_size);
        let push = push.unwrap_or_else(|| Array2::zeros(pull.dim()));
        let gradient = self.combine(transformation, &pull, &push);
        Ok((cost, gradient))
    }

    fn full_sweep(
        &mut self,
        transformation: &Array2<f64>,
        with_push: bool,
    ) -> Result<(f64, Option<Array2<f64>>)> {
        self.transform(transformation)?;
        let points = 0..self.points();
        let call = self.schedule.calls();
        let refreshed = self.refresh_if_due(points.clone())?;
        let global_drift = self.global_drift(transformation);

        let features = self.features();
        let mut push = with_push.then(|| Array2::zeros((features, features)));
        let mut stats = SweepStats::default();
        let mut cost = 0.0;
        for i in points.clone() {
            // Once batches ran, points may have been swept under different
            // transformations.
            let drift = match self.point_stamps {
                Some(_) => self.point_drift(i, transformation),
                None => global_drift,
            };
            match self.sweep_point(i, drift, refreshed, push.as_mut(), &mut stats) {
                Ok(point_cost) => cost += point_cost,
                Err(err) => {
                    self.forget_transformations();
                    return Err(err);
                }
            }
        }

        self.remember_full(transformation);
        stats.log(call, &points);
        Ok((cost, push))
    }

    fn batch_sweep(
        &mut self,
        transformation: &Array2<f64>,
        begin: usize,
        batch_size: usize,
        with_push: bool,
    ) -> Result<(f64, Option<Array2<f64>>)> {
        let points = self.batch(begin, batch_size)?;
        self.transform(transformation)?;
        let call = self.schedule.calls();
        let refreshed = self.refresh_if_due(points.clone())?;
        self.ensure_stamps();

        let features = self.features();
        let mut push = with_push.then(|| Array2::zeros((features, features)));
        let mut stats = SweepStats::default();
        let mut cost = 0.0;
        for i in points.clone() {
            let drift = self.point_drift(i, transformation);
            match self.sweep_point(i, drift, refreshed, push.as_mut(), &mut stats) {
                Ok(point_cost) => cost += point_cost,
                Err(err) => {
                    self.forget_transformations();
                    return Err(err);
                }
            }
            self.remember_point(i, transformation);
        }

        // Points outside the batch still carry values from older
        // transformations.
        self.transformation_old = None;
        stats.log(call, &points);
        Ok((cost, push))
    }
}
