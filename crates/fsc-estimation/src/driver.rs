//! The estimation driver: the phase loop that primes the
//! model, runs the minimiser once per estimation phase, and recovers the
//! final covariance — a "construct once, run phases" shape generalised
//! from a generational search loop to a sequence of minimiser phases.

use crate::estimate::EstimateManager;
use crate::gradient::ScaledObjectiveFn;
use crate::minimiser::{Minimiser, MinimiserOutcome, MinimiserResult};
use crate::scale::{boundary_penalty, unscale};
use fsc_core::{Executor, Matrix, ObjectiveValue};
use fsc_error::FscResult;
use std::sync::Arc;

/// Evaluates one full model iteration at the given *unscaled* parameter
/// values, in the estimate manager's label order. Supplied by the caller
/// (the top-level engine, out of this crate's scope) — `fsc-estimation`
/// only orchestrates the phase loop around it.
pub type UnscaledObjectiveFn = Arc<dyn Fn(&[f64]) -> FscResult<ObjectiveValue> + Send + Sync>;

#[derive(Debug)]
pub struct PhaseResult {
    pub phase: u32,
    pub outcome: MinimiserOutcome,
    pub objective: f64,
    pub iterations: usize,
    pub evaluations: usize,
}

#[derive(Debug)]
pub struct EstimationOutcome {
    pub phase_results: Vec<PhaseResult>,
    pub final_objective: ObjectiveValue,
    pub covariance: Matrix,
}

pub struct EstimationDriver {
    pub minimiser: Minimiser,
}

impl EstimationDriver {
    pub fn new(minimiser: Minimiser) -> Self {
        EstimationDriver { minimiser }
    }

    /// Runs one full estimation pass: prime, then one minimiser
    /// invocation per phase from 1 to `estimates.max_phase()`, then
    /// covariance recovery and one final non-estimation model iteration.
    pub fn run(
        &self,
        estimates: &mut EstimateManager,
        objective_fn: UnscaledObjectiveFn,
        executor: &Executor,
    ) -> FscResult<EstimationOutcome> {
        objective_fn(&estimates.values())?;
        tracing::info!("estimation: primed model with initial estimate values");

        let max_phase = estimates.max_phase();
        let mut phase_results = Vec::with_capacity(max_phase as usize);
        let mut last_hessian = Matrix::identity(0);

        for phase in 1..=max_phase {
            tracing::info!(phase, "estimation: starting phase");
            let active_labels: Vec<String> =
                estimates.active_labels(phase).into_iter().map(String::from).collect();
            if active_labels.is_empty() {
                continue;
            }

            let base_values = estimates.values();
            let all_labels: Vec<String> = estimates.labels().to_vec();
            let active_indices: Vec<usize> = active_labels
                .iter()
                .map(|l| all_labels.iter().position(|x| x == l).expect("active label exists"))
                .collect();
            let active_bounds: Vec<(f64, f64)> = active_labels
                .iter()
                .map(|l| {
                    let e = estimates.get(l).expect("active label exists");
                    (e.lower_bound, e.upper_bound)
                })
                .collect();

            let scaled_objective: ScaledObjectiveFn = {
                let base_values = base_values.clone();
                let active_indices = active_indices.clone();
                let active_bounds = active_bounds.clone();
                let objective_fn = Arc::clone(&objective_fn);
                Arc::new(move |s: &[f64]| {
                    let mut full = base_values.clone();
                    let mut boundary = 0.0;
                    for (k, &si) in s.iter().enumerate() {
                        let (lower, upper) = active_bounds[k];
                        full[active_indices[k]] = unscale(si, lower, upper);
                        boundary += boundary_penalty(si);
                    }
                    match objective_fn(&full) {
                        Ok(value) if value.is_finite() => value.total + boundary,
                        _ => f64::INFINITY,
                    }
                })
            };

            let active_refs: Vec<&str> = active_labels.iter().map(String::as_str).collect();
            let initial_scaled = estimates.scaled_vector(&active_refs);

            let result: MinimiserResult = self.minimiser.minimise(initial_scaled, scaled_objective, executor);
            estimates.apply_scaled(&active_refs, &result.scaled)?;
            last_hessian = result.hessian.clone();

            tracing::info!(
                phase,
                outcome = ?result.outcome,
                objective = result.objective,
                "estimation: phase complete"
            );

            phase_results.push(PhaseResult {
                phase,
                outcome: result.outcome,
                objective: result.objective,
                iterations: result.iterations,
                evaluations: result.evaluations,
            });
        }

        let covariance = Minimiser::covariance(&last_hessian);

        let final_objective = objective_fn(&estimates.values())?;
        tracing::info!(objective = final_objective.total, "estimation: iteration complete");
        tracing::info!("estimation: finalise");

        Ok(EstimationOutcome {
            phase_results,
            final_objective,
            covariance,
        })
    }

    /// Runs [`Self::run`] once per estimable-set row, copying each row's
    /// values into `estimates` before running. Rows are `(label,
    /// value)` pairs; labels not present in a row keep their current
    /// value.
    pub fn run_for_each_row(
        &self,
        estimates: &mut EstimateManager,
        rows: &[Vec<(String, f64)>],
        objective_fn: UnscaledObjectiveFn,
        executor: &Executor,
    ) -> FscResult<Vec<EstimationOutcome>> {
        if rows.is_empty() {
            return Ok(vec![self.run(estimates, objective_fn, executor)?]);
        }

        let mut outcomes = Vec::with_capacity(rows.len());
        for row in rows {
            for (label, value) in row {
                if let Some(e) = estimates.get_mut(label) {
                    e.set_value(*value)?;
                }
            }
            outcomes.push(self.run(estimates, Arc::clone(&objective_fn), executor)?);
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimate::Estimate;
    use crate::minimiser::MinimiserConfig;
    use fsc_core::ObjectiveAccumulator;

    fn quadratic_objective() -> UnscaledObjectiveFn {
        Arc::new(|values: &[f64]| {
            let mut acc = ObjectiveAccumulator::new();
            let score: f64 = values.iter().map(|v| (v - 3.0).powi(2)).sum();
            acc.add_likelihood(score);
            Ok(acc.finish())
        })
    }

    #[test]
    fn single_phase_run_converges_near_target() {
        let mut estimates = EstimateManager::new();
        estimates.register(Estimate::new("q", 0.0, -10.0, 10.0).unwrap()).unwrap();

        let driver = EstimationDriver::new(Minimiser::new(MinimiserConfig::default()));
        let outcome = driver
            .run(&mut estimates, quadratic_objective(), &Executor::serial())
            .unwrap();

        assert_eq!(outcome.phase_results.len(), 1);
        assert!((estimates.get("q").unwrap().value() - 3.0).abs() < 1e-2);
        assert!(outcome.final_objective.total < 1e-2);
        assert_eq!(outcome.covariance.rows(), 1);
    }

    #[test]
    fn two_phase_run_only_estimates_active_parameters() {
        let mut estimates = EstimateManager::new();
        estimates.register(Estimate::new("a", 0.0, -10.0, 10.0).unwrap()).unwrap();
        estimates
            .register(Estimate::new("b", 5.0, -10.0, 10.0).unwrap().with_phase(2))
            .unwrap();

        let driver = EstimationDriver::new(Minimiser::new(MinimiserConfig::default()));
        let outcome = driver
            .run(&mut estimates, quadratic_objective(), &Executor::serial())
            .unwrap();

        assert_eq!(outcome.phase_results.len(), 2);
        assert!((estimates.get("a").unwrap().value() - 3.0).abs() < 1e-2);
        assert!((estimates.get("b").unwrap().value() - 3.0).abs() < 1e-2);
    }

    #[test]
    fn run_for_each_row_seeds_every_row() {
        let mut estimates = EstimateManager::new();
        estimates.register(Estimate::new("q", 0.0, -10.0, 10.0).unwrap()).unwrap();
        let driver = EstimationDriver::new(Minimiser::new(MinimiserConfig::default()));

        let rows = vec![vec![("q".to_string(), -5.0)], vec![("q".to_string(), 8.0)]];
        let outcomes = driver
            .run_for_each_row(&mut estimates, &rows, quadratic_objective(), &Executor::serial())
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!((estimates.get("q").unwrap().value() - 3.0).abs() < 1e-2);
    }
}
