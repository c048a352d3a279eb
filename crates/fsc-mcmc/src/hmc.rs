//! Hamiltonian Monte Carlo: a leapfrog integrator operating entirely in
//! scaled space, unscaling only to invoke the model, following the same
//! `Chain`/acceptance/rejection contract as [`crate::rwmh::Rwmh`].

use crate::chain::{AcceptanceTracker, Chain, ChainLink};
use fsc_core::domain::random_provider;
use fsc_estimation::gradient::{Gradient, ScaledObjectiveFn};
use fsc_estimation::scale::unscale;
use fsc_core::{Executor, ObjectiveValue};
use fsc_error::FscResult;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct HmcConfig {
    pub burn_in: usize,
    pub keep: usize,
    pub leapfrog_steps: usize,
    pub leapfrog_delta: f64,
    pub gradient_step_size: f64,
}

impl Default for HmcConfig {
    fn default() -> Self {
        HmcConfig {
            burn_in: 1000,
            keep: 1,
            leapfrog_steps: 10,
            leapfrog_delta: 0.05,
            gradient_step_size: fsc_estimation::gradient::DEFAULT_GRADIENT_STEP_SIZE,
        }
    }
}

pub struct Hmc {
    config: HmcConfig,
    bounds: Vec<(f64, f64)>,
    chain: Chain,
    tracker: AcceptanceTracker,
    gradient: Gradient,
    current_scaled: Vec<f64>,
}

impl Hmc {
    /// Seeds the chain from the minimiser's MPD in scaled space;
    /// `initial_scaled` is the terminal scaled vector the minimiser
    /// converged on.
    pub fn new(config: HmcConfig, bounds: Vec<(f64, f64)>, initial_scaled: Vec<f64>, initial_objective: &ObjectiveValue) -> Self {
        let mut chain = Chain::new();
        let unscaled_values = unscale_all(&initial_scaled, &bounds);
        chain.push(ChainLink::from_objective(0, config.burn_in, initial_objective, 1.0, 1.0, config.leapfrog_delta, unscaled_values));

        Hmc {
            gradient: Gradient::new(config.gradient_step_size),
            chain,
            tracker: AcceptanceTracker::new(),
            current_scaled: initial_scaled,
            bounds,
            config,
        }
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Runs one leapfrog trajectory and Metropolis accept/reject step.
    /// `objective` scores a scaled point directly (the driver unscales
    /// internally before invoking the full model, the same way the
    /// estimation driver's scaled objective does).
    pub fn step(&mut self, iteration: usize, objective: &ScaledObjectiveFn, executor: &Executor) -> FscResult<()> {
        let n = self.current_scaled.len();
        let p0: Vec<f64> = (0..n).map(|_| random_provider::standard_normal()).collect();

        let mut q = self.current_scaled.clone();
        let mut p = p0.clone();

        let f_q = objective(&q);
        let mut grad = self.gradient.compute(&q, f_q, objective, executor);

        for _ in 0..self.config.leapfrog_steps {
            for i in 0..n {
                p[i] += (self.config.leapfrog_delta / 2.0) * (-grad[i]);
            }
            for i in 0..n {
                q[i] += self.config.leapfrog_delta * p[i];
            }
            let f_q_new = objective(&q);
            grad = self.gradient.compute(&q, f_q_new, objective, executor);
            for i in 0..n {
                p[i] += (self.config.leapfrog_delta / 2.0) * (-grad[i]);
            }
        }

        let previous_score = self.chain.last().map(|l| l.total_score).unwrap_or(f64::INFINITY);
        let new_score = objective(&q);

        let in_bounds = unscale_all(&q, &self.bounds)
            .iter()
            .zip(self.bounds.iter())
            .all(|(&v, &(lower, upper))| v >= lower && v <= upper);

        let accept_ratio = (previous_score - new_score).exp().min(1.0);
        let accepted = in_bounds && new_score.is_finite() && random_provider::unit_uniform() < accept_ratio;

        self.tracker.record(accepted);
        if accepted {
            self.current_scaled = q;
        }

        if iteration % self.config.keep == 0 {
            let acc_value = if accepted {
                ObjectiveValue {
                    total: new_score,
                    likelihood: new_score,
                    prior: 0.0,
                    penalty: 0.0,
                    additional_priors: 0.0,
                    jacobians: 0.0,
                }
            } else {
                self.chain.last().expect("chain seeded").clone_objective()
            };
            self.chain.push(ChainLink::from_objective(
                iteration,
                self.config.burn_in,
                &acc_value,
                self.tracker.rate(),
                self.tracker.rate(),
                self.config.leapfrog_delta,
                unscale_all(&self.current_scaled, &self.bounds),
            ));
        }

        Ok(())
    }

    pub fn run(&mut self, num_iterations: usize, objective: ScaledObjectiveFn, executor: &Executor) -> FscResult<()> {
        for iteration in 1..=num_iterations {
            self.step(iteration, &objective, executor)?;
        }
        Ok(())
    }
}

fn unscale_all(scaled: &[f64], bounds: &[(f64, f64)]) -> Vec<f64> {
    scaled
        .iter()
        .zip(bounds.iter())
        .map(|(&s, &(lower, upper))| unscale(s, lower, upper))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsc_core::ObjectiveAccumulator;

    fn objective() -> ScaledObjectiveFn {
        Arc::new(|s: &[f64]| s.iter().map(|v| v * v).sum())
    }

    fn initial_objective_value() -> ObjectiveValue {
        let mut acc = ObjectiveAccumulator::new();
        acc.add_likelihood(0.0);
        acc.finish()
    }

    #[test]
    fn chain_seeds_with_one_link_at_construction() {
        let hmc = Hmc::new(HmcConfig::default(), vec![(-10.0, 10.0)], vec![0.0], &initial_objective_value());
        assert_eq!(hmc.chain().len(), 1);
    }

    #[test]
    fn leapfrog_trajectory_preserves_finite_state() {
        let mut hmc = Hmc::new(
            HmcConfig { leapfrog_steps: 5, leapfrog_delta: 0.01, ..HmcConfig::default() },
            vec![(-10.0, 10.0)],
            vec![0.0],
            &initial_objective_value(),
        );
        hmc.run(10, objective(), &Executor::serial()).unwrap();
        for link in hmc.chain().links() {
            assert!(link.parameter_values.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn every_kept_value_respects_declared_bounds() {
        let bounds = vec![(-1.0, 1.0)];
        let mut hmc = Hmc::new(
            HmcConfig { leapfrog_steps: 8, leapfrog_delta: 0.1, ..HmcConfig::default() },
            bounds.clone(),
            vec![0.0],
            &initial_objective_value(),
        );
        hmc.run(20, objective(), &Executor::serial()).unwrap();
        for link in hmc.chain().links() {
            for (&v, &(lower, upper)) in link.parameter_values.iter().zip(bounds.iter()) {
                assert!(v >= lower && v <= upper, "v={v}");
            }
        }
    }
}
