//! Random-walk Metropolis-Hastings: proposes a joint jump
//! scaled by the current covariance, rejects immediately on an
//! out-of-bounds candidate, and adapts its step size toward a target
//! acceptance rate.

use crate::chain::{AcceptanceTracker, Chain, ChainLink};
use crate::proposal::{Proposal, ProposalKind};
use fsc_core::Matrix;
use fsc_core::domain::random_provider;
use fsc_error::{FscResult, fsc_err};
use std::sync::Arc;

pub type UnscaledObjectiveFn = Arc<dyn Fn(&[f64]) -> FscResult<fsc_core::ObjectiveValue> + Send + Sync>;

/// Default target acceptance rate.
pub const DEFAULT_TARGET_ACCEPTANCE: f64 = 0.234;

#[derive(Clone, Debug)]
pub struct RwmhConfig {
    pub burn_in: usize,
    pub keep: usize,
    pub initial_step_size: f64,
    pub target_acceptance: f64,
    pub adapt_interval: usize,
    pub adapt_covariance_interval: Option<usize>,
    pub proposal: ProposalKind,
}

impl Default for RwmhConfig {
    fn default() -> Self {
        RwmhConfig {
            burn_in: 1000,
            keep: 1,
            initial_step_size: 1.0,
            target_acceptance: DEFAULT_TARGET_ACCEPTANCE,
            adapt_interval: 100,
            adapt_covariance_interval: None,
            proposal: ProposalKind::Mvn,
        }
    }
}

pub struct Rwmh {
    config: RwmhConfig,
    bounds: Vec<(f64, f64)>,
    chain: Chain,
    tracker: AcceptanceTracker,
    proposal: Proposal,
    step_size: f64,
    covariance: Matrix,
    cholesky: Matrix,
    current_values: Vec<f64>,
}

impl Rwmh {
    /// Seeds the chain from the minimiser's MPD: `initial_values` is the
    /// estimate vector at the mode, `covariance` its recovered (unscaled)
    /// covariance.
    pub fn new(
        config: RwmhConfig,
        bounds: Vec<(f64, f64)>,
        initial_values: Vec<f64>,
        covariance: Matrix,
        initial_objective: &fsc_core::ObjectiveValue,
    ) -> FscResult<Self> {
        if initial_values.len() != bounds.len() {
            return Err(fsc_err!(
                CodeError: "rwmh initial values length {} does not match bounds length {}",
                initial_values.len(),
                bounds.len()
            ));
        }
        let cholesky = cholesky_or_identity(&covariance);
        let mut chain = Chain::new();
        chain.push(ChainLink::from_objective(
            0,
            config.burn_in,
            initial_objective,
            1.0,
            1.0,
            config.initial_step_size,
            initial_values.clone(),
        ));

        Ok(Rwmh {
            step_size: config.initial_step_size,
            proposal: Proposal::new(config.proposal),
            chain,
            tracker: AcceptanceTracker::new(),
            covariance,
            cholesky,
            current_values: initial_values,
            bounds,
            config,
        })
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Runs one iteration of the chain at the given 1-based `iteration`
    /// index, evaluating the objective at the candidate only when it
    /// falls within bounds.
    pub fn step(&mut self, iteration: usize, objective_fn: &UnscaledObjectiveFn) -> FscResult<()> {
        let delta = self.proposal.draw(self.step_size, &self.cholesky);
        let candidate: Vec<f64> = self.current_values.iter().zip(delta.iter()).map(|(v, d)| v + d).collect();

        let in_bounds = candidate
            .iter()
            .zip(self.bounds.iter())
            .all(|(&v, &(lower, upper))| v >= lower && v <= upper);

        let previous_score = self.chain.last().map(|l| l.total_score).unwrap_or(f64::INFINITY);

        let (accepted, objective, values) = if !in_bounds {
            (false, None, self.current_values.clone())
        } else {
            let objective = objective_fn(&candidate)?;
            let accept_ratio = (previous_score - objective.total).exp().min(1.0);
            if objective.is_finite() && random_provider::unit_uniform() < accept_ratio {
                (true, Some(objective), candidate)
            } else {
                (false, Some(objective), self.current_values.clone())
            }
        };

        self.tracker.record(accepted);
        if accepted {
            self.current_values = values.clone();
        }

        if iteration % self.config.adapt_interval == 0 {
            if self.tracker.rate_since_adapt() < self.config.target_acceptance {
                self.step_size *= 0.8;
            } else {
                self.step_size *= 1.25;
            }
            tracing::debug!(iteration, step_size = self.step_size, "rwmh: step size adapted");
            self.tracker.reset_adapt_window();
        }

        if let Some(interval) = self.config.adapt_covariance_interval {
            if interval > 0 && iteration % interval == 0 {
                if let Some(cov) = self.chain.sample_covariance() {
                    self.covariance = cov;
                    self.cholesky = cholesky_or_identity(&self.covariance);
                }
            }
        }

        if iteration % self.config.keep == 0 {
            let recorded_objective = objective.unwrap_or_else(|| self.chain.last().expect("chain seeded").clone_objective());
            self.chain.push(ChainLink::from_objective(
                iteration,
                self.config.burn_in,
                &recorded_objective,
                self.tracker.rate(),
                self.tracker.rate_since_adapt(),
                self.step_size,
                self.current_values.clone(),
            ));
        }

        Ok(())
    }

    pub fn run(&mut self, num_iterations: usize, objective_fn: UnscaledObjectiveFn) -> FscResult<()> {
        for iteration in 1..=num_iterations {
            self.step(iteration, &objective_fn)?;
        }
        Ok(())
    }
}

fn cholesky_or_identity(m: &Matrix) -> Matrix {
    m.cholesky().unwrap_or_else(|| Matrix::identity(m.rows().max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsc_core::ObjectiveAccumulator;

    fn quadratic_objective() -> UnscaledObjectiveFn {
        Arc::new(|v: &[f64]| {
            let mut acc = ObjectiveAccumulator::new();
            acc.add_likelihood(v.iter().map(|x| x * x).sum());
            Ok(acc.finish())
        })
    }

    fn initial_objective() -> fsc_core::ObjectiveValue {
        let mut acc = ObjectiveAccumulator::new();
        acc.add_likelihood(0.0);
        acc.finish()
    }

    #[test]
    fn chain_seeds_with_one_link_at_construction() {
        let rwmh = Rwmh::new(
            RwmhConfig::default(),
            vec![(-10.0, 10.0)],
            vec![0.0],
            Matrix::identity(1),
            &initial_objective(),
        )
        .unwrap();
        assert_eq!(rwmh.chain().len(), 1);
    }

    #[test]
    fn keep_rule_only_appends_on_stride() {
        let mut rwmh = Rwmh::new(
            RwmhConfig { keep: 5, adapt_interval: 1000, ..RwmhConfig::default() },
            vec![(-10.0, 10.0)],
            vec![0.0],
            Matrix::identity(1),
            &initial_objective(),
        )
        .unwrap();
        rwmh.run(12, quadratic_objective()).unwrap();
        // seed link + links at iterations 5 and 10
        assert_eq!(rwmh.chain().len(), 3);
    }

    #[test]
    fn every_kept_value_respects_declared_bounds() {
        let bounds = vec![(-1.0, 1.0)];
        let mut rwmh = Rwmh::new(
            RwmhConfig { initial_step_size: 5.0, keep: 1, adapt_interval: 10, ..RwmhConfig::default() },
            bounds.clone(),
            vec![0.0],
            Matrix::identity(1),
            &initial_objective(),
        )
        .unwrap();
        rwmh.run(50, quadratic_objective()).unwrap();
        for link in rwmh.chain().links() {
            for (&v, &(lower, upper)) in link.parameter_values.iter().zip(bounds.iter()) {
                assert!(v >= lower && v <= upper, "v={v}");
            }
        }
    }

    #[test]
    fn step_size_adapts_toward_target() {
        let mut rwmh = Rwmh::new(
            RwmhConfig { adapt_interval: 20, initial_step_size: 0.01, ..RwmhConfig::default() },
            vec![(-100.0, 100.0)],
            vec![0.0],
            Matrix::identity(1),
            &initial_objective(),
        )
        .unwrap();
        let before = rwmh.step_size;
        rwmh.run(20, quadratic_objective()).unwrap();
        assert_ne!(rwmh.step_size, before);
    }
}
