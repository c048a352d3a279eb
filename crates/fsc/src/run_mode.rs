//! Run-mode dispatch: "the driver invokes the appropriate
//! top-level routine after build." `fsc` does not parse a `--mode` flag
//! (command-line handling is out of scope) — it exposes one
//! typed entry point per mode for a CLI collaborator to call once it has
//! parsed `basic`/`estimation`/`mcmc`/... off the command line.

use crate::engine::{Engine, EngineEvaluator, EngineFactory};
use fsc_core::{Executor, ObjectiveValue};
use fsc_estimation::driver::{EstimationDriver, EstimationOutcome, UnscaledObjectiveFn};
use fsc_estimation::estimate::EstimateManager;
use fsc_estimation::minimiser::Minimiser;
use fsc_estimation::pool::CandidatePool;
use fsc_estimation::scale::{boundary_penalty, scale, unscale};
use fsc_mcmc::chain::Chain;
use fsc_mcmc::hmc::{Hmc, HmcConfig};
use fsc_mcmc::rwmh::{Rwmh, RwmhConfig};
use fsc_core::Matrix;
use fsc_error::FscResult;
use std::sync::Arc;

/// The seven run modes lists as consumed by the core. `fsc`
/// itself only implements the four that are this crate's concern
/// (`Basic`, `Estimation`, `Mcmc`, and `Testing` as an alias of `Basic`
/// with warnings promoted); `Profiling`, `Projection`, and
/// `Simulation` are variations on `Basic`/`Estimation` a caller selects
/// by how it configures the engine (a longer projected year range, a
/// profiled parameter held fixed, …) rather than by a different code
/// path inside the core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    Basic,
    Estimation,
    Mcmc,
    Profiling,
    Projection,
    Simulation,
    Testing,
}

/// Builds the [`UnscaledObjectiveFn`] every driver in this module takes:
/// construct a fresh engine from `factory`, apply the candidate by label,
/// run it, and finalise — matching the estimation driver's own
/// "apply candidate → full model iteration → objective" contract
/// without this crate reaching into `CandidatePool`'s persistent-worker
/// affinity for the (much higher call count) gradient and MCMC paths.
pub fn unscaled_objective_fn(factory: EngineFactory, labels: Vec<String>) -> UnscaledObjectiveFn {
    Arc::new(move |values: &[f64]| -> FscResult<ObjectiveValue> {
        let mut engine = factory();
        Ok(engine.evaluate(&labels, values))
    })
}

/// Mode `basic`: one full model iteration at the engine's
/// current estimate values, no minimisation or sampling.
pub fn run_basic(mut engine: Engine) -> FscResult<ObjectiveValue> {
    engine.validate()?;
    let mut objective = fsc_core::ObjectiveAccumulator::new();
    engine.reset();
    engine.execute_all(&mut objective)?;
    Ok(objective.finish())
}

/// Mode `estimation`: the full phase loop, driven by the
/// estimate manager's own phase/bounds metadata. `num_workers` selects
/// between a serial executor and a seeded worker pool for the gradient
/// engine's batch dispatch.
pub fn run_estimation(
    factory: EngineFactory,
    estimates: &mut EstimateManager,
    minimiser: Minimiser,
    num_workers: usize,
    master_seed: u64,
) -> FscResult<EstimationOutcome> {
    let executor = if num_workers <= 1 {
        Executor::serial()
    } else {
        Executor::worker_pool_with_seed(num_workers, master_seed)
    };
    let labels = estimates.labels().to_vec();
    let objective_fn = unscaled_objective_fn(factory, labels);
    let driver = EstimationDriver::new(minimiser);
    driver.run(estimates, objective_fn, &executor)
}

/// Evaluates a batch of candidate unscaled parameter vectors against a
/// pool of persistent per-worker engine instances — the richer sibling `run_estimation`'s
/// gradient-driven path does not need, useful for e.g. a profiling sweep
/// over many fixed values of one parameter.
pub fn run_candidates(
    factory: EngineFactory,
    labels: Vec<String>,
    num_workers: usize,
    master_seed: u64,
    candidates: Vec<Vec<f64>>,
) -> Vec<f64> {
    let pool = CandidatePool::new(num_workers, master_seed, {
        let labels = labels.clone();
        move |_worker_index| EngineEvaluator::new(factory(), labels.clone())
    });
    pool.run_candidates(candidates)
}

/// Mode `mcmc` with the random-walk Metropolis-Hastings
/// driver, seeded from the minimiser's MPD (`initial_values`,
/// `covariance`) "seeded from the minimiser's MPD".
pub fn run_mcmc_rwmh(
    factory: EngineFactory,
    labels: Vec<String>,
    bounds: Vec<(f64, f64)>,
    initial_values: Vec<f64>,
    covariance: Matrix,
    initial_objective: &ObjectiveValue,
    config: RwmhConfig,
    num_iterations: usize,
) -> FscResult<Chain> {
    let objective_fn = unscaled_objective_fn(factory, labels);
    let mut rwmh = Rwmh::new(config, bounds, initial_values, covariance, initial_objective)?;
    rwmh.run(num_iterations, objective_fn)?;
    Ok(rwmh.chain().clone())
}

/// Mode `mcmc` with the Hamiltonian Monte Carlo driver. `bounds` provide
/// the tan/atan scaling HMC's leapfrog integrator runs under;
/// `initial_scaled` is the minimiser's terminal scaled point.
pub fn run_mcmc_hmc(
    factory: EngineFactory,
    labels: Vec<String>,
    bounds: Vec<(f64, f64)>,
    initial_scaled: Vec<f64>,
    initial_objective: &ObjectiveValue,
    config: HmcConfig,
    num_iterations: usize,
    num_workers: usize,
    master_seed: u64,
) -> FscResult<Chain> {
    let executor = if num_workers <= 1 {
        Executor::serial()
    } else {
        Executor::worker_pool_with_seed(num_workers, master_seed)
    };
    let unscaled_fn = unscaled_objective_fn(factory, labels);
    let scaled_bounds = bounds.clone();
    let scaled_objective: fsc_estimation::gradient::ScaledObjectiveFn = Arc::new(move |s: &[f64]| {
        let mut boundary = 0.0;
        let unscaled: Vec<f64> = s
            .iter()
            .zip(scaled_bounds.iter())
            .map(|(&si, &(lower, upper))| {
                boundary += boundary_penalty(si);
                unscale(si, lower, upper)
            })
            .collect();
        match unscaled_fn(&unscaled) {
            Ok(value) if value.is_finite() => value.total + boundary,
            _ => f64::INFINITY,
        }
    });

    let mut hmc = Hmc::new(config, bounds, initial_scaled, initial_objective);
    hmc.run(num_iterations, scaled_objective, &executor)?;
    Ok(hmc.chain().clone())
}

/// Rescales an unscaled value vector into the scaled space HMC operates
/// in, given the same bounds `run_mcmc_hmc` was seeded with — a small
/// convenience so a caller handing the estimation driver's final
/// (unscaled) MPD values to HMC does not have to call [`scale`] per
/// component itself.
pub fn scale_all(values: &[f64], bounds: &[(f64, f64)]) -> Vec<f64> {
    values
        .iter()
        .zip(bounds.iter())
        .map(|(&p, &(lower, upper))| scale(p, lower, upper))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsc_core::process::{AnnualCycle, Process, ProcessContext, ProcessKind};
    use fsc_core::{ObjectiveAccumulator, Partition};
    use fsc_estimation::estimate::Estimate;
    use fsc_estimation::minimiser::MinimiserConfig;

    #[derive(Debug)]
    struct QuadraticPull {
        label: String,
        category: String,
        target: f64,
    }
    impl Process for QuadraticPull {
        fn label(&self) -> &str {
            &self.label
        }
        fn param_names(&self) -> &'static [&'static str] {
            &["target"]
        }
        fn set_param(&mut self, name: &str, value: f64) -> FscResult<()> {
            if name == "target" {
                self.target = value;
                Ok(())
            } else {
                Err(fsc_error::fsc_err!(Error: "no such param"))
            }
        }
        fn execute(
            &mut self,
            partition: &mut Partition,
            _ctx: ProcessContext,
            _objective: &mut ObjectiveAccumulator,
        ) -> FscResult<()> {
            partition.get_mut(&self.category).unwrap().data_mut()[0] = self.target;
            Ok(())
        }
    }

    fn make_factory() -> EngineFactory {
        Arc::new(|| {
            let partition = Partition::build([("fish".to_string(), 0, 1)]).unwrap();
            let cycle = AnnualCycle::new(vec![vec![ProcessKind::Recruitment(Box::new(QuadraticPull {
                label: "pull".into(),
                category: "fish".into(),
                target: 0.0,
            }))]]);
            Engine::new(partition, cycle, 2020, 2020).unwrap()
        })
    }

    #[test]
    fn run_estimation_converges_a_single_addressable_parameter() {
        let factory = make_factory();
        let mut estimates = EstimateManager::new();
        estimates
            .register(Estimate::new("process[pull].target", 0.0, -100.0, 100.0).unwrap())
            .unwrap();

        let minimiser = Minimiser::new(MinimiserConfig::default());
        let outcome = run_estimation(factory, &mut estimates, minimiser, 1, 7).unwrap();

        assert!(!outcome.phase_results.is_empty());
        assert!(outcome.final_objective.is_finite());
    }

    #[test]
    fn run_candidates_evaluates_every_submitted_vector() {
        let factory = make_factory();
        let labels = vec!["process[pull].target".to_string()];
        let candidates = vec![vec![1.0], vec![2.0], vec![3.0]];
        let scores = run_candidates(factory, labels, 2, 11, candidates);
        assert_eq!(scores.len(), 3);
        assert!(scores.iter().all(|s| s.is_finite()));
    }
}
