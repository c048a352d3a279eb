//! The top-level engine: owns the partition, the annual-cycle process
//! pipeline, the initialisation phases that equilibrate it, and the
//! observations scored against it, and exposes the single `evaluate`
//! entry point the gradient engine, minimiser, and MCMC drivers all
//! drive by way of an unscaled parameter vector.
//!
//! One `Engine` is one worker's replicated instance; the thread pool in
//! `fsc-estimation::pool` holds one per thread via [`EngineFactory`].

use crate::addressable::route_address;
use crate::initialisation::InitialisationPhase;
use crate::observation::{CollectionPoint, Observation};
use fsc_core::process::AnnualCycle;
use fsc_core::{ObjectiveAccumulator, ObjectiveValue, Partition};
use fsc_error::{FscResult, fsc_err};
use fsc_selectivity::SelectivityKind;
use std::collections::HashMap;
use std::sync::Arc;

/// Constructs a fresh, fully wired [`Engine`] — one call per worker, and
/// one call per gradient-batch perturbation when dispatched through the
/// stateless [`fsc_core::Executor`] (the richer per-worker-persistent
/// affinity lives in `fsc-estimation::pool::CandidatePool`; the simpler
/// `Executor` path this factory also serves re-builds a worker's engine
/// per call instead, since `Executor`'s pool threads do not carry
/// per-thread state).
pub type EngineFactory = Arc<dyn Fn() -> Engine + Send + Sync>;

/// The engine's mutable state, built once per worker and reset before
/// every candidate evaluation.
pub struct Engine {
    partition: Partition,
    annual_cycle: AnnualCycle,
    initial_phases: Vec<InitialisationPhase>,
    observations: Vec<Observation>,
    selectivities: HashMap<String, SelectivityKind>,
    start_year: u32,
    final_year: u32,
    /// The derived quantity an equilibrium (`DerivedQuantity`)
    /// initialisation phase tests for convergence; defaults to total
    /// partition abundance when the caller does not supply one.
    equilibrium_quantity: Arc<dyn Fn(&Partition) -> f64 + Send + Sync>,
}

impl Engine {
    pub fn new(partition: Partition, annual_cycle: AnnualCycle, start_year: u32, final_year: u32) -> FscResult<Self> {
        if final_year < start_year {
            return Err(fsc_err!(
                Verify: "engine final_year {} precedes start_year {}",
                final_year,
                start_year
            ));
        }
        Ok(Engine {
            partition,
            annual_cycle,
            initial_phases: Vec::new(),
            observations: Vec::new(),
            selectivities: HashMap::new(),
            start_year,
            final_year,
            equilibrium_quantity: Arc::new(Partition::total),
        })
    }

    pub fn with_initial_phases(mut self, phases: Vec<InitialisationPhase>) -> Self {
        self.initial_phases = phases;
        self
    }

    pub fn with_observations(mut self, observations: Vec<Observation>) -> Self {
        self.observations = observations;
        self
    }

    pub fn with_selectivities(mut self, selectivities: HashMap<String, SelectivityKind>) -> Self {
        self.selectivities = selectivities;
        self
    }

    pub fn with_equilibrium_quantity(mut self, quantity: Arc<dyn Fn(&Partition) -> f64 + Send + Sync>) -> Self {
        self.equilibrium_quantity = quantity;
        self
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Post-construction consistency pass.
    /// Structural errors propagate out and abort the run.
    pub fn validate(&self) -> FscResult<()> {
        self.partition.validate()?;
        let known_categories: Vec<String> = self.partition.iter().map(|c| c.label.clone()).collect();
        for phase in &self.initial_phases {
            phase.validate_against(&known_categories)?;
        }
        Ok(())
    }

    /// Restores the partition to its zero state ahead of a fresh
    /// evaluation; caches that
    /// depend on just-mutated estimate values are re-primed implicitly
    /// the next time a process or selectivity is evaluated, since this
    /// workspace's caches are dense lookups recomputed from current
    /// parameters rather than explicitly invalidated.
    pub fn reset(&mut self) {
        self.partition.reset();
    }

    /// Runs every initialisation phase once, then the declared year
    /// range, collecting observation scores at each time step's
    /// collection point as it goes.
    pub fn execute_all(&mut self, objective: &mut ObjectiveAccumulator) -> FscResult<()> {
        let equilibrium_quantity = Arc::clone(&self.equilibrium_quantity);
        for phase in self.initial_phases.clone() {
            phase.execute(&mut self.annual_cycle, &mut self.partition, objective, &|p: &Partition| {
                equilibrium_quantity(p)
            })?;
        }

        for year in self.start_year..=self.final_year {
            for time_step in 0..self.annual_cycle.num_time_steps() {
                self.annual_cycle.execute_time_step(&mut self.partition, year, time_step, objective)?;
                let point = CollectionPoint { year, time_step };
                for obs in self.observations.iter().filter(|o| o.collection_point == point) {
                    objective.add_likelihood(obs.score(&self.partition)?);
                }
            }
        }
        Ok(())
    }

    /// Routes one estimate's unscaled value onto the engine-owned object
    /// its dotted address names.
    pub fn apply_estimate(&mut self, label: &str, value: f64) -> FscResult<()> {
        route_address(label, &mut self.selectivities, &mut self.annual_cycle, value)
    }

    /// Runs the full Reset→Execute→Finalise lifecycle for one candidate
    /// and returns its finalised objective, never raising — an arithmetic
    /// or range error during execution is recovered locally as an
    /// infinite objective.
    pub fn evaluate(&mut self, labels: &[String], values: &[f64]) -> ObjectiveValue {
        for (label, &value) in labels.iter().zip(values.iter()) {
            if self.apply_estimate(label, value).is_err() {
                return ObjectiveAccumulator::infinite();
            }
        }
        self.reset();
        let mut objective = ObjectiveAccumulator::new();
        match self.execute_all(&mut objective) {
            Ok(()) => objective.finish(),
            Err(_) => ObjectiveAccumulator::infinite(),
        }
    }
}

/// Adapts [`Engine::evaluate`] to [`fsc_estimation::pool::CandidateEvaluator`]
/// for use with `CandidatePool`: each pool
/// worker holds one `EngineEvaluator`, constructed once from its factory
/// at thread launch and reused across every candidate it evaluates.
pub struct EngineEvaluator {
    engine: Engine,
    labels: Vec<String>,
}

impl EngineEvaluator {
    pub fn new(engine: Engine, labels: Vec<String>) -> Self {
        EngineEvaluator { engine, labels }
    }
}

impl fsc_estimation::pool::CandidateEvaluator for EngineEvaluator {
    fn evaluate(&mut self, candidate: &[f64]) -> f64 {
        self.engine.evaluate(&self.labels, candidate).total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsc_core::process::{Process, ProcessContext, ProcessKind};
    use fsc_core::Likelihood;
    use std::sync::Arc as StdArc;

    #[derive(Debug)]
    struct ConstantRecruit {
        label: String,
        category: String,
        amount: f64,
    }
    impl Process for ConstantRecruit {
        fn label(&self) -> &str {
            &self.label
        }
        fn param_names(&self) -> &'static [&'static str] {
            &["amount"]
        }
        fn set_param(&mut self, name: &str, value: f64) -> FscResult<()> {
            if name == "amount" {
                self.amount = value;
                Ok(())
            } else {
                Err(fsc_err!(Error: "no such param"))
            }
        }
        fn execute(
            &mut self,
            partition: &mut Partition,
            _ctx: ProcessContext,
            _objective: &mut ObjectiveAccumulator,
        ) -> FscResult<()> {
            partition.get_mut(&self.category).unwrap().data_mut()[0] += self.amount;
            Ok(())
        }
    }

    fn build_engine() -> Engine {
        let partition = Partition::build([("fish".to_string(), 0, 2)]).unwrap();
        let cycle = AnnualCycle::new(vec![vec![ProcessKind::Recruitment(Box::new(ConstantRecruit {
            label: "recruit".into(),
            category: "fish".into(),
            amount: 10.0,
        }))]]);
        Engine::new(partition, cycle, 2020, 2021).unwrap()
    }

    #[test]
    fn execute_all_runs_every_declared_year() {
        let mut engine = build_engine();
        let mut objective = ObjectiveAccumulator::new();
        engine.execute_all(&mut objective).unwrap();
        assert_eq!(engine.partition().get("fish").unwrap().data()[0], 20.0);
    }

    #[test]
    fn evaluate_applies_process_addressable_before_running() {
        let mut engine = build_engine();
        let labels = vec!["process[recruit].amount".to_string()];
        let value = engine.evaluate(&labels, &[5.0]);
        assert!(value.is_finite());
        assert_eq!(engine.partition().get("fish").unwrap().data()[0], 10.0);
    }

    #[test]
    fn unknown_addressable_yields_infinite_objective() {
        let mut engine = build_engine();
        let labels = vec!["process[does_not_exist].amount".to_string()];
        let value = engine.evaluate(&labels, &[5.0]);
        assert!(!value.is_finite());
    }

    #[test]
    fn observation_score_is_included_at_its_collection_point() {
        let mut engine = build_engine();
        let dq = StdArc::new(crate::observation::DerivedQuantity::new(
            "total",
            StdArc::new(|p: &Partition| p.total()),
        ));
        let obs = Observation::from_derived_quantity(
            "total_index",
            CollectionPoint { year: 2020, time_step: 0 },
            Likelihood::Lognormal { sigma: 0.3 },
            10.0,
            dq,
        )
        .unwrap();
        engine = engine.with_observations(vec![obs]);
        let mut objective = ObjectiveAccumulator::new();
        engine.execute_all(&mut objective).unwrap();
        let value = objective.finish();
        assert!(value.likelihood.is_finite() && value.likelihood > 0.0);
    }
}
