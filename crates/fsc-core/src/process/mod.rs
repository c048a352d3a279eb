//! The annual-cycle pipeline: a declared-order sequence of processes run
//! against the partition once per time step, dispatched through a tagged
//! enum so the hot loop never pays for dynamic dispatch on the common
//! built-in families while still allowing a custom process to plug in as
//! a trait object.

pub mod builtin;

use crate::objective::{ObjectiveAccumulator, Penalty};
use crate::partition::{CLAMP_TOLERANCE, Partition};
use fsc_error::{FscResult, fsc_err};

/// The (year, time-step) coordinates injected into every process
/// invocation, plus whether this call is part of a pre-run initialisation
/// loop (which does not advance the model year).
#[derive(Clone, Copy, Debug)]
pub struct ProcessContext {
    pub year: u32,
    pub time_step: usize,
    pub initialising: bool,
}

/// Shared contract every process — built-in or custom — implements.
/// `execute` mutates category data in place and reports any penalty it
/// raises (non-negativity clamp beyond tolerance, mass-preservation
/// violation) onto the objective accumulator for the current iteration.
pub trait Process: std::fmt::Debug {
    fn label(&self) -> &str;

    /// Whether this process must preserve total abundance across its
    /// execution (ageing, maturation, transition); used to decide whether
    /// to run the mass-preservation check after `execute`.
    fn is_mass_preserving(&self) -> bool {
        false
    }

    /// Named scalar parameters this process exposes as estimate
    /// addressables; most built-in processes have
    /// nothing to expose and keep the default empty list.
    fn param_names(&self) -> &'static [&'static str] {
        &[]
    }

    fn get_param(&self, _name: &str) -> Option<f64> {
        None
    }

    fn set_param(&mut self, name: &str, _value: f64) -> FscResult<()> {
        Err(fsc_err!(
            Error: "process '{}' has no addressable parameter named '{}'",
            self.label(),
            name
        ))
    }

    fn execute(
        &mut self,
        partition: &mut Partition,
        ctx: ProcessContext,
        objective: &mut ObjectiveAccumulator,
    ) -> FscResult<()>;
}

/// Tagged dispatch for the built-in process families, avoiding a vtable
/// call in the common case; `Custom` falls back to a trait object for
/// anything else.
#[derive(Debug)]
pub enum ProcessKind {
    Recruitment(Box<dyn Process>),
    Mortality(Box<dyn Process>),
    Ageing(Box<dyn Process>),
    Maturation(Box<dyn Process>),
    Tagging(Box<dyn Process>),
    Transition(Box<dyn Process>),
    Custom(Box<dyn Process>),
}

impl ProcessKind {
    fn inner(&self) -> &dyn Process {
        match self {
            ProcessKind::Recruitment(p)
            | ProcessKind::Mortality(p)
            | ProcessKind::Ageing(p)
            | ProcessKind::Maturation(p)
            | ProcessKind::Tagging(p)
            | ProcessKind::Transition(p)
            | ProcessKind::Custom(p) => p.as_ref(),
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Process {
        match self {
            ProcessKind::Recruitment(p)
            | ProcessKind::Mortality(p)
            | ProcessKind::Ageing(p)
            | ProcessKind::Maturation(p)
            | ProcessKind::Tagging(p)
            | ProcessKind::Transition(p)
            | ProcessKind::Custom(p) => p.as_mut(),
        }
    }

    pub fn label(&self) -> &str {
        self.inner().label()
    }

    pub fn set_param(&mut self, name: &str, value: f64) -> FscResult<()> {
        self.inner_mut().set_param(name, value)
    }

    fn is_mass_preserving(&self) -> bool {
        matches!(
            self,
            ProcessKind::Ageing(_) | ProcessKind::Maturation(_) | ProcessKind::Transition(_)
        ) || self.inner().is_mass_preserving()
    }

    fn execute(
        &mut self,
        partition: &mut Partition,
        ctx: ProcessContext,
        objective: &mut ObjectiveAccumulator,
    ) -> FscResult<()> {
        let mass_preserving = self.is_mass_preserving();
        let before = if mass_preserving {
            Some(partition.total())
        } else {
            None
        };

        self.inner_mut().execute(partition, ctx, objective)?;

        for category in partition.iter_mut() {
            let pre_clamp_total = category.total();
            let removed = category.clamp_non_negative();
            if removed > CLAMP_TOLERANCE * pre_clamp_total.abs().max(1.0) {
                objective.push_penalty(Penalty::new(
                    format!("{}.non_negativity.{}", self.label(), category.label),
                    removed,
                ));
            }
        }

        if let Some(before) = before {
            let after = partition.total();
            if (after - before).abs() > CLAMP_TOLERANCE * before.abs().max(1.0) {
                objective.push_penalty(Penalty::new(
                    format!("{}.mass_preservation", self.label()),
                    (after - before).abs(),
                ));
            }
        }

        Ok(())
    }
}

/// The declared-order sequence of processes run once per time step. Time
/// steps run strictly in order; all processes of step *k* complete before
/// step *k+1* starts.
pub struct AnnualCycle {
    time_steps: Vec<Vec<ProcessKind>>,
}

impl AnnualCycle {
    pub fn new(time_steps: Vec<Vec<ProcessKind>>) -> Self {
        AnnualCycle { time_steps }
    }

    pub fn num_time_steps(&self) -> usize {
        self.time_steps.len()
    }

    /// Runs every time step's processes in declaration order, in turn,
    /// once, and returns the accumulated objective contributions for the
    /// year. Observation snapshots at time-step boundaries are the
    /// caller's responsibility — this only advances the partition.
    pub fn execute(
        &mut self,
        partition: &mut Partition,
        year: u32,
        objective: &mut ObjectiveAccumulator,
    ) -> FscResult<()> {
        for time_step in 0..self.time_steps.len() {
            self.execute_time_step(partition, year, time_step, objective)?;
        }
        Ok(())
    }

    /// Runs a single time step's processes in declaration order, letting a
    /// caller (the top-level engine) interleave an observation snapshot
    /// between time steps instead of running the whole year at once.
    pub fn execute_time_step(
        &mut self,
        partition: &mut Partition,
        year: u32,
        time_step: usize,
        objective: &mut ObjectiveAccumulator,
    ) -> FscResult<()> {
        let ctx = ProcessContext {
            year,
            time_step,
            initialising: false,
        };
        for process in self.time_steps[time_step].iter_mut() {
            process.execute(partition, ctx, objective)?;
        }
        Ok(())
    }

    /// Looks up a process by its declared label across every time step,
    /// for routing an estimate's addressable update to the right object.
    pub fn set_process_param(&mut self, process_label: &str, param: &str, value: f64) -> FscResult<()> {
        for processes in self.time_steps.iter_mut() {
            for process in processes.iter_mut() {
                if process.label() == process_label {
                    return process.set_param(param, value);
                }
            }
        }
        Err(fsc_err!(Error: "no process named '{}' in the annual cycle", process_label))
    }

    /// Loops the annual cycle `iterations` times against the partition
    /// without advancing the model year, used to equilibrate an
    /// initialisation phase before the modelled time series begins.
    pub fn execute_for_initialisation(
        &mut self,
        partition: &mut Partition,
        phase_label: &str,
        iterations: u32,
        objective: &mut ObjectiveAccumulator,
    ) -> FscResult<()> {
        if iterations == 0 {
            return Err(fsc_err!(
                Verify: "initialisation phase '{}' requires at least one iteration",
                phase_label
            ));
        }
        for _ in 0..iterations {
            for (time_step, processes) in self.time_steps.iter_mut().enumerate() {
                let ctx = ProcessContext {
                    year: 0,
                    time_step,
                    initialising: true,
                };
                for process in processes.iter_mut() {
                    process.execute(partition, ctx, objective)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct ConstantGrowth {
        label: String,
        amount: f64,
    }

    impl Process for ConstantGrowth {
        fn label(&self) -> &str {
            &self.label
        }

        fn execute(
            &mut self,
            partition: &mut Partition,
            _ctx: ProcessContext,
            _objective: &mut ObjectiveAccumulator,
        ) -> FscResult<()> {
            for category in partition.iter_mut() {
                for v in category.data_mut() {
                    *v += self.amount;
                }
            }
            Ok(())
        }
    }

    #[derive(Debug)]
    struct ZeroingAgeing {
        label: String,
    }

    impl Process for ZeroingAgeing {
        fn label(&self) -> &str {
            &self.label
        }

        fn is_mass_preserving(&self) -> bool {
            true
        }

        fn execute(
            &mut self,
            partition: &mut Partition,
            _ctx: ProcessContext,
            _objective: &mut ObjectiveAccumulator,
        ) -> FscResult<()> {
            for category in partition.iter_mut() {
                for v in category.data_mut() {
                    *v = 0.0;
                }
            }
            Ok(())
        }
    }

    fn sample_partition() -> Partition {
        Partition::build([("a".to_string(), 1, 3)]).unwrap()
    }

    #[test]
    fn execute_runs_time_steps_in_order() {
        let mut partition = sample_partition();
        let mut cycle = AnnualCycle::new(vec![
            vec![ProcessKind::Recruitment(Box::new(ConstantGrowth {
                label: "recruit".into(),
                amount: 1.0,
            }))],
            vec![ProcessKind::Mortality(Box::new(ConstantGrowth {
                label: "mortality".into(),
                amount: 2.0,
            }))],
        ]);
        let mut objective = ObjectiveAccumulator::new();
        cycle.execute(&mut partition, 2020, &mut objective).unwrap();
        assert_eq!(partition.total(), 9.0);
    }

    #[test]
    fn mass_violation_in_ageing_raises_penalty() {
        let mut partition = sample_partition();
        partition.get_mut("a").unwrap().data_mut()[0] = 5.0;
        let mut cycle = AnnualCycle::new(vec![vec![ProcessKind::Ageing(Box::new(
            ZeroingAgeing { label: "ageing".into() },
        ))]]);
        let mut objective = ObjectiveAccumulator::new();
        cycle.execute(&mut partition, 2020, &mut objective).unwrap();
        assert!(
            objective
                .penalties()
                .iter()
                .any(|p| p.label.contains("mass_preservation"))
        );
    }

    #[test]
    fn initialisation_requires_at_least_one_iteration() {
        let mut partition = sample_partition();
        let mut cycle: AnnualCycle = AnnualCycle::new(vec![]);
        let mut objective = ObjectiveAccumulator::new();
        let err = cycle
            .execute_for_initialisation(&mut partition, "warmup", 0, &mut objective)
            .unwrap_err();
        assert!(matches!(err, fsc_error::FscError::Verify { .. }));
    }

    #[test]
    fn negative_values_are_clamped_and_penalised() {
        let mut partition = sample_partition();
        let mut cycle = AnnualCycle::new(vec![vec![ProcessKind::Mortality(Box::new(
            ConstantGrowth {
                label: "mortality".into(),
                amount: -100.0,
            },
        ))]]);
        let mut objective = ObjectiveAccumulator::new();
        cycle.execute(&mut partition, 2021, &mut objective).unwrap();
        assert_eq!(partition.total(), 0.0);
        assert!(
            objective
                .penalties()
                .iter()
                .any(|p| p.label.contains("non_negativity"))
        );
    }
}
