//! Initialisation phases: sequences of annual-cycle iterations run
//! before the historical period to produce an equilibrium starting
//! state. Three phase styles are supported: iterative (loop a fixed
//! iteration count), derived quantity (loop until a named derived
//! quantity stabilises), and C-initial (seed the partition directly from
//! an observed age composition rather than iterating at all).

use fsc_core::process::AnnualCycle;
use fsc_core::{ObjectiveAccumulator, Partition};
use fsc_error::{FscResult, fsc_err};

/// Relative tolerance a derived-quantity phase iterates toward before
/// stopping early; mirrors the minimiser's own `step_threshold` order of
/// magnitude rather than inventing an unrelated one.
pub const DEFAULT_CONVERGENCE_TOLERANCE: f64 = 1e-7;

#[derive(Clone, Debug)]
pub enum InitialisationKind {
    /// Loops the annual cycle a fixed number of times.
    Iterative { iterations: u32 },
    /// Loops the annual cycle, checking a caller-supplied derived
    /// quantity after every iteration and stopping early once its
    /// relative change falls below `tolerance` (or `max_iterations` is
    /// reached).
    DerivedQuantity { max_iterations: u32, tolerance: f64 },
    /// Seeds a category directly from an observed age composition,
    /// scaled to `total_abundance`, bypassing annual-cycle iteration
    /// entirely.
    CInitial { category: String, proportions: Vec<f64>, total_abundance: f64 },
}

/// One named initialisation phase.
#[derive(Clone, Debug)]
pub struct InitialisationPhase {
    pub label: String,
    pub kind: InitialisationKind,
}

impl InitialisationPhase {
    pub fn iterative(label: impl Into<String>, iterations: u32) -> Self {
        InitialisationPhase {
            label: label.into(),
            kind: InitialisationKind::Iterative { iterations },
        }
    }

    pub fn derived_quantity(label: impl Into<String>, max_iterations: u32) -> Self {
        InitialisationPhase {
            label: label.into(),
            kind: InitialisationKind::DerivedQuantity {
                max_iterations,
                tolerance: DEFAULT_CONVERGENCE_TOLERANCE,
            },
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        if let InitialisationKind::DerivedQuantity { tolerance: t, .. } = &mut self.kind {
            *t = tolerance;
        }
        self
    }

    pub fn c_initial(
        label: impl Into<String>,
        category: impl Into<String>,
        proportions: Vec<f64>,
        total_abundance: f64,
    ) -> FscResult<Self> {
        let label = label.into();
        let sum: f64 = proportions.iter().sum();
        if !(sum > 0.0) {
            return Err(fsc_err!(
                Verify: "C-initial phase '{}' requires a positive-sum age composition, got sum {}",
                label,
                sum
            ));
        }
        Ok(InitialisationPhase {
            label,
            kind: InitialisationKind::CInitial {
                category: category.into(),
                proportions,
                total_abundance,
            },
        })
    }

    /// Whether this phase requires another phase's category to already
    /// be populated; validated once, here, at `Validate` time, rather
    /// than again during `Build`.
    pub fn validate_against(&self, known_categories: &[String]) -> FscResult<()> {
        if let InitialisationKind::CInitial { category, .. } = &self.kind {
            if !known_categories.iter().any(|c| c == category) {
                return Err(fsc_err!(
                    Verify: "initialisation phase '{}' (IsPhaseDefined) targets unknown category '{}'",
                    self.label,
                    category
                ));
            }
        }
        Ok(())
    }

    /// Runs this phase against `partition`/`cycle`, with `derived` used
    /// only by the `DerivedQuantity` kind to test for convergence.
    pub fn execute(
        &self,
        cycle: &mut AnnualCycle,
        partition: &mut Partition,
        objective: &mut ObjectiveAccumulator,
        derived: &dyn Fn(&Partition) -> f64,
    ) -> FscResult<()> {
        match &self.kind {
            InitialisationKind::Iterative { iterations } => {
                cycle.execute_for_initialisation(partition, &self.label, *iterations, objective)
            }
            InitialisationKind::DerivedQuantity { max_iterations, tolerance } => {
                let mut previous = derived(partition);
                for _ in 0..*max_iterations {
                    cycle.execute_for_initialisation(partition, &self.label, 1, objective)?;
                    let current = derived(partition);
                    if previous.abs() > 0.0 && ((current - previous) / previous).abs() < *tolerance {
                        break;
                    }
                    previous = current;
                }
                Ok(())
            }
            InitialisationKind::CInitial { category, proportions, total_abundance } => {
                let cat = partition.get_mut(category).ok_or_else(|| {
                    fsc_err!(Error: "C-initial phase '{}' targets unknown category '{}'", self.label, category)
                })?;
                if proportions.len() != cat.bins() {
                    return Err(fsc_err!(
                        Verify: "C-initial phase '{}' has {} composition entries but category '{}' has {} bins",
                        self.label,
                        proportions.len(),
                        category,
                        cat.bins()
                    ));
                }
                let sum: f64 = proportions.iter().sum();
                for (slot, p) in cat.data_mut().iter_mut().zip(proportions.iter()) {
                    *slot = total_abundance * p / sum;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsc_core::process::{Process, ProcessContext, ProcessKind};

    #[derive(Debug)]
    struct AddOne(String);
    impl Process for AddOne {
        fn label(&self) -> &str {
            &self.0
        }
        fn execute(
            &mut self,
            partition: &mut Partition,
            _ctx: ProcessContext,
            _objective: &mut ObjectiveAccumulator,
        ) -> FscResult<()> {
            for category in partition.iter_mut() {
                category.data_mut()[0] += 1.0;
            }
            Ok(())
        }
    }

    fn sample_cycle() -> AnnualCycle {
        AnnualCycle::new(vec![vec![ProcessKind::Recruitment(Box::new(AddOne("recruit".into())))]])
    }

    #[test]
    fn iterative_phase_loops_the_configured_count() {
        let mut partition = Partition::build([("a".to_string(), 1, 3)]).unwrap();
        let mut cycle = sample_cycle();
        let mut objective = ObjectiveAccumulator::new();
        let phase = InitialisationPhase::iterative("warmup", 5);
        phase.execute(&mut cycle, &mut partition, &mut objective, &|_| 0.0).unwrap();
        assert_eq!(partition.get("a").unwrap().data()[0], 5.0);
    }

    #[test]
    fn derived_quantity_phase_stops_early_on_convergence() {
        let mut partition = Partition::build([("a".to_string(), 1, 3)]).unwrap();
        partition.get_mut("a").unwrap().data_mut()[0] = 1000.0;
        let mut cycle = sample_cycle();
        let mut objective = ObjectiveAccumulator::new();
        let phase = InitialisationPhase::derived_quantity("equilibrium", 1000).with_tolerance(0.5);
        phase
            .execute(&mut cycle, &mut partition, &mut objective, &|p| p.get("a").unwrap().data()[0])
            .unwrap();
        assert!(partition.get("a").unwrap().data()[0] < 1010.0);
    }

    #[test]
    fn c_initial_phase_scales_composition_to_total_abundance() {
        let mut partition = Partition::build([("a".to_string(), 1, 3)]).unwrap();
        let mut cycle = sample_cycle();
        let mut objective = ObjectiveAccumulator::new();
        let phase = InitialisationPhase::c_initial("seed", "a", vec![1.0, 2.0, 1.0], 400.0).unwrap();
        phase.execute(&mut cycle, &mut partition, &mut objective, &|_| 0.0).unwrap();
        assert_eq!(partition.get("a").unwrap().data(), &[100.0, 200.0, 100.0]);
    }

    #[test]
    fn validate_against_rejects_unknown_cinitial_category() {
        let phase = InitialisationPhase::c_initial("seed", "missing", vec![1.0], 1.0).unwrap();
        assert!(phase.validate_against(&["a".to_string()]).is_err());
        assert!(phase.validate_against(&["missing".to_string()]).is_ok());
    }
}
