//! Parameter estimation: bound scaling, the
//! estimate registry, finite-difference gradients, the BFGS/differential-
//! evolution minimisers, the stateful candidate pool, and the phase-loop
//! driver that ties them together.

pub mod driver;
pub mod estimate;
pub mod gradient;
pub mod minimiser;
pub mod pool;
pub mod scale;

pub use driver::{EstimationDriver, EstimationOutcome, PhaseResult, UnscaledObjectiveFn};
pub use estimate::{Estimate, EstimateManager, PriorKind};
pub use gradient::{Gradient, ScaledObjectiveFn};
pub use minimiser::{
    DifferentialEvolution, Minimiser, MinimiserConfig, MinimiserOutcome, MinimiserResult, covariance_unscaled, dp_ds,
};
pub use pool::{CandidateEvaluator, CandidatePool};
pub use scale::{boundary_penalty, scale, unscale};

pub mod prelude {
    pub use super::driver::{EstimationDriver, EstimationOutcome, UnscaledObjectiveFn};
    pub use super::estimate::{Estimate, EstimateManager, PriorKind};
    pub use super::minimiser::{DifferentialEvolution, Minimiser, MinimiserConfig, MinimiserOutcome};
    pub use super::pool::{CandidateEvaluator, CandidatePool};
}
