pub mod domain;
pub mod executor;
pub mod likelihood;
pub mod linalg;
pub mod objective;
pub mod partition;
pub mod process;
pub mod stats;

pub use domain::*;
pub use executor::Executor;
pub use likelihood::Likelihood;
pub use linalg::Matrix;
pub use objective::{ObjectiveAccumulator, ObjectiveValue, Penalty};
pub use partition::{Category, Partition};
pub use process::{AnnualCycle, Process, ProcessContext, ProcessKind};
pub use process::builtin;
pub use stats::{Adder, Distribution, Statistic};

pub mod prelude {
    pub use super::domain::random_provider;
    pub use super::domain::{Arena, ArenaKey, ThreadPool, WaitGroup};
    pub use super::executor::Executor;
    pub use super::likelihood::Likelihood;
    pub use super::linalg::Matrix;
    pub use super::objective::{ObjectiveAccumulator, ObjectiveValue, Penalty};
    pub use super::partition::{Category, Partition};
    pub use super::process::builtin;
    pub use super::process::{AnnualCycle, Process, ProcessContext, ProcessKind};
    pub use super::stats::{Adder, Distribution, Statistic};
}
