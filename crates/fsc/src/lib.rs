pub mod addressable;
pub mod build;
pub mod config;
pub mod engine;
pub mod initialisation;
pub mod io;
pub mod observation;
pub mod run_mode;

pub use config::ParameterList;
pub use engine::{Engine, EngineEvaluator, EngineFactory};
pub use initialisation::{InitialisationKind, InitialisationPhase};
pub use observation::{CollectionPoint, DerivedQuantity, Observation, Prediction};
pub use run_mode::RunMode;

pub mod prelude {
    pub use super::addressable::{parse_tagged_address, route_address};
    pub use super::build::{build_estimate, build_growth_curve, build_likelihood, build_prior, build_selectivity};
    pub use super::config::ParameterList;
    pub use super::engine::{Engine, EngineEvaluator, EngineFactory};
    pub use super::initialisation::{InitialisationKind, InitialisationPhase};
    pub use super::io::mcmc_stream;
    pub use super::io::mpd::MpdFile;
    pub use super::observation::{CollectionPoint, DerivedQuantity, Observation, Prediction};
    pub use super::run_mode::{self, RunMode};
}
