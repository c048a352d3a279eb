//! The age-length relationship: per-category growth curves,
//! CV profiles, and the cached age->length transition matrix they feed,
//! plus the length-at-age quadrature used to evaluate a length-based
//! selectivity inside an age model.

pub mod cdf;
pub mod growth;
pub mod length_weight;
pub mod quadrature;
pub mod transition;

pub use cdf::{CdfCompatibility, pnorm, pnorm2};
pub use growth::{Basic, CvProfile, GrowthCurveKind, GrowthModel, Schnute, VonBertalanffy};
pub use length_weight::{LengthWeight, MeanLengthWeightTable};
pub use quadrature::{length_at_age_quantiles, quantile_average_selectivity};
pub use transition::{
    GrowthDistribution, LengthGrid, TransitionCache, YearTimeStep, populate_numbers_at_length,
    transition_row,
};

pub mod prelude {
    pub use super::cdf::CdfCompatibility;
    pub use super::growth::{CvProfile, GrowthCurveKind, GrowthModel};
    pub use super::length_weight::{LengthWeight, MeanLengthWeightTable};
    pub use super::quadrature::quantile_average_selectivity;
    pub use super::transition::{
        GrowthDistribution, LengthGrid, TransitionCache, YearTimeStep, populate_numbers_at_length,
    };
}
