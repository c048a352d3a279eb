//! Derived quantities and observations: summary
//! quantities computed from a partition snapshot (e.g. SSB), and
//! observations that compare a model-predicted quantity against data
//! under a named likelihood, contributing a negative-log score to the
//! objective. `fsc_core::likelihood::Likelihood` supplies the pure scoring
//! math; this module supplies the wiring from a `Partition` snapshot to
//! the observed/expected values that likelihood scores.

use fsc_core::{Likelihood, Partition};
use fsc_error::{FscResult, fsc_err};
use std::sync::Arc;

/// A scalar or compositional model prediction, matching the two shapes
/// `Likelihood`'s scoring methods accept.
#[derive(Clone, Debug)]
pub enum Prediction {
    Scalar(f64),
    Vector(Vec<f64>),
}

/// A derived summary quantity computed from a partition snapshot — e.g.
/// spawning-stock biomass (SSB), the sum over a spawning category's
/// numbers-at-age weighted by maturity and weight-at-age.
pub struct DerivedQuantity {
    pub label: String,
    compute: Arc<dyn Fn(&Partition) -> f64 + Send + Sync>,
}

impl std::fmt::Debug for DerivedQuantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedQuantity").field("label", &self.label).finish()
    }
}

impl DerivedQuantity {
    pub fn new(label: impl Into<String>, compute: Arc<dyn Fn(&Partition) -> f64 + Send + Sync>) -> Self {
        DerivedQuantity { label: label.into(), compute }
    }

    pub fn value(&self, partition: &Partition) -> f64 {
        (self.compute)(partition)
    }

    /// Spawning-stock biomass: `SSB = sum_i maturity(i) * weight(i) * N[category][i]`.
    /// A common-enough derived quantity that it gets its own constructor rather than requiring
    /// every caller to hand-roll the same weighted sum.
    pub fn ssb(
        label: impl Into<String>,
        category: impl Into<String>,
        maturity_at_age: Vec<f64>,
        weight_at_age: Vec<f64>,
    ) -> FscResult<Self> {
        let label = label.into();
        if maturity_at_age.len() != weight_at_age.len() {
            return Err(fsc_err!(
                Verify: "SSB derived quantity '{}' requires matching maturity/weight vector lengths ({} vs {})",
                label,
                maturity_at_age.len(),
                weight_at_age.len()
            ));
        }
        let category = category.into();
        let compute: Arc<dyn Fn(&Partition) -> f64 + Send + Sync> = Arc::new(move |partition: &Partition| {
            let Some(cat) = partition.get(&category) else { return 0.0 };
            cat.data()
                .iter()
                .zip(maturity_at_age.iter())
                .zip(weight_at_age.iter())
                .map(|((n, m), w)| n * m * w)
                .sum()
        });
        Ok(DerivedQuantity { label, compute })
    }
}

/// Where in the annual cycle an observation's prediction is taken:
/// observations attached to time step k see the partition state
/// immediately after that step's processes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollectionPoint {
    pub year: u32,
    pub time_step: usize,
}

/// Compares a model-predicted quantity to observed data under a named
/// likelihood. `predict` is evaluated against the
/// partition snapshot taken at `collection_point`.
pub struct Observation {
    pub label: String,
    pub collection_point: CollectionPoint,
    pub likelihood: Likelihood,
    pub observed: Prediction,
    predict: Arc<dyn Fn(&Partition) -> FscResult<Prediction> + Send + Sync>,
}

impl std::fmt::Debug for Observation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observation")
            .field("label", &self.label)
            .field("collection_point", &self.collection_point)
            .field("likelihood", &self.likelihood)
            .field("observed", &self.observed)
            .finish()
    }
}

impl Observation {
    pub fn new(
        label: impl Into<String>,
        collection_point: CollectionPoint,
        likelihood: Likelihood,
        observed: Prediction,
        predict: Arc<dyn Fn(&Partition) -> FscResult<Prediction> + Send + Sync>,
    ) -> FscResult<Self> {
        let label = label.into();
        match (&observed, likelihood.is_compositional()) {
            (Prediction::Scalar(_), true) | (Prediction::Vector(_), false) => {
                return Err(fsc_err!(
                    Verify: "observation '{}' pairs a {} likelihood with mismatched observed-data shape",
                    label,
                    if likelihood.is_compositional() { "compositional" } else { "scalar" }
                ));
            }
            _ => {}
        }
        Ok(Observation {
            label,
            collection_point,
            likelihood,
            observed,
            predict,
        })
    }

    /// A derived-quantity-backed scalar observation (e.g. an SSB or
    /// index-of-abundance series entry) — the common case where the
    /// prediction is one `DerivedQuantity` evaluated against the
    /// snapshot, scaled by a catchability/CV nuisance the caller folds
    /// into `likelihood`.
    pub fn from_derived_quantity(
        label: impl Into<String>,
        collection_point: CollectionPoint,
        likelihood: Likelihood,
        observed_value: f64,
        quantity: Arc<DerivedQuantity>,
    ) -> FscResult<Self> {
        let predict: Arc<dyn Fn(&Partition) -> FscResult<Prediction> + Send + Sync> =
            Arc::new(move |partition: &Partition| Ok(Prediction::Scalar(quantity.value(partition))));
        Observation::new(label, collection_point, likelihood, Prediction::Scalar(observed_value), predict)
    }

    /// A composition observation (e.g. catch-at-age/length proportions)
    /// predicted directly from a category's current numbers vector,
    /// normalised to proportions.
    pub fn from_category_composition(
        label: impl Into<String>,
        collection_point: CollectionPoint,
        likelihood: Likelihood,
        observed_proportions: Vec<f64>,
        category: impl Into<String>,
    ) -> FscResult<Self> {
        let category = category.into();
        let predict: Arc<dyn Fn(&Partition) -> FscResult<Prediction> + Send + Sync> =
            Arc::new(move |partition: &Partition| {
                let cat = partition
                    .get(&category)
                    .ok_or_else(|| fsc_err!(Error: "composition observation targets unknown category '{}'", category))?;
                let total: f64 = cat.total();
                if total <= 0.0 {
                    return Err(fsc_err!(Error: "composition observation category '{}' has zero total abundance", category));
                }
                Ok(Prediction::Vector(cat.data().iter().map(|n| n / total).collect()))
            });
        Observation::new(label, collection_point, likelihood, Prediction::Vector(observed_proportions), predict)
    }

    /// Scores this observation against the current partition snapshot,
    /// returning the negative-log-likelihood contribution.
    pub fn score(&self, partition: &Partition) -> FscResult<f64> {
        let predicted = (self.predict)(partition)?;
        match (&self.observed, predicted) {
            (Prediction::Scalar(obs), Prediction::Scalar(exp)) => {
                self.likelihood.neg_log_likelihood_scalar(*obs, exp)
            }
            (Prediction::Vector(obs), Prediction::Vector(exp)) => {
                self.likelihood.neg_log_likelihood_vector(obs, &exp)
            }
            _ => Err(fsc_err!(
                CodeError: "observation '{}' predicted a shape mismatched with its observed data",
                self.label
            )),
        }
    }
}
