//! The selectivity function library: pure functions mapping
//! (age or length) to `[0, alpha]`, dispatched through a tagged enum in
//! the same shape as [`fsc_core::process::ProcessKind`] over
//! [`fsc_core::process::Process`] — one shared contract (`value`), one
//! variant per built-in family, plus a `Custom` trait-object escape hatch.

mod addressable;
mod cache;
mod kinds;

pub use addressable::Addressable;
pub use cache::SelectivityCache;
pub use kinds::{
    AllValues, AllValuesBounded, CompoundKind, CompoundSelectivity, Constant, DoubleExponential,
    DoubleNormal, DoubleNormalKind, Increasing, KnifeEdge, Logistic, MigrationRate,
    MultiSelectivity,
};

use fsc_error::FscResult;
use std::fmt::Debug;

/// Shared contract every selectivity — built-in or custom — implements.
/// `value` takes a continuous age-or-length input; `value_at_index` is the
/// integer-age convenience the partition's annual cycle calls in its hot
/// loop, and defaults to `value(index as f64)`.
pub trait Selectivity: Debug {
    fn label(&self) -> &str;

    fn value(&self, x: f64) -> f64;

    fn value_at_index(&self, index: u32) -> f64 {
        self.value(index as f64)
    }

    /// The scaling factor at full selection; used by callers that need to
    /// normalise (e.g. an age-length quadrature averaging several S(L_k)).
    fn alpha(&self) -> f64 {
        1.0
    }
}

/// Tagged dispatch for the built-in selectivity families; `Custom`
/// falls back to a trait object.
#[derive(Debug)]
pub enum SelectivityKind {
    Constant(Constant),
    KnifeEdge(KnifeEdge),
    Logistic(Logistic),
    InverseLogistic(Logistic),
    DoubleNormal(DoubleNormal),
    DoubleExponential(DoubleExponential),
    AllValues(AllValues),
    AllValuesBounded(AllValuesBounded),
    Increasing(Increasing),
    Compound(CompoundSelectivity),
    MigrationRate(MigrationRate),
    Multi(MultiSelectivity),
    Custom(Box<dyn Selectivity>),
}

impl SelectivityKind {
    pub fn inner(&self) -> &dyn Selectivity {
        match self {
            SelectivityKind::Constant(s) => s,
            SelectivityKind::KnifeEdge(s) => s,
            SelectivityKind::Logistic(s) => s,
            SelectivityKind::InverseLogistic(s) => s,
            SelectivityKind::DoubleNormal(s) => s,
            SelectivityKind::DoubleExponential(s) => s,
            SelectivityKind::AllValues(s) => s,
            SelectivityKind::AllValuesBounded(s) => s,
            SelectivityKind::Increasing(s) => s,
            SelectivityKind::Compound(s) => s,
            SelectivityKind::MigrationRate(s) => s,
            SelectivityKind::Multi(s) => s,
            SelectivityKind::Custom(s) => s.as_ref(),
        }
    }

    pub fn label(&self) -> &str {
        self.inner().label()
    }

    pub fn value(&self, x: f64) -> f64 {
        match self {
            SelectivityKind::InverseLogistic(s) => s.alpha() - s.value(x),
            _ => self.inner().value(x),
        }
    }

    pub fn value_at_index(&self, index: u32) -> f64 {
        self.value(index as f64)
    }

    /// Builds a dense cache of `value_at_index` over `0..grid_len` for
    /// repeated lookup inside the hot annual-cycle loop.
    pub fn build_cache(&self, grid_len: u32) -> SelectivityCache {
        SelectivityCache::build(grid_len, |i| self.value_at_index(i))
    }
}

/// Forwards the addressable contract through the enum dispatch, in the
/// same shape as [`SelectivityKind::value`]'s forwarding above — a
/// `Custom` selectivity exposes nothing addressable since it is an opaque
/// trait object.
impl Addressable for SelectivityKind {
    fn param_names(&self) -> &'static [&'static str] {
        match self {
            SelectivityKind::Constant(s) => s.param_names(),
            SelectivityKind::KnifeEdge(s) => s.param_names(),
            SelectivityKind::Logistic(s) | SelectivityKind::InverseLogistic(s) => s.param_names(),
            SelectivityKind::DoubleNormal(s) => s.param_names(),
            SelectivityKind::DoubleExponential(s) => s.param_names(),
            SelectivityKind::AllValues(s) => s.param_names(),
            SelectivityKind::AllValuesBounded(s) => s.param_names(),
            SelectivityKind::Increasing(s) => s.param_names(),
            SelectivityKind::Compound(s) => s.param_names(),
            SelectivityKind::MigrationRate(s) => s.param_names(),
            SelectivityKind::Multi(_) | SelectivityKind::Custom(_) => &[],
        }
    }

    fn get_param(&self, name: &str) -> Option<f64> {
        match self {
            SelectivityKind::Constant(s) => s.get_param(name),
            SelectivityKind::KnifeEdge(s) => s.get_param(name),
            SelectivityKind::Logistic(s) | SelectivityKind::InverseLogistic(s) => s.get_param(name),
            SelectivityKind::DoubleNormal(s) => s.get_param(name),
            SelectivityKind::DoubleExponential(s) => s.get_param(name),
            SelectivityKind::AllValues(s) => s.get_param(name),
            SelectivityKind::AllValuesBounded(s) => s.get_param(name),
            SelectivityKind::Increasing(s) => s.get_param(name),
            SelectivityKind::Compound(s) => s.get_param(name),
            SelectivityKind::MigrationRate(s) => s.get_param(name),
            SelectivityKind::Multi(_) | SelectivityKind::Custom(_) => None,
        }
    }

    fn set_param(&mut self, name: &str, value: f64) -> FscResult<()> {
        match self {
            SelectivityKind::Constant(s) => s.set_param(name, value),
            SelectivityKind::KnifeEdge(s) => s.set_param(name, value),
            SelectivityKind::Logistic(s) | SelectivityKind::InverseLogistic(s) => s.set_param(name, value),
            SelectivityKind::DoubleNormal(s) => s.set_param(name, value),
            SelectivityKind::DoubleExponential(s) => s.set_param(name, value),
            SelectivityKind::AllValues(s) => s.set_param(name, value),
            SelectivityKind::AllValuesBounded(s) => s.set_param(name, value),
            SelectivityKind::Increasing(s) => s.set_param(name, value),
            SelectivityKind::Compound(s) => s.set_param(name, value),
            SelectivityKind::MigrationRate(s) => s.set_param(name, value),
            SelectivityKind::Multi(_) | SelectivityKind::Custom(_) => Err(fsc_error::fsc_err!(
                Error: "selectivity '{}' has no addressable parameter named '{}'",
                self.label(),
                name
            )),
        }
    }
}

/// Validates an (inclusive) age/length grid bound pair, the common guard
/// every selectivity constructor applies before allocating its cache.
pub(crate) fn validate_bounds(label: &str, low: f64, high: f64) -> FscResult<()> {
    if high < low {
        return Err(fsc_error::fsc_err!(
            Verify: "selectivity '{}' has an upper bound {} below its lower bound {}",
            label,
            high,
            low
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_logistic_complements_logistic() {
        let logistic = Logistic::new("sel", 8.0, 3.0, 0.0, 1.0).unwrap();
        let value = logistic.value(12.0);
        let kind = SelectivityKind::InverseLogistic(logistic);
        assert!((kind.value(12.0) - (1.0 - value)).abs() < 1e-9);
    }
}
