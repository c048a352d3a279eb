//! The estimate manager: a registry of
//! addressable scalar parameters with bounds, priors, phase assignment,
//! and optional reparameterisations, using the same label-keyed lookup
//! pattern as this workspace's other component registries, generalised
//! here to estimable-parameter lookup.

use crate::scale::{scale, unscale};
use fsc_error::{FscResult, fsc_err};
use std::collections::HashMap;

/// The named prior families the objective function scores an estimate's
/// current value against.
#[derive(Clone, Debug, PartialEq)]
pub enum PriorKind {
    Uniform,
    Normal { mean: f64, sd: f64 },
    Lognormal { mean_log: f64, sd_log: f64 },
    Beta { alpha: f64, beta: f64 },
}

impl PriorKind {
    /// Negative log prior density at `value`, the quantity the objective
    /// function sums in.
    pub fn neg_log_density(&self, value: f64) -> FscResult<f64> {
        match self {
            PriorKind::Uniform => Ok(0.0),
            PriorKind::Normal { mean, sd } => {
                if *sd <= 0.0 {
                    return Err(fsc_err!(Error: "normal prior requires sd > 0"));
                }
                let z = (value - mean) / sd;
                Ok(0.5 * z * z + sd.ln())
            }
            PriorKind::Lognormal { mean_log, sd_log } => {
                if value <= 0.0 {
                    return Err(fsc_err!(Error: "lognormal prior requires value > 0, got {}", value));
                }
                if *sd_log <= 0.0 {
                    return Err(fsc_err!(Error: "lognormal prior requires sd_log > 0"));
                }
                let z = (value.ln() - mean_log) / sd_log;
                Ok(0.5 * z * z + sd_log.ln() + value.ln())
            }
            PriorKind::Beta { alpha, beta } => {
                if !(0.0..=1.0).contains(&value) {
                    return Err(fsc_err!(Error: "beta prior requires value in [0,1], got {}", value));
                }
                if *alpha <= 0.0 || *beta <= 0.0 {
                    return Err(fsc_err!(Error: "beta prior requires alpha, beta > 0"));
                }
                let ln_beta_fn = ln_gamma(*alpha) + ln_gamma(*beta) - ln_gamma(alpha + beta);
                Ok(-((alpha - 1.0) * value.max(1e-300).ln()
                    + (beta - 1.0) * (1.0 - value).max(1e-300).ln()
                    - ln_beta_fn))
            }
        }
    }
}

/// Lanczos approximation to `ln(Gamma(x))`, used only by the Beta prior's
/// density — hand-rolled rather than pulling in a special-functions
/// crate, matching the rest of this workspace's numeric primitives.
fn ln_gamma(x: f64) -> f64 {
    const G: f64 = 7.0;
    const COEFFICIENTS: [f64; 9] = [
        0.99999999999980993,
        676.5203681218851,
        -1259.1392167224028,
        771.32342877765313,
        -176.61502916214059,
        12.507343278686905,
        -0.13857109526572012,
        9.9843695780195716e-6,
        1.5056327351493116e-7,
    ];

    if x < 0.5 {
        return (std::f64::consts::PI / (std::f64::consts::PI * x).sin()).ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let mut a = COEFFICIENTS[0];
    let t = x + G + 0.5;
    for (i, c) in COEFFICIENTS.iter().enumerate().skip(1) {
        a += c / (x + i as f64);
    }
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + a.ln()
}

/// A single addressable scalar parameter. Bounds are
/// immutable after `Build`; `current_value` is the only field the
/// estimation and MCMC drivers mutate at run time.
#[derive(Clone, Debug)]
pub struct Estimate {
    pub label: String,
    current_value: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub phase: u32,
    pub is_estimated: bool,
    pub is_in_objective: bool,
    pub prior: PriorKind,
}

impl Estimate {
    pub fn new(label: impl Into<String>, value: f64, lower_bound: f64, upper_bound: f64) -> FscResult<Self> {
        let label = label.into();
        if upper_bound < lower_bound {
            return Err(fsc_err!(
                Verify: "estimate '{}' has upper bound {} below lower bound {}",
                label,
                upper_bound,
                lower_bound
            ));
        }
        Ok(Estimate {
            label,
            current_value: value,
            lower_bound,
            upper_bound,
            phase: 1,
            is_estimated: true,
            is_in_objective: true,
            prior: PriorKind::Uniform,
        })
    }

    pub fn with_phase(mut self, phase: u32) -> Self {
        self.phase = phase;
        self
    }

    pub fn with_prior(mut self, prior: PriorKind) -> Self {
        self.prior = prior;
        self
    }

    pub fn not_estimated(mut self) -> Self {
        self.is_estimated = false;
        self
    }

    pub fn excluded_from_objective(mut self) -> Self {
        self.is_in_objective = false;
        self
    }

    pub fn value(&self) -> f64 {
        self.current_value
    }

    pub fn set_value(&mut self, value: f64) -> FscResult<()> {
        self.current_value = value;
        Ok(())
    }

    pub fn scaled(&self) -> f64 {
        scale(self.current_value, self.lower_bound, self.upper_bound)
    }

    pub fn set_scaled(&mut self, s: f64) {
        self.current_value = unscale(s, self.lower_bound, self.upper_bound);
    }

    /// Active for minimiser phase `active_phase` when estimated and its
    /// declared phase is at or before the current one.
    pub fn is_active_in_phase(&self, active_phase: u32) -> bool {
        self.is_estimated && self.phase <= active_phase
    }
}

/// Registry of [`Estimate`]s keyed by dotted label.
#[derive(Debug, Default)]
pub struct EstimateManager {
    order: Vec<String>,
    estimates: HashMap<String, Estimate>,
}

impl EstimateManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, estimate: Estimate) -> FscResult<()> {
        if self.estimates.contains_key(&estimate.label) {
            return Err(fsc_err!(Verify: "duplicate estimate label '{}'", estimate.label));
        }
        self.order.push(estimate.label.clone());
        self.estimates.insert(estimate.label.clone(), estimate);
        Ok(())
    }

    pub fn get(&self, label: &str) -> Option<&Estimate> {
        self.estimates.get(label)
    }

    pub fn get_mut(&mut self, label: &str) -> Option<&mut Estimate> {
        self.estimates.get_mut(label)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn max_phase(&self) -> u32 {
        self.order
            .iter()
            .filter_map(|l| self.estimates.get(l))
            .filter(|e| e.is_estimated)
            .map(|e| e.phase)
            .max()
            .unwrap_or(0)
    }

    /// Labels of estimates active in `active_phase`, in registration
    /// order — the order the scaled-parameter vector is built/applied in.
    pub fn active_labels(&self, active_phase: u32) -> Vec<&str> {
        self.order
            .iter()
            .filter(|l| self.estimates[*l].is_active_in_phase(active_phase))
            .map(|s| s.as_str())
            .collect()
    }

    /// The scaled-parameter vector for the given active labels, in order.
    pub fn scaled_vector(&self, labels: &[&str]) -> Vec<f64> {
        labels.iter().map(|l| self.estimates[*l].scaled()).collect()
    }

    /// Applies a scaled-parameter vector back onto the registry, in the
    /// same label order it was built from.
    pub fn apply_scaled(&mut self, labels: &[&str], values: &[f64]) -> FscResult<()> {
        if labels.len() != values.len() {
            return Err(fsc_err!(
                CodeError: "scaled-vector length {} does not match label count {}",
                values.len(),
                labels.len()
            ));
        }
        for (label, &v) in labels.iter().zip(values.iter()) {
            self.estimates
                .get_mut(*label)
                .ok_or_else(|| fsc_err!(CodeError: "unknown estimate label '{}'", label))?
                .set_scaled(v);
        }
        Ok(())
    }

    pub fn labels(&self) -> &[String] {
        &self.order
    }

    pub fn values(&self) -> Vec<f64> {
        self.order.iter().map(|l| self.estimates[l].value()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_apply_scaled_round_trips() {
        let mut mgr = EstimateManager::new();
        mgr.register(Estimate::new("a", 5.0, 0.0, 10.0).unwrap()).unwrap();
        mgr.register(Estimate::new("b", 1.0, 0.0, 2.0).unwrap().with_phase(2)).unwrap();

        assert_eq!(mgr.max_phase(), 2);
        let phase1 = mgr.active_labels(1);
        assert_eq!(phase1, vec!["a"]);

        let all = mgr.active_labels(2);
        let scaled = mgr.scaled_vector(&all);
        mgr.apply_scaled(&all, &scaled).unwrap();
        assert!((mgr.get("a").unwrap().value() - 5.0).abs() < 1e-9);
        assert!((mgr.get("b").unwrap().value() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn duplicate_label_rejected() {
        let mut mgr = EstimateManager::new();
        mgr.register(Estimate::new("a", 1.0, 0.0, 2.0).unwrap()).unwrap();
        assert!(mgr.register(Estimate::new("a", 1.0, 0.0, 2.0).unwrap()).is_err());
    }

    #[test]
    fn normal_prior_density_at_mean_is_minimal() {
        let prior = PriorKind::Normal { mean: 0.0, sd: 1.0 };
        let at_mean = prior.neg_log_density(0.0).unwrap();
        let off_mean = prior.neg_log_density(2.0).unwrap();
        assert!(at_mean < off_mean);
    }

    #[test]
    fn beta_prior_rejects_out_of_range_value() {
        let prior = PriorKind::Beta { alpha: 2.0, beta: 2.0 };
        assert!(prior.neg_log_density(1.5).is_err());
        assert!(prior.neg_log_density(0.5).is_ok());
    }
}
