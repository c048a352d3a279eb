//! Concrete built-in process families: recruitment,
//! mortality (including the Baranov catch equation), ageing, maturation,
//! tagging, and age→length transition. Each implements [`Process`] and is
//! wrapped in its matching [`ProcessKind`] variant by the caller that
//! builds the annual cycle.
//!
//! `fsc-core` has no dependency on `fsc-selectivity` or `fsc-agelength`
//! (see `Cargo.toml`), so a process that needs a selectivity curve, an
//! SSB-style derived quantity, or an age→length transition row takes it
//! as an injected closure rather than a concrete type from those crates —
//! the top-level `fsc` crate supplies the real closures when it builds
//! the annual cycle from configuration — pointer-rich wiring becomes an
//! injected callback for the one cross-crate seam that would otherwise
//! require a dependency cycle.

use super::{Process, ProcessContext};
use crate::objective::{ObjectiveAccumulator, Penalty};
use crate::partition::Partition;
use fsc_error::{FscResult, fsc_err};
use std::sync::Arc;

/// `N[0] += r0 * (deviation)`, the simplest constant/log-deviation
/// recruitment: adds `r0 * exp(dev)` individuals to age bin zero of the
/// named category every time step it is scheduled for.
#[derive(Clone, Debug)]
pub struct ConstantRecruitment {
    pub label: String,
    pub category: String,
    pub r0: f64,
    pub log_deviation: f64,
}

impl ConstantRecruitment {
    pub fn new(label: impl Into<String>, category: impl Into<String>, r0: f64) -> Self {
        ConstantRecruitment {
            label: label.into(),
            category: category.into(),
            r0,
            log_deviation: 0.0,
        }
    }

    pub fn with_log_deviation(mut self, dev: f64) -> Self {
        self.log_deviation = dev;
        self
    }
}

impl Process for ConstantRecruitment {
    fn label(&self) -> &str {
        &self.label
    }

    fn param_names(&self) -> &'static [&'static str] {
        &["r0", "log_deviation"]
    }

    fn get_param(&self, name: &str) -> Option<f64> {
        match name {
            "r0" => Some(self.r0),
            "log_deviation" => Some(self.log_deviation),
            _ => None,
        }
    }

    fn set_param(&mut self, name: &str, value: f64) -> FscResult<()> {
        match name {
            "r0" => {
                self.r0 = value;
                Ok(())
            }
            "log_deviation" => {
                self.log_deviation = value;
                Ok(())
            }
            _ => Err(fsc_err!(Error: "recruitment '{}' has no addressable parameter named '{}'", self.label, name)),
        }
    }

    fn execute(
        &mut self,
        partition: &mut Partition,
        _ctx: ProcessContext,
        _objective: &mut ObjectiveAccumulator,
    ) -> FscResult<()> {
        let category = partition
            .get_mut(&self.category)
            .ok_or_else(|| fsc_err!(Error: "recruitment '{}' targets unknown category '{}'", self.label, self.category))?;
        let recruits = self.r0 * self.log_deviation.exp();
        if !recruits.is_finite() {
            return Err(fsc_err!(
                CodeError: "recruitment '{}' produced a non-finite recruit count",
                self.label
            ));
        }
        category.data_mut()[0] += recruits;
        Ok(())
    }
}

/// Beverton-Holt stock-recruitment: `R = 4*h*R0*SSB / ((1-h)*SSB0 + (5h-1)*SSB)`,
/// with `SSB` supplied by an injected closure over the whole partition
/// (e.g. a weighted sum of a spawning-category's numbers-at-age by
/// fecundity-at-age) so this process never needs to know how SSB is
/// derived.
pub struct BevertonHoltRecruitment {
    pub label: String,
    pub category: String,
    pub r0: f64,
    pub steepness: f64,
    pub ssb0: f64,
    pub ssb: Arc<dyn Fn(&Partition) -> f64 + Send + Sync>,
}

impl std::fmt::Debug for BevertonHoltRecruitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BevertonHoltRecruitment")
            .field("label", &self.label)
            .field("category", &self.category)
            .field("r0", &self.r0)
            .field("steepness", &self.steepness)
            .field("ssb0", &self.ssb0)
            .finish()
    }
}

impl BevertonHoltRecruitment {
    pub fn new(
        label: impl Into<String>,
        category: impl Into<String>,
        r0: f64,
        steepness: f64,
        ssb0: f64,
        ssb: Arc<dyn Fn(&Partition) -> f64 + Send + Sync>,
    ) -> FscResult<Self> {
        let label = label.into();
        if !(0.2..=1.0).contains(&steepness) {
            return Err(fsc_err!(
                Error: "Beverton-Holt recruitment '{}' requires steepness in [0.2, 1.0], got {}",
                label,
                steepness
            ));
        }
        Ok(BevertonHoltRecruitment {
            label,
            category: category.into(),
            r0,
            steepness,
            ssb0,
            ssb,
        })
    }
}

impl Process for BevertonHoltRecruitment {
    fn label(&self) -> &str {
        &self.label
    }

    fn param_names(&self) -> &'static [&'static str] {
        &["r0", "steepness", "ssb0"]
    }

    fn get_param(&self, name: &str) -> Option<f64> {
        match name {
            "r0" => Some(self.r0),
            "steepness" => Some(self.steepness),
            "ssb0" => Some(self.ssb0),
            _ => None,
        }
    }

    fn set_param(&mut self, name: &str, value: f64) -> FscResult<()> {
        match name {
            "r0" => {
                self.r0 = value;
                Ok(())
            }
            "steepness" => {
                if !(0.2..=1.0).contains(&value) {
                    return Err(fsc_err!(
                        Error: "Beverton-Holt recruitment '{}' requires steepness in [0.2, 1.0], got {}",
                        self.label,
                        value
                    ));
                }
                self.steepness = value;
                Ok(())
            }
            "ssb0" => {
                self.ssb0 = value;
                Ok(())
            }
            _ => Err(fsc_err!(Error: "recruitment '{}' has no addressable parameter named '{}'", self.label, name)),
        }
    }

    fn execute(
        &mut self,
        partition: &mut Partition,
        _ctx: ProcessContext,
        _objective: &mut ObjectiveAccumulator,
    ) -> FscResult<()> {
        let ssb = (self.ssb)(partition);
        let h = self.steepness;
        let denom = (1.0 - h) * self.ssb0 + (5.0 * h - 1.0) * ssb;
        if denom <= 0.0 {
            return Err(fsc_err!(
                CodeError: "Beverton-Holt recruitment '{}' produced a non-positive denominator",
                self.label
            ));
        }
        let recruits = 4.0 * h * self.r0 * ssb / denom;
        if !recruits.is_finite() {
            return Err(fsc_err!(
                CodeError: "Beverton-Holt recruitment '{}' produced a non-finite recruit count",
                self.label
            ));
        }
        let category = partition
            .get_mut(&self.category)
            .ok_or_else(|| fsc_err!(Error: "recruitment '{}' targets unknown category '{}'", self.label, self.category))?;
        category.data_mut()[0] += recruits;
        Ok(())
    }
}

/// Natural mortality: exponential decay `N *= exp(-m)` applied uniformly
/// across every bin of every category this process is scheduled against.
#[derive(Clone, Debug)]
pub struct ConstantMortality {
    pub label: String,
    pub m: f64,
}

impl ConstantMortality {
    pub fn new(label: impl Into<String>, m: f64) -> FscResult<Self> {
        let label = label.into();
        if m < 0.0 {
            return Err(fsc_err!(Error: "mortality '{}' requires m >= 0, got {}", label, m));
        }
        Ok(ConstantMortality { label, m })
    }
}

impl Process for ConstantMortality {
    fn label(&self) -> &str {
        &self.label
    }

    fn param_names(&self) -> &'static [&'static str] {
        &["m"]
    }

    fn get_param(&self, name: &str) -> Option<f64> {
        (name == "m").then_some(self.m)
    }

    fn set_param(&mut self, name: &str, value: f64) -> FscResult<()> {
        if name != "m" {
            return Err(fsc_err!(Error: "mortality '{}' has no addressable parameter named '{}'", self.label, name));
        }
        if value < 0.0 {
            return Err(fsc_err!(Error: "mortality '{}' requires m >= 0, got {}", self.label, value));
        }
        self.m = value;
        Ok(())
    }

    fn execute(
        &mut self,
        partition: &mut Partition,
        _ctx: ProcessContext,
        _objective: &mut ObjectiveAccumulator,
    ) -> FscResult<()> {
        let factor = (-self.m).exp();
        for category in partition.iter_mut() {
            for v in category.data_mut() {
                *v *= factor;
            }
        }
        Ok(())
    }
}

/// Baranov mortality: removes catch alongside natural mortality under
/// `Z = M + F*S(age)`, `catch_i = N_i * (F*S(age_i)/Z_i) * (1 - exp(-Z_i))`,
/// and decays survivors by `exp(-Z_i)`. `selectivity` is an injected
/// age-indexed closure so this process does not depend on
/// `fsc-selectivity`'s concrete types.
pub struct BaranovMortality {
    pub label: String,
    pub category: String,
    pub natural_mortality: f64,
    pub fishing_mortality: f64,
    pub selectivity: Arc<dyn Fn(usize) -> f64 + Send + Sync>,
    pub last_catch_at_age: Vec<f64>,
}

impl std::fmt::Debug for BaranovMortality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaranovMortality")
            .field("label", &self.label)
            .field("category", &self.category)
            .field("natural_mortality", &self.natural_mortality)
            .field("fishing_mortality", &self.fishing_mortality)
            .finish()
    }
}

impl BaranovMortality {
    pub fn new(
        label: impl Into<String>,
        category: impl Into<String>,
        natural_mortality: f64,
        fishing_mortality: f64,
        selectivity: Arc<dyn Fn(usize) -> f64 + Send + Sync>,
    ) -> FscResult<Self> {
        let label = label.into();
        if natural_mortality < 0.0 || fishing_mortality < 0.0 {
            return Err(fsc_err!(
                Error: "Baranov mortality '{}' requires non-negative M and F",
                label
            ));
        }
        Ok(BaranovMortality {
            label,
            category: category.into(),
            natural_mortality,
            fishing_mortality,
            selectivity,
            last_catch_at_age: Vec::new(),
        })
    }

    /// The catch-at-age vector from the most recent `execute` call, used
    /// by catch-at-age observations to compare against data.
    pub fn last_catch(&self) -> &[f64] {
        &self.last_catch_at_age
    }
}

impl Process for BaranovMortality {
    fn label(&self) -> &str {
        &self.label
    }

    fn param_names(&self) -> &'static [&'static str] {
        &["natural_mortality", "fishing_mortality"]
    }

    fn get_param(&self, name: &str) -> Option<f64> {
        match name {
            "natural_mortality" => Some(self.natural_mortality),
            "fishing_mortality" => Some(self.fishing_mortality),
            _ => None,
        }
    }

    fn set_param(&mut self, name: &str, value: f64) -> FscResult<()> {
        if value < 0.0 {
            return Err(fsc_err!(Error: "Baranov mortality '{}' requires non-negative parameters", self.label));
        }
        match name {
            "natural_mortality" => {
                self.natural_mortality = value;
                Ok(())
            }
            "fishing_mortality" => {
                self.fishing_mortality = value;
                Ok(())
            }
            _ => Err(fsc_err!(Error: "Baranov mortality '{}' has no addressable parameter named '{}'", self.label, name)),
        }
    }

    fn execute(
        &mut self,
        partition: &mut Partition,
        _ctx: ProcessContext,
        _objective: &mut ObjectiveAccumulator,
    ) -> FscResult<()> {
        let category = partition
            .get_mut(&self.category)
            .ok_or_else(|| fsc_err!(Error: "mortality '{}' targets unknown category '{}'", self.label, self.category))?;

        let n = category.bins();
        self.last_catch_at_age.clear();
        self.last_catch_at_age.resize(n, 0.0);

        for (i, v) in category.data_mut().iter_mut().enumerate() {
            let f_i = self.fishing_mortality * (self.selectivity)(i);
            let z_i = self.natural_mortality + f_i;
            if z_i <= 0.0 {
                continue;
            }
            let survival = (-z_i).exp();
            let exploitation = if z_i > 0.0 { (f_i / z_i) * (1.0 - survival) } else { 0.0 };
            self.last_catch_at_age[i] = *v * exploitation;
            *v *= survival;
        }
        Ok(())
    }
}

/// Ageing: shifts every bin up by one age, accumulating the oldest two
/// bins into the top (plus-group) bin. Mass-preserving by construction.
#[derive(Clone, Debug)]
pub struct Ageing {
    pub label: String,
}

impl Ageing {
    pub fn new(label: impl Into<String>) -> Self {
        Ageing { label: label.into() }
    }
}

impl Process for Ageing {
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
            let data = category.data_mut();
            let n = data.len();
            if n < 2 {
                continue;
            }
            let plus_group_incoming = data[n - 1];
            for i in (1..n).rev() {
                data[i] = data[i - 1];
            }
            data[n - 1] += plus_group_incoming;
            data[0] = 0.0;
        }
        Ok(())
    }
}

/// Maturation: moves `proportion(age) * N_immature[age]` from an
/// immature category into a mature category, age bin by age bin.
/// `proportion` is an injected closure (e.g. a logistic ogive evaluated
/// via `fsc-selectivity`) over the integer age index.
pub struct Maturation {
    pub label: String,
    pub from_category: String,
    pub to_category: String,
    pub proportion: Arc<dyn Fn(usize) -> f64 + Send + Sync>,
}

impl std::fmt::Debug for Maturation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Maturation")
            .field("label", &self.label)
            .field("from_category", &self.from_category)
            .field("to_category", &self.to_category)
            .finish()
    }
}

impl Maturation {
    pub fn new(
        label: impl Into<String>,
        from_category: impl Into<String>,
        to_category: impl Into<String>,
        proportion: Arc<dyn Fn(usize) -> f64 + Send + Sync>,
    ) -> Self {
        Maturation {
            label: label.into(),
            from_category: from_category.into(),
            to_category: to_category.into(),
            proportion,
        }
    }
}

impl Process for Maturation {
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
        if self.from_category == self.to_category {
            return Err(fsc_err!(
                Verify: "maturation '{}' requires distinct from/to categories",
                self.label
            ));
        }
        let from_key = partition
            .find(&self.from_category)
            .ok_or_else(|| fsc_err!(Error: "maturation '{}' targets unknown category '{}'", self.label, self.from_category))?;
        let to_key = partition
            .find(&self.to_category)
            .ok_or_else(|| fsc_err!(Error: "maturation '{}' targets unknown category '{}'", self.label, self.to_category))?;

        let n = partition.category(from_key).bins();
        let mut moved = vec![0.0; n];
        {
            let from = partition.category_mut(from_key);
            for (i, v) in from.data_mut().iter_mut().enumerate() {
                let p = (self.proportion)(i).clamp(0.0, 1.0);
                moved[i] = *v * p;
                *v -= moved[i];
            }
        }
        let to = partition.category_mut(to_key);
        let to_bins = to.bins().min(n);
        for (i, m) in moved.into_iter().enumerate().take(to_bins) {
            to.data_mut()[i] += m;
        }
        Ok(())
    }
}

/// Tagging: releases a fixed number of tagged individuals (reweighted by
/// a per-age release-proportion vector) into a tag-partition category,
/// without removing them from the source category — tag releases add
/// externally-marked individuals to the accounting partition, they do
/// not represent a physical transfer of the same fish out of the
/// untagged population.
#[derive(Clone, Debug)]
pub struct Tagging {
    pub label: String,
    pub tag_category: String,
    pub release_at_age: Vec<f64>,
    pub reporting_rate: f64,
}

impl Tagging {
    pub fn new(
        label: impl Into<String>,
        tag_category: impl Into<String>,
        release_at_age: Vec<f64>,
        reporting_rate: f64,
    ) -> FscResult<Self> {
        let label = label.into();
        if !(0.0..=1.0).contains(&reporting_rate) {
            return Err(fsc_err!(
                Error: "tagging '{}' requires reporting_rate in [0,1], got {}",
                label,
                reporting_rate
            ));
        }
        Ok(Tagging {
            label,
            tag_category: tag_category.into(),
            release_at_age,
            reporting_rate,
        })
    }
}

impl Process for Tagging {
    fn label(&self) -> &str {
        &self.label
    }

    fn execute(
        &mut self,
        partition: &mut Partition,
        _ctx: ProcessContext,
        _objective: &mut ObjectiveAccumulator,
    ) -> FscResult<()> {
        let category = partition
            .get_mut(&self.tag_category)
            .ok_or_else(|| fsc_err!(Error: "tagging '{}' targets unknown category '{}'", self.label, self.tag_category))?;
        let n = category.bins().min(self.release_at_age.len());
        for i in 0..n {
            category.data_mut()[i] += self.release_at_age[i] * self.reporting_rate;
        }
        Ok(())
    }
}

/// Age→length transition: recomputes a category's numbers-at-length from
/// its numbers-at-age via an injected closure so this process does not
/// depend on `fsc-agelength`'s concrete transition-row cache. The closure
/// receives `(numbers_at_age, out_numbers_at_length)` and is expected to
/// apply the cached transition matrix for the current `(year, time_step)`.
pub struct Transition {
    pub label: String,
    pub category: String,
    pub apply: Arc<dyn Fn(&[f64], &mut [f64]) -> FscResult<()> + Send + Sync>,
    pub length_bins: usize,
}

impl std::fmt::Debug for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transition")
            .field("label", &self.label)
            .field("category", &self.category)
            .field("length_bins", &self.length_bins)
            .finish()
    }
}

impl Transition {
    pub fn new(
        label: impl Into<String>,
        category: impl Into<String>,
        length_bins: usize,
        apply: Arc<dyn Fn(&[f64], &mut [f64]) -> FscResult<()> + Send + Sync>,
    ) -> Self {
        Transition {
            label: label.into(),
            category: category.into(),
            apply,
            length_bins,
        }
    }
}

impl Process for Transition {
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
        let category = partition
            .get_mut(&self.category)
            .ok_or_else(|| fsc_err!(Error: "transition '{}' targets unknown category '{}'", self.label, self.category))?;
        let numbers_at_age = category.data().to_vec();
        let mut numbers_at_length = vec![0.0; self.length_bins];
        (self.apply)(&numbers_at_age, &mut numbers_at_length)?;

        let total_before: f64 = numbers_at_age.iter().sum();
        let total_after: f64 = numbers_at_length.iter().sum();
        if (total_after - total_before).abs() > 1e-6 * total_before.abs().max(1.0) {
            return Err(fsc_err!(
                CodeError: "transition '{}' did not preserve total numbers ({} -> {})",
                self.label,
                total_before,
                total_after
            ));
        }

        let data = category.data_mut();
        let n = data.len().min(numbers_at_length.len());
        data[..n].copy_from_slice(&numbers_at_length[..n]);
        for slot in data[n..].iter_mut() {
            *slot = 0.0;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::Partition;
    use crate::process::ProcessContext;

    fn ctx() -> ProcessContext {
        ProcessContext {
            year: 2020,
            time_step: 0,
            initialising: false,
        }
    }

    #[test]
    fn constant_recruitment_adds_to_first_bin() {
        let mut partition = Partition::build([("stage".to_string(), 1, 5)]).unwrap();
        let mut process = ConstantRecruitment::new("recruit", "stage", 1000.0);
        let mut objective = ObjectiveAccumulator::new();
        process.execute(&mut partition, ctx(), &mut objective).unwrap();
        assert_eq!(partition.get("stage").unwrap().data()[0], 1000.0);
    }

    #[test]
    fn beverton_holt_recruitment_scales_with_ssb() {
        let mut partition = Partition::build([("stage".to_string(), 1, 5)]).unwrap();
        let ssb_fn: Arc<dyn Fn(&Partition) -> f64 + Send + Sync> = Arc::new(|_p: &Partition| 5_000.0);
        let mut process =
            BevertonHoltRecruitment::new("bh", "stage", 1.0e7, 0.75, 10_000.0, ssb_fn).unwrap();
        let mut objective = ObjectiveAccumulator::new();
        process.execute(&mut partition, ctx(), &mut objective).unwrap();
        let recruits = partition.get("stage").unwrap().data()[0];
        assert!(recruits > 0.0 && recruits.is_finite());
    }

    #[test]
    fn constant_mortality_decays_uniformly() {
        let mut partition = Partition::build([("stage".to_string(), 1, 3)]).unwrap();
        partition.get_mut("stage").unwrap().data_mut().copy_from_slice(&[100.0, 100.0, 100.0]);
        let mut process = ConstantMortality::new("m", 0.2).unwrap();
        let mut objective = ObjectiveAccumulator::new();
        process.execute(&mut partition, ctx(), &mut objective).unwrap();
        let expected = 100.0 * (-0.2_f64).exp();
        for v in partition.get("stage").unwrap().data() {
            assert!((v - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn baranov_mortality_removes_catch_and_decays_survivors() {
        let mut partition = Partition::build([("stage".to_string(), 1, 2)]).unwrap();
        partition.get_mut("stage").unwrap().data_mut().copy_from_slice(&[1000.0, 1000.0]);
        let sel: Arc<dyn Fn(usize) -> f64 + Send + Sync> = Arc::new(|_i: usize| 1.0);
        let mut process = BaranovMortality::new("f", "stage", 0.2, 0.3, sel).unwrap();
        let mut objective = ObjectiveAccumulator::new();
        process.execute(&mut partition, ctx(), &mut objective).unwrap();
        assert!(process.last_catch()[0] > 0.0);
        assert!(partition.get("stage").unwrap().data()[0] < 1000.0);
    }

    #[test]
    fn ageing_shifts_bins_and_accumulates_plus_group() {
        let mut partition = Partition::build([("stage".to_string(), 1, 3)]).unwrap();
        partition.get_mut("stage").unwrap().data_mut().copy_from_slice(&[10.0, 20.0, 30.0]);
        let mut process = Ageing::new("age");
        let mut objective = ObjectiveAccumulator::new();
        process.execute(&mut partition, ctx(), &mut objective).unwrap();
        assert_eq!(partition.get("stage").unwrap().data(), &[0.0, 10.0, 50.0]);
    }

    #[test]
    fn maturation_moves_proportion_between_categories() {
        let mut partition = Partition::build([
            ("immature".to_string(), 1, 3),
            ("mature".to_string(), 1, 3),
        ])
        .unwrap();
        partition.get_mut("immature").unwrap().data_mut().copy_from_slice(&[100.0, 100.0, 100.0]);
        let ogive: Arc<dyn Fn(usize) -> f64 + Send + Sync> =
            Arc::new(|i: usize| if i == 0 { 0.0 } else { 1.0 });
        let mut process = Maturation::new("mat", "immature", "mature", ogive);
        let mut objective = ObjectiveAccumulator::new();
        process.execute(&mut partition, ctx(), &mut objective).unwrap();
        assert_eq!(partition.get("immature").unwrap().data(), &[100.0, 0.0, 0.0]);
        assert_eq!(partition.get("mature").unwrap().data(), &[0.0, 100.0, 100.0]);
    }

    #[test]
    fn tagging_releases_scaled_by_reporting_rate() {
        let mut partition = Partition::build([("tag".to_string(), 1, 3)]).unwrap();
        let mut process = Tagging::new("tag_release", "tag", vec![10.0, 20.0, 30.0], 0.5).unwrap();
        let mut objective = ObjectiveAccumulator::new();
        process.execute(&mut partition, ctx(), &mut objective).unwrap();
        assert_eq!(partition.get("tag").unwrap().data(), &[5.0, 10.0, 15.0]);
    }

    #[test]
    fn transition_preserves_total_numbers() {
        let mut partition = Partition::build([("stage".to_string(), 1, 2)]).unwrap();
        partition.get_mut("stage").unwrap().data_mut().copy_from_slice(&[10.0, 20.0]);
        let apply: Arc<dyn Fn(&[f64], &mut [f64]) -> FscResult<()> + Send + Sync> =
            Arc::new(|numbers_at_age: &[f64], out: &mut [f64]| {
                let total: f64 = numbers_at_age.iter().sum();
                out[0] = total * 0.4;
                out[1] = total * 0.6;
                Ok(())
            });
        let mut process = Transition::new("grow", "stage", 2, apply);
        let mut objective = ObjectiveAccumulator::new();
        process.execute(&mut partition, ctx(), &mut objective).unwrap();
        let data = partition.get("stage").unwrap().data();
        assert!((data[0] - 12.0).abs() < 1e-9);
        assert!((data[1] - 18.0).abs() < 1e-9);
    }

    #[test]
    fn transition_rejects_non_preserving_closure() {
        let mut partition = Partition::build([("stage".to_string(), 1, 2)]).unwrap();
        partition.get_mut("stage").unwrap().data_mut().copy_from_slice(&[10.0, 20.0]);
        let apply: Arc<dyn Fn(&[f64], &mut [f64]) -> FscResult<()> + Send + Sync> =
            Arc::new(|_numbers_at_age: &[f64], out: &mut [f64]| {
                out[0] = 1.0;
                out[1] = 1.0;
                Ok(())
            });
        let mut process = Transition::new("grow", "stage", 2, apply);
        let mut objective = ObjectiveAccumulator::new();
        let err = process.execute(&mut partition, ctx(), &mut objective).unwrap_err();
        assert!(matches!(err, fsc_error::FscError::CodeError { .. }));
    }
}
