//! Mean length/weight tables: per time-step x age, rebuilt
//! whenever the current year or a growth parameter changes — the same
//! dirty-flag shape as [`crate::transition::TransitionCache`], but keyed
//! only by `(time_step, age_index)` since weight-at-age does not need a
//! separate per-year table once the growth curve has been evaluated for
//! the year.

use fsc_error::{FscResult, fsc_err};

/// `W = a * L^b`, the standard allometric length-weight relationship.
#[derive(Clone, Debug)]
pub struct LengthWeight {
    pub label: String,
    pub a: f64,
    pub b: f64,
}

impl LengthWeight {
    pub fn new(label: impl Into<String>, a: f64, b: f64) -> FscResult<Self> {
        let label = label.into();
        if a <= 0.0 {
            return Err(fsc_err!(Verify: "length-weight relationship '{}' requires a > 0", label));
        }
        Ok(LengthWeight { label, a, b })
    }

    pub fn weight_at_length(&self, length: f64) -> f64 {
        if length <= 0.0 {
            0.0
        } else {
            self.a * length.powf(self.b)
        }
    }
}

/// Per-time-step x age table of mean length and mean weight, subscribed
/// to a growth curve and a length-weight relationship (Build establishes
/// this cross-reference Lifecycles note).
#[derive(Debug, Default)]
pub struct MeanLengthWeightTable {
    mean_length: Vec<Vec<f64>>,
    mean_weight: Vec<Vec<f64>>,
    dirty: bool,
}

impl MeanLengthWeightTable {
    pub fn new() -> Self {
        MeanLengthWeightTable {
            mean_length: Vec::new(),
            mean_weight: Vec::new(),
            dirty: true,
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Rebuilds the full table for `time_steps` time steps over
    /// `min_age..=max_age`, using `growth` for mean length and
    /// `length_weight` for mean weight. Only does work when dirty.
    pub fn ensure_built(
        &mut self,
        year: u32,
        time_steps: usize,
        min_age: u32,
        max_age: u32,
        growth: &dyn Fn(u32, usize, f64) -> f64,
        length_weight: &LengthWeight,
    ) {
        if !self.dirty {
            return;
        }
        let n_ages = (max_age - min_age + 1) as usize;
        self.mean_length = Vec::with_capacity(time_steps);
        self.mean_weight = Vec::with_capacity(time_steps);
        for ts in 0..time_steps {
            let mut lengths = Vec::with_capacity(n_ages);
            let mut weights = Vec::with_capacity(n_ages);
            for age in min_age..=max_age {
                let mu = growth(year, ts, age as f64);
                lengths.push(mu);
                weights.push(length_weight.weight_at_length(mu));
            }
            self.mean_length.push(lengths);
            self.mean_weight.push(weights);
        }
        self.dirty = false;
    }

    pub fn mean_length_at(&self, time_step: usize, age_index: usize) -> f64 {
        self.mean_length[time_step][age_index]
    }

    pub fn mean_weight_at(&self, time_step: usize, age_index: usize) -> f64 {
        self.mean_weight[time_step][age_index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_follows_allometric_relationship() {
        let lw = LengthWeight::new("lw", 0.00001, 3.0).unwrap();
        let w = lw.weight_at_length(50.0);
        assert!((w - 0.00001 * 50f64.powf(3.0)).abs() < 1e-12);
        assert_eq!(lw.weight_at_length(0.0), 0.0);
    }

    #[test]
    fn table_rebuilds_only_when_dirty() {
        let lw = LengthWeight::new("lw", 0.00001, 3.0).unwrap();
        let growth = |_y: u32, _t: usize, age: f64| 80.0 * (1.0 - (-0.2 * age).exp());
        let mut table = MeanLengthWeightTable::new();
        table.ensure_built(2020, 2, 1, 5, &growth, &lw);
        assert!(!table.is_dirty());
        let before = table.mean_length_at(0, 0);

        table.ensure_built(2021, 2, 1, 5, &growth, &lw);
        assert_eq!(table.mean_length_at(0, 0), before);

        table.mark_dirty();
        table.ensure_built(2021, 2, 1, 5, &growth, &lw);
        assert!(!table.is_dirty());
    }
}
