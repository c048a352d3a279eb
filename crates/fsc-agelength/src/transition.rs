//! The age-length transition matrix: for a growth curve
//! and CV profile, the cached joint distribution `T[year][time_step][age][length_bin]`
//! converting numbers-at-age into numbers-at-length. Rebuilt only for
//! (year, time-step) pairs flagged dirty by a growth/CV parameter change —
//! an explicit dirty-set propagation rather than an unconditional
//! rebuild on every access.

use crate::cdf::CdfCompatibility;
use crate::growth::{CvProfile, GrowthCurveKind};
use fsc_error::{FscResult, fsc_err};
use std::collections::HashMap;

/// The length-bin grid: `edges[i]..edges[i+1]` is bin `i`; the final bin
/// is a plus-group accumulating everything at or above `edges[last]`.
#[derive(Clone, Debug)]
pub struct LengthGrid {
    edges: Vec<f64>,
    plus_group: bool,
}

impl LengthGrid {
    /// `edges` must be strictly increasing; `edges.len() - 1` ordinary
    /// bins are formed, plus one plus-group bin at the top when
    /// `plus_group` is set (the canonical case — "Plus-group
    /// bin receives `1 - Σ previous`").
    pub fn new(edges: Vec<f64>, plus_group: bool) -> FscResult<Self> {
        if edges.len() < 2 {
            return Err(fsc_err!(Verify: "length grid requires at least two edges"));
        }
        if edges.windows(2).any(|w| w[1] <= w[0]) {
            return Err(fsc_err!(Verify: "length grid edges must be strictly increasing"));
        }
        Ok(LengthGrid { edges, plus_group })
    }

    /// Number of length bins, including the plus group if enabled.
    pub fn num_bins(&self) -> usize {
        let ordinary = self.edges.len() - 1;
        if self.plus_group { ordinary + 1 } else { ordinary }
    }

    pub fn lower(&self, bin: usize) -> f64 {
        self.edges[bin]
    }

    /// Upper edge of `bin`, or `f64::INFINITY` for the plus-group bin.
    pub fn upper(&self, bin: usize) -> f64 {
        if self.plus_group && bin == self.edges.len() - 1 {
            f64::INFINITY
        } else {
            self.edges[bin + 1]
        }
    }

    pub fn has_plus_group(&self) -> bool {
        self.plus_group
    }
}

/// Which CDF family a transition row is computed under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrowthDistribution {
    Normal,
    Lognormal,
}

/// Computes one transition row `row[j] = P(length in bin j | age)` for a
/// single age, under the requested distribution and CDF compatibility.
/// Bins below the grid's first edge are not represented: the bin above
/// the grid is excluded and, symmetrically, nothing below the grid is
/// ever allocated mass since growth curves only target the configured
/// span.
pub fn transition_row(
    grid: &LengthGrid,
    mean_length: f64,
    cv: f64,
    distribution: GrowthDistribution,
    compat: CdfCompatibility,
) -> FscResult<Vec<f64>> {
    if mean_length <= 0.0 {
        return Err(fsc_err!(Error: "non-positive mean length {} in age-length transition", mean_length));
    }
    if cv <= 0.0 {
        return Err(fsc_err!(Error: "non-positive CV {} in age-length transition", cv));
    }

    let n = grid.num_bins();
    let mut row = vec![0.0; n];

    match distribution {
        GrowthDistribution::Normal => {
            let sigma = cv * mean_length;
            let mut cum_prev = compat.cdf((grid.lower(0) - mean_length) / sigma);
            for j in 0..n {
                let is_plus = grid.has_plus_group() && j == n - 1;
                if is_plus {
                    row[j] = (1.0 - cum_prev).max(0.0);
                } else {
                    let upper = grid.upper(j);
                    let cum_upper = compat.cdf((upper - mean_length) / sigma);
                    row[j] = (cum_upper - cum_prev).max(0.0);
                    cum_prev = cum_upper;
                }
            }
        }
        GrowthDistribution::Lognormal => {
            let sigma_sq = (1.0 + cv * cv).ln();
            let sigma = sigma_sq.sqrt();
            let mu_log = mean_length.ln() - sigma_sq / 2.0;
            let log_edge = |x: f64| if x <= 0.0 { 0.0001_f64.ln() } else { x.ln() };

            let mut cum_prev = compat.cdf((log_edge(grid.lower(0)) - mu_log) / sigma);
            for j in 0..n {
                let is_plus = grid.has_plus_group() && j == n - 1;
                if is_plus {
                    row[j] = (1.0 - cum_prev).max(0.0);
                } else {
                    let upper = grid.upper(j);
                    let cum_upper = compat.cdf((log_edge(upper) - mu_log) / sigma);
                    row[j] = (cum_upper - cum_prev).max(0.0);
                    cum_prev = cum_upper;
                }
            }
        }
    }

    Ok(row)
}

/// Keys a cached transition row by the (year, time-step) pair it was
/// built for; `age_bin` is implicit in the row's position inside the
/// per-(year,time_step) `Vec<Vec<f64>>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct YearTimeStep {
    pub year: u32,
    pub time_step: usize,
}

/// The cached joint distribution `T[year][time_step][age][length_bin]`,
/// rebuilt only for (year, time-step) pairs whose growth/CV inputs have
/// changed since the last build.
#[derive(Debug, Default)]
pub struct TransitionCache {
    rows: HashMap<YearTimeStep, Vec<Vec<f64>>>,
    dirty: bool,
}

impl TransitionCache {
    pub fn new() -> Self {
        TransitionCache {
            rows: HashMap::new(),
            dirty: true,
        }
    }

    /// Marks every cached (year, time-step) entry for rebuild — called
    /// when a growth or CV parameter that affects the whole cache
    /// changes.
    pub fn mark_all_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Builds (or rebuilds, if dirty) the rows for `(year, time_step)`
    /// across `min_age..=max_age`, only allocating an entry the first
    /// time it is requested for that key — matching "years for which no
    /// observation/process requested a transition are not allocated."
    #[allow(clippy::too_many_arguments)]
    pub fn ensure_built(
        &mut self,
        key: YearTimeStep,
        growth: &GrowthCurveKind,
        cv_profile: &CvProfile,
        grid: &LengthGrid,
        min_age: u32,
        max_age: u32,
        distribution: GrowthDistribution,
        compat: CdfCompatibility,
    ) -> FscResult<()> {
        let needs_build = self.dirty || !self.rows.contains_key(&key);
        if !needs_build {
            return Ok(());
        }

        let mut ages_rows = Vec::with_capacity((max_age - min_age + 1) as usize);
        for age in min_age..=max_age {
            let mu = growth.mean_length(key.year, key.time_step, age as f64);
            let cv_at = if cv_profile.by_length {
                cv_profile.cv_at(mu)
            } else {
                cv_profile.cv_at(age as f64)
            };
            let row = transition_row(grid, mu, cv_at, distribution, compat)?;
            let sum: f64 = row.iter().sum();
            if grid.has_plus_group() && (sum - 1.0).abs() > 1e-9 {
                return Err(fsc_err!(
                    CodeError: "transition row for age {} sums to {} (expected 1.0)",
                    age,
                    sum
                ));
            }
            ages_rows.push(row);
        }

        self.rows.insert(key, ages_rows);
        Ok(())
    }

    pub fn row(&self, key: YearTimeStep, age_index: usize) -> Option<&[f64]> {
        self.rows.get(&key).and_then(|ages| ages.get(age_index)).map(Vec::as_slice)
    }

    /// Clears the dirty flag once every requested key has been rebuilt
    /// for the current parameter values.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Adds `S(age) * N_age[i] * T[y][t][i][j]` into `out` for every age `i`
/// and length bin `j`. `selectivity`
/// omitted (pass `None`) skips the selectivity factor; `remap` skips bins
/// whose remap entry is negative and otherwise redirects `j` to a coarser
/// output length grid.
pub fn populate_numbers_at_length(
    numbers_at_age: &[f64],
    rows: &[Vec<f64>],
    out_numbers_at_length: &mut [f64],
    selectivity: Option<&dyn Fn(usize) -> f64>,
    remap: Option<&[i32]>,
) -> FscResult<()> {
    if numbers_at_age.len() != rows.len() {
        return Err(fsc_err!(
            CodeError: "numbers-at-age length {} does not match transition row count {}",
            numbers_at_age.len(),
            rows.len()
        ));
    }

    for (i, (n_age, row)) in numbers_at_age.iter().zip(rows.iter()).enumerate() {
        let s = selectivity.map_or(1.0, |f| f(i));
        if s == 0.0 || *n_age == 0.0 {
            continue;
        }
        for (j, t_ij) in row.iter().enumerate() {
            if *t_ij == 0.0 {
                continue;
            }
            let out_j = match remap {
                Some(r) => {
                    let mapped = r[j];
                    if mapped < 0 {
                        continue;
                    }
                    mapped as usize
                }
                None => j,
            };
            out_numbers_at_length[out_j] += s * n_age * t_ij;
        }
    }
    Ok(())
}
