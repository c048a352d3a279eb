//! The likelihood library: named families scoring model predictions
//! against data as a negative-log-likelihood contribution to the
//! objective. Pure math only — no `Partition`/`Observation` wiring lives
//! here, that belongs to the caller that knows how to turn a partition
//! snapshot into an expected value.

use fsc_error::{FscResult, fsc_err};

/// The named likelihood families this library supports. Each variant holds
/// the nuisance parameters the family needs beyond the observed/expected
/// values themselves (an error/CV, sample size, or dispersion term).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Likelihood {
    Normal { sigma: f64 },
    Lognormal { sigma: f64 },
    Multinomial { effective_sample_size: f64 },
    DirichletMultinomial { effective_sample_size: f64, theta: f64 },
    Bernoulli,
    Poisson,
}

impl Likelihood {
    /// Scalar families (normal, lognormal, Bernoulli, Poisson) score one
    /// observed/expected pair; calling this on a compositional family
    /// (multinomial, Dirichlet-multinomial) is a caller error.
    pub fn neg_log_likelihood_scalar(&self, observed: f64, expected: f64) -> FscResult<f64> {
        match self {
            Likelihood::Normal { sigma } => {
                if *sigma <= 0.0 {
                    return Err(fsc_err!(Error: "normal likelihood requires sigma > 0, got {}", sigma));
                }
                let z = (observed - expected) / sigma;
                Ok(0.5 * z * z + sigma.ln())
            }
            Likelihood::Lognormal { sigma } => {
                if *sigma <= 0.0 {
                    return Err(fsc_err!(Error: "lognormal likelihood requires sigma > 0, got {}", sigma));
                }
                if observed <= 0.0 || expected <= 0.0 {
                    return Err(fsc_err!(
                        Error: "lognormal likelihood requires observed and expected > 0, got {} and {}",
                        observed,
                        expected
                    ));
                }
                let z = (observed.ln() - expected.ln()) / sigma;
                Ok(0.5 * z * z + sigma.ln() + observed.ln())
            }
            Likelihood::Bernoulli => {
                if !(0.0..=1.0).contains(&observed) {
                    return Err(fsc_err!(
                        Error: "Bernoulli likelihood requires observed in [0,1], got {}",
                        observed
                    ));
                }
                let p = expected.clamp(1e-12, 1.0 - 1e-12);
                Ok(-(observed * p.ln() + (1.0 - observed) * (1.0 - p).ln()))
            }
            Likelihood::Poisson => {
                if expected <= 0.0 {
                    return Err(fsc_err!(Error: "Poisson likelihood requires expected > 0, got {}", expected));
                }
                Ok(expected - observed * expected.ln() + ln_gamma(observed + 1.0))
            }
            Likelihood::Multinomial { .. } | Likelihood::DirichletMultinomial { .. } => Err(fsc_err!(
                CodeError: "compositional likelihood scored against a scalar observed/expected pair"
            )),
        }
    }

    /// Compositional families (multinomial, Dirichlet-multinomial) score
    /// a vector of observed proportions against a vector of expected
    /// proportions, both assumed to already sum to (approximately) 1.
    pub fn neg_log_likelihood_vector(&self, observed: &[f64], expected: &[f64]) -> FscResult<f64> {
        if observed.len() != expected.len() {
            return Err(fsc_err!(
                CodeError: "observed/expected length mismatch ({} vs {}) in compositional likelihood",
                observed.len(),
                expected.len()
            ));
        }
        match self {
            Likelihood::Multinomial { effective_sample_size } => {
                if *effective_sample_size <= 0.0 {
                    return Err(fsc_err!(
                        Error: "multinomial likelihood requires effective_sample_size > 0"
                    ));
                }
                let mut score = 0.0;
                for (&o, &e) in observed.iter().zip(expected.iter()) {
                    if o <= 0.0 {
                        continue;
                    }
                    let p = e.max(1e-12);
                    score -= effective_sample_size * o * p.ln();
                }
                Ok(score)
            }
            Likelihood::DirichletMultinomial { effective_sample_size, theta } => {
                if *effective_sample_size <= 0.0 || *theta <= 0.0 {
                    return Err(fsc_err!(
                        Error: "Dirichlet-multinomial likelihood requires effective_sample_size and theta > 0"
                    ));
                }
                let n = *effective_sample_size;
                let alpha_sum = n * theta;
                let mut score = -(ln_gamma(n + 1.0) + ln_gamma(alpha_sum) - ln_gamma(n + alpha_sum));
                for (&o, &e) in observed.iter().zip(expected.iter()) {
                    let count = n * o.max(0.0);
                    if count <= 0.0 {
                        continue;
                    }
                    let alpha_i = alpha_sum * e.max(1e-12);
                    score -= ln_gamma(count + alpha_i) - ln_gamma(count + 1.0) - ln_gamma(alpha_i);
                }
                Ok(score)
            }
            _ => Err(fsc_err!(
                CodeError: "scalar likelihood scored against a vector observed/expected pair"
            )),
        }
    }

    pub fn is_compositional(&self) -> bool {
        matches!(self, Likelihood::Multinomial { .. } | Likelihood::DirichletMultinomial { .. })
    }
}

/// Lanczos approximation of `ln(Gamma(x))`, the same hand-rolled special
/// function this workspace's prior-density and minimiser modules each
/// keep their own small copy of rather than pulling in a special-
/// functions crate (consistent with `fsc-core::linalg`'s and
/// `fsc-agelength::cdf`'s hand-rolled numeric primitives).
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
