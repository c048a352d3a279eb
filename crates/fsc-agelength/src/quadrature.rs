//! Length-based-selectivity-in-an-age-model quadrature: when
//! an age model applies a length-based selectivity, it evaluates
//! `Σ_k w_k · S(L_k)` where `L_k` are Gauss-Hermite-style quantiles of the
//! length-at-age distribution. Lives here rather than in `fsc-selectivity`
//! since it needs the age-length relationship to produce the quantiles in
//! the first place, avoiding a circular crate dependency.

const DEFAULT_N_QUANTILES: usize = 5;

/// Inverse standard-normal CDF (probit), Acklam's rational approximation
/// (~1.15e-9 relative error), used to place the equal-probability
/// quantile points this quadrature averages over.
fn inverse_normal_cdf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];

    let p_low = 0.02425;
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    if p < p_low {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - p_low {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}

/// The `n` equal-probability quantile points of `N(mean, sigma)`, used as
/// the `L_k` nodes: midpoints of `n` equal-width probability bins,
/// equally weighted (`w_k = 1/n`).
pub fn length_at_age_quantiles(mean: f64, sigma: f64, n_quantiles: usize) -> Vec<f64> {
    let n = n_quantiles.max(1);
    (0..n)
        .map(|k| {
            let p = (k as f64 + 0.5) / n as f64;
            mean + sigma * inverse_normal_cdf(p)
        })
        .collect()
}

/// `Σ_k w_k · S(L_k)` for the default (or given) quantile count, equally
/// weighted over the length-at-age distribution's quantile nodes.
pub fn quantile_average_selectivity(
    mean: f64,
    sigma: f64,
    n_quantiles: Option<usize>,
    selectivity: impl Fn(f64) -> f64,
) -> f64 {
    let n = n_quantiles.unwrap_or(DEFAULT_N_QUANTILES);
    let nodes = length_at_age_quantiles(mean, sigma, n);
    nodes.iter().map(|&l| selectivity(l)).sum::<f64>() / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantiles_are_symmetric_about_mean() {
        let nodes = length_at_age_quantiles(50.0, 5.0, 5);
        assert_eq!(nodes.len(), 5);
        assert!((nodes[2] - 50.0).abs() < 1e-6);
        assert!((nodes[0] - 50.0 + (nodes[4] - 50.0)).abs() < 1e-6);
    }

    #[test]
    fn constant_selectivity_averages_to_itself() {
        let avg = quantile_average_selectivity(50.0, 5.0, Some(5), |_| 0.7);
        assert!((avg - 0.7).abs() < 1e-9);
    }

    #[test]
    fn step_selectivity_approximates_half_below_mean() {
        let avg = quantile_average_selectivity(50.0, 5.0, Some(5), |l| if l >= 50.0 { 1.0 } else { 0.0 });
        assert!((avg - 0.6).abs() < 1e-6, "avg={avg}");
    }

    #[test]
    fn default_quantile_count_is_five() {
        let n5 = length_at_age_quantiles(50.0, 5.0, 5).len();
        assert_eq!(n5, DEFAULT_N_QUANTILES);
    }
}
