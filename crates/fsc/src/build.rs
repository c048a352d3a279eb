//! The `Build` step of the Validate → Build → Reset → Execute →
//! Finalise lifecycle: turns an already-tokenised [`crate::config::ParameterList`]
//! into the concrete core/selectivity/age-length/estimate types their
//! crates define, resolving each block's `type` tag against the relevant
//! tagged-enum family. No text grammar lives here — `ParameterList` is
//! assumed already split into blocks by a collaborator upstream of this
//! crate.

use fsc_agelength::growth::{Basic, GrowthCurveKind, Schnute, VonBertalanffy};
use fsc_core::Likelihood;
use fsc_error::{FscResult, fsc_err};
use fsc_estimation::estimate::{Estimate, PriorKind};
use fsc_selectivity::{
    AllValues, AllValuesBounded, Constant, DoubleExponential, DoubleNormal, DoubleNormalKind,
    Increasing, KnifeEdge, Logistic, MigrationRate, SelectivityKind,
};

use crate::config::ParameterList;

/// Builds a [`SelectivityKind`] from a `selectivity[label]` block. `Multi`
/// and `Compound` selectivities are not buildable from a flat parameter
/// list alone (they reference other already-resolved selectivity caches),
/// so this factory covers every selectivity family states takes
/// its parameters directly off the block.
pub fn build_selectivity(block: &ParameterList) -> FscResult<SelectivityKind> {
    let label = block.label().to_string();
    let kind: String = block.get_str("type")?.to_string();
    match kind.as_str() {
        "Constant" => Ok(SelectivityKind::Constant(Constant::new(label, block.get_f64("alpha")?))),
        "KnifeEdge" => Ok(SelectivityKind::KnifeEdge(KnifeEdge::new(
            label,
            block.get_f64("e")?,
            block.get_f64("alpha")?,
        ))),
        "Logistic" => Ok(SelectivityKind::Logistic(Logistic::new(
            label,
            block.get_f64("a50")?,
            block.get_f64("a_to95")?,
            block.get_or("amin", "0").parse().map_err(|_| {
                fsc_err!(Verify: "selectivity '{}' parameter 'amin' is not a valid number", block.label())
            })?,
            block.get_or("alpha", "1").parse().map_err(|_| {
                fsc_err!(Verify: "selectivity '{}' parameter 'alpha' is not a valid number", block.label())
            })?,
        )?)),
        "InverseLogistic" => Ok(SelectivityKind::InverseLogistic(Logistic::new(
            label,
            block.get_f64("a50")?,
            block.get_f64("a_to95")?,
            block.get_or("amin", "0").parse().map_err(|_| {
                fsc_err!(Verify: "selectivity '{}' parameter 'amin' is not a valid number", block.label())
            })?,
            block.get_or("alpha", "1").parse().map_err(|_| {
                fsc_err!(Verify: "selectivity '{}' parameter 'alpha' is not a valid number", block.label())
            })?,
        )?)),
        "DoubleNormal" => {
            let sigma_l = block.get_f64("sigma_l")?;
            let sigma_r = block.get_f64("sigma_r")?;
            let alpha = block.get_or("alpha", "1").parse().map_err(|_| {
                fsc_err!(Verify: "selectivity '{}' parameter 'alpha' is not a valid number", block.label())
            })?;
            let dnk = if let (Ok(mu_low), Ok(mu_high)) = (block.get_f64("mu_low"), block.get_f64("mu_high")) {
                DoubleNormalKind::Plateau { mu_low, mu_high }
            } else if let (Ok(peak), Ok(initial), Ok(final_)) =
                (block.get_f64("peak"), block.get_f64("initial"), block.get_f64("final"))
            {
                DoubleNormalKind::Ss3 { peak, initial, final_ }
            } else {
                DoubleNormalKind::Symmetric { mu: block.get_f64("mu")? }
            };
            Ok(SelectivityKind::DoubleNormal(DoubleNormal::new(label, dnk, sigma_l, sigma_r, alpha)?))
        }
        "DoubleExponential" => Ok(SelectivityKind::DoubleExponential(DoubleExponential::new(
            label,
            block.get_f64("x0")?,
            block.get_f64("x1")?,
            block.get_f64("x2")?,
            block.get_f64("y0")?,
            block.get_f64("y1")?,
            block.get_f64("y2")?,
            block.get_or("alpha", "1").parse().map_err(|_| {
                fsc_err!(Verify: "selectivity '{}' parameter 'alpha' is not a valid number", block.label())
            })?,
        )?)),
        "AllValues" => Ok(SelectivityKind::AllValues(AllValues::new(
            label,
            block.get_usize("min_index")? as u32,
            block.get_vec_f64("v")?,
        )?)),
        "AllValuesBounded" => Ok(SelectivityKind::AllValuesBounded(AllValuesBounded::new(
            label,
            block.get_usize("low")? as u32,
            block.get_usize("high")? as u32,
            block.get_vec_f64("v")?,
        )?)),
        "Increasing" => Ok(SelectivityKind::Increasing(Increasing::new(
            label,
            block.get_usize("min_index")? as u32,
            block.get_vec_f64("v")?,
        )?)),
        "MigrationRate" => Ok(SelectivityKind::MigrationRate(MigrationRate::new(
            label,
            block.get_f64("min_set_age")?,
            block.get_f64("max_set_age")?,
            block.get_f64("y_young")?,
            block.get_f64("y_old")?,
            block.get_f64("y1_dash")?,
            block.get_f64("k")?,
        )?)),
        other => Err(fsc_err!(Verify: "block '{}' has unrecognised selectivity type '{}'", block.label(), other)),
    }
}

/// Builds a [`GrowthCurveKind`] from a `growth[label]` block.
pub fn build_growth_curve(block: &ParameterList) -> FscResult<GrowthCurveKind> {
    let label = block.label().to_string();
    let kind: String = block.get_str("type")?.to_string();
    match kind.as_str() {
        "VonBertalanffy" => Ok(GrowthCurveKind::VonBertalanffy(VonBertalanffy::new(
            label,
            block.get_f64("linf")?,
            block.get_f64("k")?,
            block.get_f64("t0")?,
        )?)),
        "Schnute" => Ok(GrowthCurveKind::Schnute(Schnute::new(
            label,
            block.get_f64("y1")?,
            block.get_f64("y2")?,
            block.get_f64("l1")?,
            block.get_f64("l2")?,
            block.get_f64("a")?,
            block.get_f64("b")?,
        )?)),
        "Basic" => Ok(GrowthCurveKind::Basic(Basic::new(label, block.get_f64("length")?))),
        other => Err(fsc_err!(Verify: "block '{}' has unrecognised growth curve type '{}'", block.label(), other)),
    }
}

/// Builds a [`Likelihood`] from an `observation[label]` block's
/// `likelihood` family tag and its associated nuisance parameters.
pub fn build_likelihood(block: &ParameterList) -> FscResult<Likelihood> {
    let kind: String = block.get_str("likelihood")?.to_string();
    match kind.as_str() {
        "Normal" => Ok(Likelihood::Normal { sigma: block.get_f64("sigma")? }),
        "Lognormal" => Ok(Likelihood::Lognormal { sigma: block.get_f64("sigma")? }),
        "Multinomial" => Ok(Likelihood::Multinomial {
            effective_sample_size: block.get_f64("effective_sample_size")?,
        }),
        "DirichletMultinomial" => Ok(Likelihood::DirichletMultinomial {
            effective_sample_size: block.get_f64("effective_sample_size")?,
            theta: block.get_f64("theta")?,
        }),
        "Bernoulli" => Ok(Likelihood::Bernoulli),
        "Poisson" => Ok(Likelihood::Poisson),
        other => Err(fsc_err!(Verify: "block '{}' has unrecognised likelihood family '{}'", block.label(), other)),
    }
}

/// Builds a [`PriorKind`] from an `estimate[label]` block's `prior` tag,
/// defaulting to `Uniform` when the block does not name one.
pub fn build_prior(block: &ParameterList) -> FscResult<PriorKind> {
    match block.get("prior") {
        None | Some("Uniform") => Ok(PriorKind::Uniform),
        Some("Normal") => Ok(PriorKind::Normal { mean: block.get_f64("prior_mean")?, sd: block.get_f64("prior_sd")? }),
        Some("Lognormal") => Ok(PriorKind::Lognormal {
            mean_log: block.get_f64("prior_mean_log")?,
            sd_log: block.get_f64("prior_sd_log")?,
        }),
        Some("Beta") => {
            Ok(PriorKind::Beta { alpha: block.get_f64("prior_alpha")?, beta: block.get_f64("prior_beta")? })
        }
        Some(other) => Err(fsc_err!(Verify: "block '{}' has unrecognised prior family '{}'", block.label(), other)),
    }
}

/// Builds one [`Estimate`] from an `estimate[label]` block: `address` is the dotted `tag[label].param` target
/// [`crate::addressable::route_address`] resolves at evaluation time.
pub fn build_estimate(block: &ParameterList) -> FscResult<Estimate> {
    let address = block.get_str("address")?.to_string();
    let mut estimate = Estimate::new(
        address,
        block.get_f64("value")?,
        block.get_f64("lower_bound")?,
        block.get_f64("upper_bound")?,
    )?
    .with_phase(block.get_usize("phase").unwrap_or(1) as u32)
    .with_prior(build_prior(block)?);

    if !block.get_bool("estimated").unwrap_or(true) {
        estimate = estimate.not_estimated();
    }
    if !block.get_bool("in_objective").unwrap_or(true) {
        estimate = estimate.excluded_from_objective();
    }
    Ok(estimate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_logistic_selectivity_from_a_block() {
        let mut block = ParameterList::new("selectivity[FishingSel]");
        block.push("type", "Logistic").push("a50", "8.0").push("a_to95", "3.0");
        let sel = build_selectivity(&block).unwrap();
        assert_eq!(sel.label(), "selectivity[FishingSel]");
    }

    #[test]
    fn builds_von_bertalanffy_growth_curve_from_a_block() {
        let mut block = ParameterList::new("growth[main]");
        block.push("type", "VonBertalanffy").push("linf", "90").push("k", "0.2").push("t0", "-0.5");
        let curve = build_growth_curve(&block).unwrap();
        assert!((curve.mean_length(2020, 0, 10.0) - 90.0 * (1.0 - (-0.2f64 * 10.5).exp())).abs() < 1e-9);
    }

    #[test]
    fn builds_lognormal_likelihood_from_a_block() {
        let mut block = ParameterList::new("observation[index]");
        block.push("likelihood", "Lognormal").push("sigma", "0.3");
        assert_eq!(build_likelihood(&block).unwrap(), Likelihood::Lognormal { sigma: 0.3 });
    }

    #[test]
    fn builds_estimate_with_default_uniform_prior_and_phase() {
        let mut block = ParameterList::new("estimate[r0]");
        block
            .push("address", "process[Recruitment].r0")
            .push("value", "1.0e6")
            .push("lower_bound", "1.0")
            .push("upper_bound", "1.0e9");
        let estimate = build_estimate(&block).unwrap();
        assert_eq!(estimate.label, "process[Recruitment].r0");
        assert_eq!(estimate.phase, 1);
        assert_eq!(estimate.prior, PriorKind::Uniform);
    }

    #[test]
    fn unrecognised_selectivity_type_is_a_verify_error() {
        let mut block = ParameterList::new("selectivity[bad]");
        block.push("type", "NotARealKind");
        assert!(build_selectivity(&block).is_err());
    }
}
