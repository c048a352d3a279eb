//! Selectivity addressables: every selectivity parameter is
//! exposed by a dotted name, `selectivity[<label>].<param>`, so `@estimate`
//! and `@time_varying` blocks can target it without the estimation or
//! MCMC driver knowing selectivity internals.

use fsc_error::{FscResult, fsc_err};

/// Implemented by every concrete selectivity so its tunable fields can be
/// read and written by label without a downcast.
pub trait Addressable {
    /// Parameter names this selectivity exposes, e.g. `["a50", "a_to95", "amin", "alpha"]`.
    fn param_names(&self) -> &'static [&'static str];

    fn get_param(&self, name: &str) -> Option<f64>;

    fn set_param(&mut self, name: &str, value: f64) -> FscResult<()>;
}

/// Builds the full dotted address `selectivity[<label>].<param>` used in
/// `@estimate`/`@time_varying` blocks.
pub fn address(label: &str, param: &str) -> String {
    format!("selectivity[{}].{}", label, param)
}

/// Splits a dotted address back into `(label, param)`, the form the
/// estimate manager needs to route a scalar update to the right object.
pub fn parse_address(address: &str) -> FscResult<(&str, &str)> {
    let rest = address
        .strip_prefix("selectivity[")
        .ok_or_else(|| fsc_err!(Verify: "not a selectivity addressable: '{}'", address))?;
    let close = rest
        .find(']')
        .ok_or_else(|| fsc_err!(Verify: "malformed selectivity addressable: '{}'", address))?;
    let label = &rest[..close];
    let param = rest[close + 1..]
        .strip_prefix('.')
        .ok_or_else(|| fsc_err!(Verify: "malformed selectivity addressable: '{}'", address))?;
    Ok((label, param))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_round_trips() {
        let addr = address("FishingSel", "a50");
        assert_eq!(addr, "selectivity[FishingSel].a50");
        assert_eq!(parse_address(&addr).unwrap(), ("FishingSel", "a50"));
    }

    #[test]
    fn malformed_address_is_rejected() {
        assert!(parse_address("selectivity.a50").is_err());
        assert!(parse_address("selectivity[FishingSel]a50").is_err());
    }
}
