//! Addressable routing: splits a dotted address of the form
//! `tag[label].param` and routes the update to the matching engine-owned
//! object. `fsc_selectivity::addressable` already defines the
//! `selectivity[label].param` form verbatim; this module generalises the
//! same shape to `process[label].param`.

use fsc_core::process::AnnualCycle;
use fsc_error::{FscResult, fsc_err};
use fsc_selectivity::{Addressable, SelectivityKind};
use std::collections::HashMap;

/// Splits `tag[label].param` into `(tag, label, param)`.
pub fn parse_tagged_address(address: &str) -> FscResult<(&str, &str, &str)> {
    let open = address
        .find('[')
        .ok_or_else(|| fsc_err!(Verify: "malformed addressable '{}', expected 'tag[label].param'", address))?;
    let tag = &address[..open];
    let rest = &address[open + 1..];
    let close = rest
        .find(']')
        .ok_or_else(|| fsc_err!(Verify: "malformed addressable '{}', missing closing ']'", address))?;
    let label = &rest[..close];
    let param = rest[close + 1..]
        .strip_prefix('.')
        .ok_or_else(|| fsc_err!(Verify: "malformed addressable '{}', expected '.param' after ']'", address))?;
    Ok((tag, label, param))
}

/// Routes one estimate's unscaled value onto whichever engine-owned
/// collection its tag names. Unknown tags, labels, or parameter names are
/// all `kError`-class failures: recoverable by the objective
/// evaluator as an infinite objective, not a structural abort.
pub fn route_address(
    address: &str,
    selectivities: &mut HashMap<String, SelectivityKind>,
    annual_cycle: &mut AnnualCycle,
    value: f64,
) -> FscResult<()> {
    let (tag, label, param) = parse_tagged_address(address)?;
    match tag {
        "selectivity" => selectivities
            .get_mut(label)
            .ok_or_else(|| fsc_err!(Error: "no selectivity named '{}'", label))?
            .set_param(param, value),
        "process" => annual_cycle.set_process_param(label, param, value),
        other => Err(fsc_err!(Error: "unrecognised addressable tag '{}' in '{}'", other, address)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tag_label_and_param() {
        let (tag, label, param) = parse_tagged_address("selectivity[FishingSel].a50").unwrap();
        assert_eq!(tag, "selectivity");
        assert_eq!(label, "FishingSel");
        assert_eq!(param, "a50");
    }

    #[test]
    fn rejects_malformed_address() {
        assert!(parse_tagged_address("selectivity.a50").is_err());
        assert!(parse_tagged_address("selectivity[FishingSel]a50").is_err());
    }

    #[test]
    fn unrecognised_tag_is_an_error() {
        let mut selectivities = HashMap::new();
        let mut cycle = AnnualCycle::new(vec![]);
        let result = route_address("report[x].y", &mut selectivities, &mut cycle, 1.0);
        assert!(result.is_err());
    }
}
