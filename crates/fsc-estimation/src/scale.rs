//! Bound-scaling core: the tan/atan bijection between a
//! bounded parameter and an unconstrained scaled value, plus the boundary
//! penalty the minimiser and HMC both add to the objective on every
//! evaluation.

use std::f64::consts::PI;

/// `s = tan(((p-L)/(H-L) - 0.5) * pi)`; `0.0` when `L == H`.
pub fn scale(p: f64, lower: f64, upper: f64) -> f64 {
    if upper == lower {
        return 0.0;
    }
    let frac = (p - lower) / (upper - lower);
    ((frac - 0.5) * PI).tan()
}

/// `p = ((atan(s)/pi) + 0.5) * (H-L) + L`.
pub fn unscale(s: f64, lower: f64, upper: f64) -> f64 {
    if upper == lower {
        return lower;
    }
    ((s.atan() / PI) + 0.5) * (upper - lower) + lower
}

/// Boundary penalty on the scaled value `s`: a quadratic
/// outside `[-0.9999, 0.9999]`, zero in the interior.
pub fn boundary_penalty(s: f64) -> f64 {
    if s < -0.9999 {
        (s + 0.9999).powi(2) * 1e5
    } else if s > 0.9999 {
        (s - 0.9999).powi(2) * 1e5
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_within_open_interval() {
        for p in [1.0, 5.5, 9.99, 10.001, 19.9] {
            let s = scale(p, 1.0, 20.0);
            let back = unscale(s, 1.0, 20.0);
            assert!((back - p).abs() < 1e-10, "p={p} back={back}");
        }
    }

    #[test]
    fn degenerate_bounds_scale_to_zero() {
        assert_eq!(scale(5.0, 5.0, 5.0), 0.0);
        assert_eq!(unscale(0.0, 5.0, 5.0), 5.0);
        assert_eq!(unscale(3.7, 5.0, 5.0), 5.0);
    }

    #[test]
    fn boundary_penalty_is_zero_in_interior() {
        assert_eq!(boundary_penalty(0.0), 0.0);
        assert_eq!(boundary_penalty(-0.9999), 0.0);
        assert_eq!(boundary_penalty(0.9999), 0.0);
    }

    #[test]
    fn boundary_penalty_grows_outside_interior() {
        assert!(boundary_penalty(1.0) > 0.0);
        assert!(boundary_penalty(-1.5) > boundary_penalty(-1.1));
    }

    #[test]
    fn midpoint_scales_to_zero() {
        let s = scale(10.0, 0.0, 20.0);
        assert!(s.abs() < 1e-9);
    }
}
