//! Per-category growth curves: a [`GrowthModel`] yields mean
//! length at (year, time-step, age) and the CV at age, the two inputs the
//! transition cache needs to build a row. Von Bertalanffy is the
//! canonical example; stock-assessment cores of this family typically
//! offer a small family of curves behind the same contract, so Schnute
//! and a no-growth "basic" curve are supplemented here too.

use fsc_error::{FscResult, fsc_err};

/// Shared contract every growth curve implements: mean length at age,
/// independent of the caching/CV machinery that wraps it.
pub trait GrowthModel: std::fmt::Debug {
    fn label(&self) -> &str;

    /// Mean length at the given (year, time-step, age). `year`/`time_step`
    /// are accepted for curves whose parameters vary through time (e.g. a
    /// time-varying `Linf`); the built-in curves here are time-invariant
    /// and ignore them.
    fn mean_length(&self, year: u32, time_step: usize, age: f64) -> f64;
}

/// `L(a) = Linf * (1 - exp(-k*(a - t0)))`.
#[derive(Clone, Debug)]
pub struct VonBertalanffy {
    pub label: String,
    pub linf: f64,
    pub k: f64,
    pub t0: f64,
}

impl VonBertalanffy {
    pub fn new(label: impl Into<String>, linf: f64, k: f64, t0: f64) -> FscResult<Self> {
        let label = label.into();
        if linf <= 0.0 {
            return Err(fsc_err!(Verify: "von Bertalanffy curve '{}' requires linf > 0", label));
        }
        Ok(VonBertalanffy { label, linf, k, t0 })
    }
}

impl GrowthModel for VonBertalanffy {
    fn label(&self) -> &str {
        &self.label
    }

    fn mean_length(&self, _year: u32, _time_step: usize, age: f64) -> f64 {
        self.linf * (1.0 - (-self.k * (age - self.t0)).exp())
    }
}

/// Schnute's generalised growth curve between two reference ages `(y1,y2)`
/// with lengths `(L1,L2)`: reduces to von Bertalanffy as `b -> 1`, to a
/// Gompertz-like form as `a -> 0`.
#[derive(Clone, Debug)]
pub struct Schnute {
    pub label: String,
    pub y1: f64,
    pub y2: f64,
    pub l1: f64,
    pub l2: f64,
    pub a: f64,
    pub b: f64,
}

impl Schnute {
    pub fn new(
        label: impl Into<String>,
        y1: f64,
        y2: f64,
        l1: f64,
        l2: f64,
        a: f64,
        b: f64,
    ) -> FscResult<Self> {
        let label = label.into();
        if y2 <= y1 {
            return Err(fsc_err!(Verify: "Schnute curve '{}' requires y2 > y1", label));
        }
        Ok(Schnute {
            label,
            y1,
            y2,
            l1,
            l2,
            a,
            b,
        })
    }
}

impl GrowthModel for Schnute {
    fn label(&self) -> &str {
        &self.label
    }

    fn mean_length(&self, _year: u32, _time_step: usize, age: f64) -> f64 {
        let Schnute { y1, y2, l1, l2, a, b, .. } = *self;
        if a.abs() > 1e-9 && b.abs() > 1e-9 {
            let numer = 1.0 - (-a * (age - y1)).exp();
            let denom = 1.0 - (-a * (y2 - y1)).exp();
            (l1.powf(b) + (l2.powf(b) - l1.powf(b)) * numer / denom).powf(1.0 / b)
        } else if a.abs() > 1e-9 {
            let numer = 1.0 - (-a * (age - y1)).exp();
            let denom = 1.0 - (-a * (y2 - y1)).exp();
            (l1.ln() + (l2.ln() - l1.ln()) * numer / denom).exp()
        } else if b.abs() > 1e-9 {
            let frac = (age - y1) / (y2 - y1);
            (l1.powf(b) + (l2.powf(b) - l1.powf(b)) * frac).powf(1.0 / b)
        } else {
            let frac = (age - y1) / (y2 - y1);
            (l1.ln() + (l2.ln() - l1.ln()) * frac).exp()
        }
    }
}

/// No-growth curve: a fixed mean length independent of age, used for
/// plus-group-only categories or models that treat length as static.
#[derive(Clone, Debug)]
pub struct Basic {
    pub label: String,
    pub length: f64,
}

impl Basic {
    pub fn new(label: impl Into<String>, length: f64) -> Self {
        Basic {
            label: label.into(),
            length,
        }
    }
}

impl GrowthModel for Basic {
    fn label(&self) -> &str {
        &self.label
    }

    fn mean_length(&self, _year: u32, _time_step: usize, _age: f64) -> f64 {
        self.length
    }
}

/// Tagged dispatch over the built-in growth curves, in the same shape as
/// [`fsc_selectivity::SelectivityKind`] over [`fsc_selectivity::Selectivity`].
#[derive(Debug)]
pub enum GrowthCurveKind {
    VonBertalanffy(VonBertalanffy),
    Schnute(Schnute),
    Basic(Basic),
    Custom(Box<dyn GrowthModel + Send + Sync>),
}

impl GrowthCurveKind {
    fn inner(&self) -> &dyn GrowthModel {
        match self {
            GrowthCurveKind::VonBertalanffy(c) => c,
            GrowthCurveKind::Schnute(c) => c,
            GrowthCurveKind::Basic(c) => c,
            GrowthCurveKind::Custom(c) => c.as_ref(),
        }
    }

    pub fn label(&self) -> &str {
        self.inner().label()
    }

    pub fn mean_length(&self, year: u32, time_step: usize, age: f64) -> f64 {
        self.inner().mean_length(year, time_step, age)
    }
}

/// CV interpolation between `cv_first` and `cv_last` across `[min_age,
/// max_age]`, optionally indexed by length rather than by age.
/// `time_step_offset` is kept as an explicit, documented field defaulting
/// to `0` rather than guessed at, shifting which time step's CV row a
/// multi-timestep year reads.
#[derive(Clone, Debug)]
pub struct CvProfile {
    pub cv_first: f64,
    pub cv_last: f64,
    pub min_age: f64,
    pub max_age: f64,
    pub by_length: bool,
    pub time_step_offset: i32,
}

impl CvProfile {
    pub fn new(cv_first: f64, cv_last: f64, min_age: f64, max_age: f64) -> Self {
        CvProfile {
            cv_first,
            cv_last,
            min_age,
            max_age,
            by_length: false,
            time_step_offset: 0,
        }
    }

    pub fn by_length(mut self, by_length: bool) -> Self {
        self.by_length = by_length;
        self
    }

    pub fn with_time_step_offset(mut self, offset: i32) -> Self {
        self.time_step_offset = offset;
        self
    }

    /// Linearly interpolates the CV at `at` (an age or a length, per
    /// `by_length`), clamped to `[cv_first, cv_last]` outside the
    /// `[min_age, max_age]` span.
    pub fn cv_at(&self, at: f64) -> f64 {
        if self.max_age <= self.min_age {
            return self.cv_first;
        }
        let frac = ((at - self.min_age) / (self.max_age - self.min_age)).clamp(0.0, 1.0);
        self.cv_first + frac * (self.cv_last - self.cv_first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn von_bertalanffy_matches_reference_scenario() {
        let curve = VonBertalanffy::new("growth", 80.0, 0.2, 0.0).unwrap();
        let mu = curve.mean_length(0, 0, 5.0);
        assert!((mu - 50.6).abs() < 0.1, "mu={mu}");
    }

    #[test]
    fn von_bertalanffy_rejects_nonpositive_linf() {
        assert!(VonBertalanffy::new("growth", 0.0, 0.2, 0.0).is_err());
    }

    #[test]
    fn schnute_reduces_to_endpoints() {
        let curve = Schnute::new("growth", 1.0, 10.0, 10.0, 70.0, 0.2, 1.0).unwrap();
        assert!((curve.mean_length(0, 0, 1.0) - 10.0).abs() < 1e-6);
        assert!((curve.mean_length(0, 0, 10.0) - 70.0).abs() < 1e-6);
    }

    #[test]
    fn basic_curve_is_constant() {
        let curve = Basic::new("growth", 42.0);
        assert_eq!(curve.mean_length(2020, 1, 3.0), 42.0);
        assert_eq!(curve.mean_length(2021, 0, 30.0), 42.0);
    }

    #[test]
    fn cv_profile_interpolates_and_clamps() {
        let cv = CvProfile::new(0.1, 0.2, 1.0, 10.0);
        assert!((cv.cv_at(1.0) - 0.1).abs() < 1e-9);
        assert!((cv.cv_at(10.0) - 0.2).abs() < 1e-9);
        assert!((cv.cv_at(5.5) - 0.15).abs() < 1e-9);
        assert_eq!(cv.cv_at(-5.0), 0.1);
        assert_eq!(cv.cv_at(50.0), 0.2);
    }
}
