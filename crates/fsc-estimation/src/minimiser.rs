//! The quasi-Newton minimiser: a BFGS Hessian approximation
//! updated from successive gradients, an Armijo-style backtracking line
//! search, and Hessian-to-covariance recovery. A differential-evolution
//! variant is also supplemented: it ignores bounds and produces no
//! covariance.

use crate::gradient::{Gradient, ScaledObjectiveFn};
use fsc_core::domain::random_provider;
use fsc_core::{Executor, Matrix};
use std::sync::Arc;

/// Disposition the minimiser terminates with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MinimiserOutcome {
    Success,
    SuccessStepTooSmall,
    TooManyIterations,
    TooManyEvaluations,
    StepTooSmallNoConvergence,
    Error,
}

#[derive(Clone, Debug)]
pub struct MinimiserConfig {
    pub tolerance: f64,
    pub max_iterations: usize,
    pub max_evaluations: usize,
    pub step_threshold: f64,
    pub gradient_step_size: f64,
}

impl Default for MinimiserConfig {
    fn default() -> Self {
        MinimiserConfig {
            tolerance: 1e-6,
            max_iterations: 500,
            max_evaluations: 5000,
            step_threshold: 1e-10,
            gradient_step_size: crate::gradient::DEFAULT_GRADIENT_STEP_SIZE,
        }
    }
}

#[derive(Debug)]
pub struct MinimiserResult {
    pub outcome: MinimiserOutcome,
    pub scaled: Vec<f64>,
    pub objective: f64,
    pub hessian: Matrix,
    pub iterations: usize,
    pub evaluations: usize,
}

pub struct Minimiser {
    pub config: MinimiserConfig,
}

impl Minimiser {
    pub fn new(config: MinimiserConfig) -> Self {
        Minimiser { config }
    }

    /// Runs the quasi-Newton minimisation from `initial_scaled`, returning
    /// the terminal scaled point, objective, and the (not-yet-inverted)
    /// Hessian approximation for [`Self::covariance`] to invert.
    pub fn minimise(
        &self,
        initial_scaled: Vec<f64>,
        objective: ScaledObjectiveFn,
        executor: &Executor,
    ) -> MinimiserResult {
        let n = initial_scaled.len();
        let gradient_engine = Gradient::new(self.config.gradient_step_size);

        let mut s = initial_scaled;
        let mut f = objective(&s);
        let mut evaluations = 1usize;
        let mut hessian = Matrix::identity(n.max(1));

        if !f.is_finite() {
            return MinimiserResult {
                outcome: MinimiserOutcome::Error,
                scaled: s,
                objective: f,
                hessian,
                iterations: 0,
                evaluations,
            };
        }
        if n == 0 {
            return MinimiserResult {
                outcome: MinimiserOutcome::Success,
                scaled: s,
                objective: f,
                hessian,
                iterations: 0,
                evaluations,
            };
        }

        let mut g = gradient_engine.compute(&s, f, &objective, executor);
        evaluations += n;

        for iteration in 0..self.config.max_iterations {
            if evaluations >= self.config.max_evaluations {
                return MinimiserResult {
                    outcome: MinimiserOutcome::TooManyEvaluations,
                    scaled: s,
                    objective: f,
                    hessian,
                    iterations: iteration,
                    evaluations,
                };
            }

            let grad_norm = Gradient::norm(&g);
            if grad_norm < self.config.tolerance {
                return MinimiserResult {
                    outcome: MinimiserOutcome::Success,
                    scaled: s,
                    objective: f,
                    hessian,
                    iterations: iteration,
                    evaluations,
                };
            }

            // Solve H * delta = -g for the Newton direction.
            let neg_g: Vec<f64> = g.iter().map(|v| -v).collect();
            let delta = match hessian.inverse() {
                Some(inv) => inv.mat_vec(&neg_g),
                None => neg_g.clone(),
            };

            // Armijo backtracking line search.
            let directional_derivative: f64 = g.iter().zip(delta.iter()).map(|(gi, di)| gi * di).sum();
            let mut alpha = 1.0;
            let mut s_next;
            let mut f_next;
            loop {
                s_next = s.iter().zip(delta.iter()).map(|(si, di)| si + alpha * di).collect::<Vec<_>>();
                f_next = objective(&s_next);
                evaluations += 1;
                let armijo_rhs = f + 1e-4 * alpha * directional_derivative;
                if f_next.is_finite() && (f_next <= armijo_rhs || directional_derivative >= 0.0) {
                    break;
                }
                alpha *= 0.5;
                if alpha < self.config.step_threshold {
                    return MinimiserResult {
                        outcome: MinimiserOutcome::StepTooSmallNoConvergence,
                        scaled: s,
                        objective: f,
                        hessian,
                        iterations: iteration,
                        evaluations,
                    };
                }
                if evaluations >= self.config.max_evaluations {
                    return MinimiserResult {
                        outcome: MinimiserOutcome::TooManyEvaluations,
                        scaled: s,
                        objective: f,
                        hessian,
                        iterations: iteration,
                        evaluations,
                    };
                }
            }

            let step: Vec<f64> = s_next.iter().zip(s.iter()).map(|(a, b)| a - b).collect();
            let step_norm = Gradient::norm(&step);
            let f_change = (f - f_next).abs();

            let g_next = gradient_engine.compute(&s_next, f_next, &objective, executor);
            evaluations += n;

            bfgs_update(&mut hessian, &step, &g, &g_next);

            s = s_next;
            f = f_next;
            g = g_next;

            if step_norm < self.config.step_threshold {
                return MinimiserResult {
                    outcome: MinimiserOutcome::SuccessStepTooSmall,
                    scaled: s,
                    objective: f,
                    hessian,
                    iterations: iteration + 1,
                    evaluations,
                };
            }
            if f_change < self.config.step_threshold * f.abs().max(1.0) {
                return MinimiserResult {
                    outcome: MinimiserOutcome::Success,
                    scaled: s,
                    objective: f,
                    hessian,
                    iterations: iteration + 1,
                    evaluations,
                };
            }
        }

        MinimiserResult {
            outcome: MinimiserOutcome::TooManyIterations,
            scaled: s,
            objective: f,
            hessian,
            iterations: self.config.max_iterations,
            evaluations,
        }
    }

    /// Inverts the terminal Hessian (pinning zero rows to the identity
    /// first) to yield the covariance in scaled space.
    /// Call [`covariance_unscaled`] afterward to re-transform to unscaled
    /// space using the terminal parameter values and bounds.
    pub fn covariance(hessian: &Matrix) -> Matrix {
        let mut h = hessian.clone();
        h.pin_zero_rows_to_identity();
        h.inverse().unwrap_or_else(|| Matrix::identity(h.rows()))
    }
}

/// `dp/ds = (4/pi) / ((H-L) * sqrt(1 - (2*(p-L)/(H-L) - 1)^2))`, with
/// non-finite rows (at or outside a bound) replaced by zero.
pub fn dp_ds(p: f64, lower: f64, upper: f64) -> f64 {
    if upper <= lower {
        return 0.0;
    }
    let u = 2.0 * (p - lower) / (upper - lower) - 1.0;
    let inner = 1.0 - u * u;
    if inner <= 0.0 {
        return 0.0;
    }
    let value = (4.0 / std::f64::consts::PI) / ((upper - lower) * inner.sqrt());
    if value.is_finite() { value } else { 0.0 }
}

/// Re-transforms a scaled-space covariance to unscaled space given the
/// terminal parameter values and bounds, in parameter order.
pub fn covariance_unscaled(scaled_cov: &Matrix, values: &[f64], bounds: &[(f64, f64)]) -> Matrix {
    let scales: Vec<f64> = values
        .iter()
        .zip(bounds.iter())
        .map(|(&p, &(lower, upper))| dp_ds(p, lower, upper))
        .collect();
    scaled_cov.scale_rows_cols(&scales)
}

/// BFGS update of the Hessian approximation `H` from the step `s_k = x_{k+1} - x_k`
/// and gradient difference `y_k = g_{k+1} - g_k`, skipped when `y_k^T s_k <= 0`
/// (curvature condition fails, keep the previous approximation rather than
/// corrupt it).
fn bfgs_update(hessian: &mut Matrix, step: &[f64], g: &[f64], g_next: &[f64]) {
    let n = step.len();
    let y: Vec<f64> = g_next.iter().zip(g.iter()).map(|(a, b)| a - b).collect();
    let sy: f64 = step.iter().zip(y.iter()).map(|(s, y)| s * y).sum();
    if sy <= 1e-12 {
        return;
    }

    let hs = hessian.mat_vec(step);
    let shs: f64 = step.iter().zip(hs.iter()).map(|(s, hsi)| s * hsi).sum();
    if shs <= 1e-300 {
        return;
    }

    for i in 0..n {
        for j in 0..n {
            let update = y[i] * y[j] / sy - hs[i] * hs[j] / shs;
            hessian.set(i, j, hessian.get(i, j) + update);
        }
    }
}

/// Differential-evolution minimiser: a bounds-free population search over
/// the *unscaled* parameter space, producing a point estimate with no
/// covariance.
pub struct DifferentialEvolution {
    pub population_size: usize,
    pub max_generations: usize,
    pub crossover_rate: f64,
    pub differential_weight: f64,
}

impl Default for DifferentialEvolution {
    fn default() -> Self {
        DifferentialEvolution {
            population_size: 40,
            max_generations: 200,
            crossover_rate: 0.9,
            differential_weight: 0.8,
        }
    }
}

impl DifferentialEvolution {
    /// Runs DE/rand/1/bin over `initial` as the seed of a population
    /// scattered by `spread` around it, minimising `objective` (evaluated
    /// on unscaled parameters — this variant ignores bounds entirely).
    pub fn minimise(&self, initial: &[f64], spread: f64, objective: &dyn Fn(&[f64]) -> f64) -> (Vec<f64>, f64) {
        let n = initial.len();
        if n == 0 {
            return (initial.to_vec(), objective(initial));
        }

        let mut population: Vec<Vec<f64>> = (0..self.population_size)
            .map(|i| {
                if i == 0 {
                    initial.to_vec()
                } else {
                    initial
                        .iter()
                        .map(|&v| v + spread * (random_provider::range(-1.0..1.0)))
                        .collect()
                }
            })
            .collect();
        let mut scores: Vec<f64> = population.iter().map(|p| objective(p)).collect();

        for _ in 0..self.max_generations {
            for i in 0..self.population_size {
                let (a, b, c) = distinct_triplet(i, self.population_size);
                let r_index = random_provider::range(0..n);
                let mut trial = population[i].clone();
                for j in 0..n {
                    let cross = random_provider::bool(self.crossover_rate) || j == r_index;
                    if cross {
                        trial[j] = population[a][j] + self.differential_weight * (population[b][j] - population[c][j]);
                    }
                }
                let trial_score = objective(&trial);
                if trial_score < scores[i] {
                    population[i] = trial;
                    scores[i] = trial_score;
                }
            }
        }

        let (best_index, &best_score) = scores
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap();
        (population[best_index].clone(), best_score)
    }
}

fn distinct_triplet(exclude: usize, population_size: usize) -> (usize, usize, usize) {
    let pick = |exclude: &[usize]| loop {
        let candidate = random_provider::range(0..population_size);
        if !exclude.contains(&candidate) {
            return candidate;
        }
    };
    let a = pick(&[exclude]);
    let b = pick(&[exclude, a]);
    let c = pick(&[exclude, a, b]);
    (a, b, c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere_objective() -> ScaledObjectiveFn {
        Arc::new(|s: &[f64]| s.iter().map(|v| (v - 1.0).powi(2)).sum())
    }

    #[test]
    fn minimiser_converges_on_sphere() {
        let minimiser = Minimiser::new(MinimiserConfig::default());
        let executor = Executor::serial();
        let result = minimiser.minimise(vec![0.0, 0.0, 0.0], sphere_objective(), &executor);
        assert!(
            matches!(result.outcome, MinimiserOutcome::Success | MinimiserOutcome::SuccessStepTooSmall),
            "outcome={:?}",
            result.outcome
        );
        for v in &result.scaled {
            assert!((v - 1.0).abs() < 1e-3, "v={v}");
        }
    }

    #[test]
    fn minimiser_flags_error_on_nonfinite_start() {
        let minimiser = Minimiser::new(MinimiserConfig::default());
        let executor = Executor::serial();
        let objective: ScaledObjectiveFn = Arc::new(|_s: &[f64]| f64::INFINITY);
        let result = minimiser.minimise(vec![0.0], objective, &executor);
        assert_eq!(result.outcome, MinimiserOutcome::Error);
    }

    #[test]
    fn covariance_is_symmetric_and_correctly_sized() {
        let minimiser = Minimiser::new(MinimiserConfig::default());
        let executor = Executor::serial();
        let result = minimiser.minimise(vec![0.0, 0.0], sphere_objective(), &executor);
        let cov = Minimiser::covariance(&result.hessian);
        assert_eq!(cov.rows(), 2);
        assert_eq!(cov.cols(), 2);
        assert!(cov.is_symmetric(1e-6));
    }

    #[test]
    fn dp_ds_is_zero_at_or_beyond_bounds() {
        assert_eq!(dp_ds(0.0, 0.0, 10.0), 0.0);
        assert_eq!(dp_ds(10.0, 0.0, 10.0), 0.0);
        assert!(dp_ds(5.0, 0.0, 10.0) > 0.0);
    }

    #[test]
    fn differential_evolution_improves_on_sphere() {
        let de = DifferentialEvolution {
            population_size: 20,
            max_generations: 50,
            ..Default::default()
        };
        let objective = |p: &[f64]| p.iter().map(|v| (v - 3.0).powi(2)).sum();
        let (best, score) = de.minimise(&[0.0, 0.0], 5.0, &objective);
        assert!(score < 1.0, "score={score} best={best:?}");
    }
}
