//! The numerical finite-difference gradient engine: a
//! single-sided perturbation per scaled-parameter component, dispatched
//! as one batch to the thread pool and gathered back in submission order.

use fsc_core::Executor;
use std::sync::Arc;

/// Default perturbation step, `h` in pub const DEFAULT_GRADIENT_STEP_SIZE: f64 = 1e-7;

/// Objective evaluated at a scaled parameter vector, shared across the
/// batch of perturbed evaluations dispatched to the executor.
pub type ScaledObjectiveFn = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// Computes the gradient of `objective` at scaled point `s`, perturbing
/// each component by `h * sign(s_i)` (nonzero even when `s_i == 0`) and
/// dispatching all `n` perturbed evaluations as one batch.
pub struct Gradient {
    pub step_size: f64,
}

impl Default for Gradient {
    fn default() -> Self {
        Gradient {
            step_size: DEFAULT_GRADIENT_STEP_SIZE,
        }
    }
}

impl Gradient {
    pub fn new(step_size: f64) -> Self {
        Gradient { step_size }
    }

    /// `f(s)` at the unperturbed point, needed as the common baseline for
    /// every component's single-sided difference.
    pub fn compute(&self, s: &[f64], f_at_s: f64, objective: &ScaledObjectiveFn, executor: &Executor) -> Vec<f64> {
        let n = s.len();
        let perturbed: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                let mut s_prime = s.to_vec();
                let h = if s[i] >= 0.0 { self.step_size } else { -self.step_size };
                s_prime[i] += h;
                s_prime
            })
            .collect();

        let jobs: Vec<_> = perturbed
            .into_iter()
            .map(|s_prime| {
                let objective = Arc::clone(objective);
                move || {
                    let f_prime = objective(&s_prime);
                    (s_prime, f_prime)
                }
            })
            .collect();

        let results = executor.execute_batch(jobs);

        results
            .into_iter()
            .enumerate()
            .map(|(i, (s_prime, f_prime))| {
                let denom = s_prime[i] - s[i];
                (f_prime - f_at_s) / denom
            })
            .collect()
    }

    pub fn norm(gradient: &[f64]) -> f64 {
        gradient.iter().map(|g| g * g).sum::<f64>().sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_of_quadratic_matches_analytic() {
        let gradient = Gradient::default();
        let executor = Executor::serial();
        let objective: ScaledObjectiveFn = Arc::new(|s: &[f64]| s.iter().map(|v| v * v).sum());
        let s = vec![1.0, -2.0, 0.0];
        let f_at_s = objective(&s);
        let g = gradient.compute(&s, f_at_s, &objective, &executor);

        assert_eq!(g.len(), 3);
        assert!((g[0] - 2.0).abs() < 1e-4, "g0={}", g[0]);
        assert!((g[1] - (-4.0)).abs() < 1e-4, "g1={}", g[1]);
        assert!((g[2] - 0.0).abs() < 1e-3, "g2={}", g[2]);
    }

    #[test]
    fn norm_of_zero_gradient_is_zero() {
        assert_eq!(Gradient::norm(&[0.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn zero_component_still_perturbs_nonzero() {
        let gradient = Gradient::default();
        let executor = Executor::serial();
        let objective: ScaledObjectiveFn = Arc::new(|s: &[f64]| s[0]);
        let g = gradient.compute(&[0.0], 0.0, &objective, &executor);
        assert!(g[0].is_finite());
        assert!((g[0] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn worker_pool_dispatch_matches_serial() {
        let gradient = Gradient::default();
        let objective: ScaledObjectiveFn = Arc::new(|s: &[f64]| s.iter().map(|v| v * v).sum());
        let s = vec![3.0, -1.5, 2.2];
        let f_at_s = objective(&s);

        let serial = gradient.compute(&s, f_at_s, &objective, &Executor::serial());
        let pooled = gradient.compute(&s, f_at_s, &objective, &Executor::worker_pool_with_seed(2, 1));

        for (a, b) in serial.iter().zip(pooled.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }
}
