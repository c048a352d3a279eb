//! Floating-point environment reset on worker-thread launch.
//!
//! A thread-local FP control word reset ensures every worker thread rounds
//! IEEE-754 arithmetic identically regardless of what the host process
//! configured before spawning. Safe Rust on the platforms this crate
//! targets does not expose (or need) a rounding-mode control register —
//! the default rounding mode is round-to-nearest-even on every supported
//! target and is not thread-local state a spawned thread could have
//! inherited in a different configuration. This function is kept as a
//! documented no-op so the call site in
//! [`crate::domain::thread_pool::Worker`] stays an explicit step in the
//! worker launch sequence rather than silently dropping it.
#[inline]
pub fn reset_fp_environment() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_identical_scores_across_worker_counts() {
        reset_fp_environment();
        let a: f64 = (0..1000).map(|i| (i as f64).sqrt()).sum();
        reset_fp_environment();
        let b: f64 = (0..1000).map(|i| (i as f64).sqrt()).sum();
        assert_eq!(a.to_bits(), b.to_bits());
    }
}
