//! The MCMC chain: an append-only sequence of
//! samples, kept subject to the `iteration % keep == 0` stride, each
//! tagged `burn_in` or `mcmc` by its iteration index relative to the
//! configured burn-in length.

use fsc_core::ObjectiveValue;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainState {
    BurnIn,
    Mcmc,
}

/// One recorded MCMC sample. A rejected proposal
/// still produces a link when kept — it re-records the previous link's
/// score and values under the rejecting iteration's index.
#[derive(Clone, Debug)]
pub struct ChainLink {
    pub iteration: usize,
    pub state: ChainState,
    pub total_score: f64,
    pub likelihood: f64,
    pub prior: f64,
    pub penalty: f64,
    pub additional_priors: f64,
    pub jacobians: f64,
    pub acceptance_rate: f64,
    pub acceptance_rate_since_adapt: f64,
    pub step_size: f64,
    pub parameter_values: Vec<f64>,
}

impl ChainLink {
    /// Reconstructs the [`ObjectiveValue`] this link recorded, used when a
    /// rejected proposal re-records the previous link's score under the
    /// rejecting iteration's index.
    pub fn clone_objective(&self) -> ObjectiveValue {
        ObjectiveValue {
            total: self.total_score,
            likelihood: self.likelihood,
            prior: self.prior,
            penalty: self.penalty,
            additional_priors: self.additional_priors,
            jacobians: self.jacobians,
        }
    }

    pub fn from_objective(
        iteration: usize,
        burn_in: usize,
        objective: &ObjectiveValue,
        acceptance_rate: f64,
        acceptance_rate_since_adapt: f64,
        step_size: f64,
        parameter_values: Vec<f64>,
    ) -> Self {
        ChainLink {
            iteration,
            state: if iteration < burn_in { ChainState::BurnIn } else { ChainState::Mcmc },
            total_score: objective.total,
            likelihood: objective.likelihood,
            prior: objective.prior,
            penalty: objective.penalty,
            additional_priors: objective.additional_priors,
            jacobians: objective.jacobians,
            acceptance_rate,
            acceptance_rate_since_adapt,
            step_size,
            parameter_values,
        }
    }
}

/// Running acceptance-rate bookkeeping, reset at each step-size adaptation
/// boundary.
#[derive(Clone, Debug, Default)]
pub struct AcceptanceTracker {
    accepted_total: u64,
    total: u64,
    accepted_since_adapt: u64,
    since_adapt: u64,
}

impl AcceptanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, accepted: bool) {
        self.total += 1;
        self.since_adapt += 1;
        if accepted {
            self.accepted_total += 1;
            self.accepted_since_adapt += 1;
        }
    }

    pub fn rate(&self) -> f64 {
        if self.total == 0 { 0.0 } else { self.accepted_total as f64 / self.total as f64 }
    }

    pub fn rate_since_adapt(&self) -> f64 {
        if self.since_adapt == 0 { 0.0 } else { self.accepted_since_adapt as f64 / self.since_adapt as f64 }
    }

    pub fn reset_adapt_window(&mut self) {
        self.accepted_since_adapt = 0;
        self.since_adapt = 0;
    }
}

/// The append-only chain of kept samples.
#[derive(Clone, Debug, Default)]
pub struct Chain {
    links: Vec<ChainLink>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, link: ChainLink) {
        self.links.push(link);
    }

    pub fn links(&self) -> &[ChainLink] {
        &self.links
    }

    pub fn last(&self) -> Option<&ChainLink> {
        self.links.last()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Sample mean of every kept parameter-value vector, used to recompute
    /// the proposal covariance from the in-chain samples.
    pub fn sample_covariance(&self) -> Option<fsc_core::Matrix> {
        let n = self.links.first()?.parameter_values.len();
        if n == 0 || self.links.len() < 2 {
            return None;
        }
        let count = self.links.len() as f64;
        let mut mean = vec![0.0; n];
        for link in &self.links {
            for (m, &v) in mean.iter_mut().zip(link.parameter_values.iter()) {
                *m += v / count;
            }
        }
        let mut cov = fsc_core::Matrix::zeros(n, n);
        for link in &self.links {
            for i in 0..n {
                for j in 0..n {
                    let di = link.parameter_values[i] - mean[i];
                    let dj = link.parameter_values[j] - mean[j];
                    cov.set(i, j, cov.get(i, j) + di * dj / (count - 1.0));
                }
            }
        }
        Some(cov)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn objective(total: f64) -> ObjectiveValue {
        ObjectiveValue {
            total,
            likelihood: total,
            prior: 0.0,
            penalty: 0.0,
            additional_priors: 0.0,
            jacobians: 0.0,
        }
    }

    #[test]
    fn state_tag_follows_burn_in_boundary() {
        let early = ChainLink::from_objective(3, 10, &objective(1.0), 0.5, 0.5, 1.0, vec![0.0]);
        let late = ChainLink::from_objective(15, 10, &objective(1.0), 0.5, 0.5, 1.0, vec![0.0]);
        assert_eq!(early.state, ChainState::BurnIn);
        assert_eq!(late.state, ChainState::Mcmc);
    }

    #[test]
    fn acceptance_tracker_rates_are_bounded() {
        let mut tracker = AcceptanceTracker::new();
        for accepted in [true, true, false, true, false] {
            tracker.record(accepted);
        }
        assert!((tracker.rate() - 0.6).abs() < 1e-9);
        tracker.reset_adapt_window();
        assert_eq!(tracker.rate_since_adapt(), 0.0);
    }

    #[test]
    fn sample_covariance_is_none_with_fewer_than_two_links() {
        let mut chain = Chain::new();
        chain.push(ChainLink::from_objective(0, 0, &objective(1.0), 1.0, 1.0, 1.0, vec![0.0, 0.0]));
        assert!(chain.sample_covariance().is_none());
    }

    #[test]
    fn sample_covariance_matches_hand_computed_variance() {
        let mut chain = Chain::new();
        for v in [1.0, 2.0, 3.0] {
            chain.push(ChainLink::from_objective(0, 0, &objective(1.0), 1.0, 1.0, 1.0, vec![v]));
        }
        let cov = chain.sample_covariance().unwrap();
        assert!((cov.get(0, 0) - 1.0).abs() < 1e-9);
    }
}
