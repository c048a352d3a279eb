//! MCMC sampling: random-walk Metropolis-Hastings and
//! Hamiltonian Monte Carlo drivers sharing one chain/acceptance contract.

pub mod chain;
pub mod hmc;
pub mod proposal;
pub mod rwmh;

pub use chain::{AcceptanceTracker, Chain, ChainLink, ChainState};
pub use hmc::{Hmc, HmcConfig};
pub use proposal::{Proposal, ProposalKind};
pub use rwmh::{Rwmh, RwmhConfig, DEFAULT_TARGET_ACCEPTANCE};

pub mod prelude {
    pub use super::chain::{Chain, ChainLink, ChainState};
    pub use super::hmc::{Hmc, HmcConfig};
    pub use super::proposal::ProposalKind;
    pub use super::rwmh::{Rwmh, RwmhConfig};
}
