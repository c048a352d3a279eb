pub mod distribution;
pub mod statistics;

pub use distribution::Distribution;
pub use statistics::{Adder, Statistic};
