pub mod arena;
pub mod fp_env;
pub mod random_provider;
pub mod thread_pool;

pub use arena::{Arena, ArenaKey};
pub use thread_pool::{ThreadPool, WaitGroup};
