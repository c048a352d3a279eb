//! Dispatch abstraction shared by the gradient engine and the
//! estimation/MCMC candidate pool.

use crate::domain::thread_pool::{ThreadPool, WaitGroup};

pub enum Executor {
    Serial,
    WorkerPool(ThreadPool),
}

impl Executor {
    pub fn serial() -> Self {
        Executor::Serial
    }

    pub fn worker_pool(num_workers: usize) -> Self {
        Executor::WorkerPool(ThreadPool::new(num_workers))
    }

    /// A worker pool whose RNG streams are reproducible for a fixed
    /// `master_seed`.
    pub fn worker_pool_with_seed(num_workers: usize, master_seed: u64) -> Self {
        Executor::WorkerPool(ThreadPool::with_seed(num_workers, master_seed))
    }

    pub fn num_workers(&self) -> usize {
        match self {
            Executor::Serial => 1,
            Executor::WorkerPool(pool) => pool.num_workers(),
        }
    }

    pub fn execute<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        match self {
            Executor::Serial => f(),
            Executor::WorkerPool(pool) => pool.submit_with_result(f).result(),
        }
    }

    /// Dispatches a batch of jobs and returns their results in submission
    /// order.
    pub fn execute_batch<F, R>(&self, jobs: Vec<F>) -> Vec<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        match self {
            Executor::Serial => jobs.into_iter().map(|job| job()).collect(),
            Executor::WorkerPool(pool) => {
                let wg = WaitGroup::new();
                let mut results = Vec::with_capacity(jobs.len());
                for job in jobs {
                    let guard = wg.guard();
                    results.push(pool.submit_with_result(move || {
                        let res = job();
                        drop(guard);
                        res
                    }));
                }
                wg.wait();
                results.into_iter().map(|r| r.result()).collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_executor_preserves_order() {
        let executor = Executor::serial();
        let jobs: Vec<_> = (0..5).map(|i| move || i * i).collect();
        let results = executor.execute_batch(jobs);
        assert_eq!(results, vec![0, 1, 4, 9, 16]);
    }

    #[test]
    fn worker_pool_preserves_submission_order() {
        let executor = Executor::worker_pool_with_seed(3, 7);
        let jobs: Vec<_> = (0..10).map(|i| move || i * 2).collect();
        let results = executor.execute_batch(jobs);
        assert_eq!(results, (0..10).map(|i| i * 2).collect::<Vec<_>>());
    }
}
