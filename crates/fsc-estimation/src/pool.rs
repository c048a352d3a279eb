//! The candidate pool: a pool of replicated engine instances,
//! one per worker thread, each evaluating whole candidate parameter
//! vectors independently — the richer, stateful sibling of
//! [`fsc_core::Executor`]'s stateless batch dispatch (`Executor` suits
//! the gradient engine's "perturb and re-evaluate a closure" shape;
//! `CandidatePool` suits "apply a candidate to *this worker's own*
//! partition/caches and run a full model iteration").

use fsc_core::domain::random_provider;
use std::sync::mpsc;
use std::thread;

/// Implemented by a single worker's replicated engine instance: applies a
/// candidate (unscaled) parameter vector, runs one full model iteration,
/// and returns the resulting objective total. Errors are the evaluator's
/// responsibility to recover as `f64::INFINITY`.
pub trait CandidateEvaluator: Send + 'static {
    fn evaluate(&mut self, candidate: &[f64]) -> f64;
}

enum Message {
    Evaluate(Vec<f64>, mpsc::SyncSender<f64>),
    Terminate,
}

struct PoolWorker {
    sender: mpsc::Sender<Message>,
    thread: Option<thread::JoinHandle<()>>,
}

/// Pool of replicated engine instances, each evaluating whole candidate
/// vectors on its own worker thread.
pub struct CandidatePool {
    workers: Vec<PoolWorker>,
    next: std::cell::Cell<usize>,
}

impl CandidatePool {
    /// Spawns `num_workers` worker threads, each constructing its own
    /// evaluator via `make_evaluator(worker_index)` and seeding its RNG
    /// deterministically from `master_seed` and its index, matching
    /// [`fsc_core::domain::thread_pool::Worker`]'s launch sequence.
    pub fn new<E, F>(num_workers: usize, master_seed: u64, make_evaluator: F) -> Self
    where
        E: CandidateEvaluator,
        F: Fn(usize) -> E + Send + Sync + 'static,
    {
        let make_evaluator = std::sync::Arc::new(make_evaluator);
        let workers = (0..num_workers.max(1))
            .map(|id| {
                let (sender, receiver) = mpsc::channel::<Message>();
                let make_evaluator = std::sync::Arc::clone(&make_evaluator);
                let thread = thread::spawn(move || {
                    fsc_core::domain::fp_env::reset_fp_environment();
                    random_provider::seed_worker(master_seed, id);
                    let mut evaluator = make_evaluator(id);

                    loop {
                        match receiver.recv() {
                            Ok(Message::Evaluate(candidate, reply)) => {
                                let score = evaluator.evaluate(&candidate);
                                let _ = reply.send(score);
                            }
                            Ok(Message::Terminate) | Err(_) => break,
                        }
                    }
                });
                PoolWorker {
                    sender,
                    thread: Some(thread),
                }
            })
            .collect();

        CandidatePool {
            workers,
            next: std::cell::Cell::new(0),
        }
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Round-robins each candidate to a worker in submission order and
    /// gathers the scores back in that same order.
    pub fn run_candidates(&self, candidates: Vec<Vec<f64>>) -> Vec<f64> {
        let mut receivers = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let worker_index = self.next.get() % self.workers.len();
            self.next.set(worker_index + 1);

            let (reply_tx, reply_rx) = mpsc::sync_channel(1);
            self.workers[worker_index]
                .sender
                .send(Message::Evaluate(candidate, reply_tx))
                .expect("worker thread is alive");
            receivers.push(reply_rx);
        }
        receivers.into_iter().map(|rx| rx.recv().expect("worker reply")).collect()
    }
}

impl Drop for CandidatePool {
    fn drop(&mut self) {
        for worker in &self.workers {
            let _ = worker.sender.send(Message::Terminate);
        }
        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                let _ = thread.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doubling;
    impl CandidateEvaluator for Doubling {
        fn evaluate(&mut self, candidate: &[f64]) -> f64 {
            candidate.iter().sum::<f64>() * 2.0
        }
    }

    #[test]
    fn run_candidates_preserves_submission_order() {
        let pool = CandidatePool::new(3, 7, |_id| Doubling);
        let candidates: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let scores = pool.run_candidates(candidates);
        assert_eq!(scores, (0..10).map(|i| i as f64 * 2.0).collect::<Vec<_>>());
    }

    #[test]
    fn each_worker_gets_a_distinct_index() {
        struct IndexRecorder(usize);
        impl CandidateEvaluator for IndexRecorder {
            fn evaluate(&mut self, _candidate: &[f64]) -> f64 {
                self.0 as f64
            }
        }
        let pool = CandidatePool::new(4, 1, IndexRecorder);
        let candidates: Vec<Vec<f64>> = (0..4).map(|_| vec![0.0]).collect();
        let mut scores = pool.run_candidates(candidates);
        scores.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(scores, vec![0.0, 1.0, 2.0, 3.0]);
    }
}
