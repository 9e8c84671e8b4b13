//! Bounded worker pool for per-file jobs.
//!
//! Each run builds its own rayon pool sized to `min(max_workers, jobs)`, so a
//! small sync never spawns idle threads and the global rayon pool is left
//! alone. Jobs run to completion; there is no cancellation. Results come back
//! in job order.

use rayon::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("failed to start worker pool: {0}")]
    Build(#[from] rayon::ThreadPoolBuildError),
}

/// Worker count for `jobs` jobs under a cap of `max_workers`. Never zero.
pub fn worker_count(max_workers: usize, jobs: usize) -> usize {
    max_workers.min(jobs).max(1)
}

/// Run `work` over every job on a dedicated pool and collect the results.
pub fn run<J, R, F>(jobs: &[J], max_workers: usize, work: F) -> Result<Vec<R>, PoolError>
where
    J: Sync,
    R: Send,
    F: Fn(&J) -> R + Sync,
{
    if jobs.is_empty() {
        return Ok(Vec::new());
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(worker_count(max_workers, jobs.len()))
        .thread_name(|i| format!("photosync-worker-{i}"))
        .build()?;
    Ok(pool.install(|| jobs.par_iter().map(&work).collect()))
}
