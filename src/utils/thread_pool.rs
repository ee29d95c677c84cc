use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::error;

/// Default number of worker threads: available parallelism, capped at 8.
#[must_use]
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
        .min(8)
}

/// Build the worker pool that runs check and snapshot tasks
///
/// A `num_threads` of 0 falls back to [`default_threads`].
///
/// # Errors
///
/// Returns an error if the operating system refuses to spawn the threads
pub fn build_worker_pool(num_threads: usize) -> anyhow::Result<ThreadPool> {
    let num_threads = if num_threads == 0 {
        default_threads()
    } else {
        num_threads
    };

    let pool = ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("foldwatch-worker-{i}"))
        // Rayon aborts on unhandled panics in spawned jobs
        .panic_handler(|_| error!("Worker job panicked outside the task boundary"))
        .build()?;

    Ok(pool)
}
