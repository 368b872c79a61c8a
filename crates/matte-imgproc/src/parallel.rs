use matte_image::AlphaViewMut;
use thiserror::Error;

/// Errors that can occur during parallel execution.
#[derive(Error, Debug, PartialEq)]
pub enum ParallelError {
    /// The thread pool failed to build.
    #[error("failed to build thread pool: {0}")]
    BuildError(String),

    /// The requested thread count is invalid.
    #[error("thread count must be > 0, got {0}")]
    InvalidThreadCount(usize),
}

/// A unit of work handed to the workers.
pub type Task<'s> = Box<dyn FnOnce() + Send + 's>;

/// A synchronous parallel-for.
///
/// [`Workers::run`] returns once every task has finished, which is the only barrier the
/// transforms rely on between their passes.
pub trait Workers: Sync {
    /// Number of tasks worth splitting one pass into.
    fn num_workers(&self) -> usize;

    /// Run every task to completion.
    ///
    /// # Errors
    ///
    /// If the workers cannot be started.
    fn run<'s>(&self, tasks: Vec<Task<'s>>) -> Result<(), ParallelError>;
}

/// Controls how parallel operations are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStrategy {
    /// Use the global Rayon thread pool, one band per thread.
    #[default]
    Parallel,

    /// Run sequentially on the current thread.
    ///
    /// Useful for small images, debugging, or when the overhead of parallelization
    /// outweighs the benefits.
    Serial,

    /// Run on a local thread pool with `n` threads.
    ///
    /// # Warning
    /// Creates a new thread pool on every call, which has significant overhead.
    /// Use [`WorkerPool`] to keep one alive across calls.
    Fixed(usize),
}

impl Workers for ExecutionStrategy {
    fn num_workers(&self) -> usize {
        match self {
            ExecutionStrategy::Parallel => rayon::current_num_threads(),
            ExecutionStrategy::Serial => 1,
            ExecutionStrategy::Fixed(n) => (*n).max(1),
        }
    }

    fn run<'s>(&self, tasks: Vec<Task<'s>>) -> Result<(), ParallelError> {
        match self {
            ExecutionStrategy::Serial => {
                tasks.into_iter().for_each(|task| task());
            }
            ExecutionStrategy::Parallel => {
                rayon::scope(|s| {
                    for task in tasks {
                        s.spawn(move |_| task());
                    }
                });
            }
            ExecutionStrategy::Fixed(n) => {
                WorkerPool::new(*n)?.run(tasks)?;
            }
        }
        Ok(())
    }
}

/// A dedicated Rayon thread pool kept alive across calls.
#[derive(Debug)]
pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    /// Build a pool of `n` threads.
    ///
    /// # Errors
    ///
    /// If `n` is zero or the pool cannot be built.
    pub fn new(n: usize) -> Result<Self, ParallelError> {
        if n == 0 {
            return Err(ParallelError::InvalidThreadCount(n));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build()
            .map_err(|e| ParallelError::BuildError(e.to_string()))?;
        Ok(Self { pool })
    }
}

impl Workers for WorkerPool {
    fn num_workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn run<'s>(&self, tasks: Vec<Task<'s>>) -> Result<(), ParallelError> {
        self.pool.scope(|s| {
            for task in tasks {
                s.spawn(move |_| task());
            }
        });
        Ok(())
    }
}

/// Run `f` over disjoint horizontal bands of `view`, one per worker.
///
/// `f` receives the index of the first row of its band and the band itself. The results are
/// returned in band order.
///
/// # Errors
///
/// If the workers cannot be started.
pub fn par_bands<R, F>(
    workers: &dyn Workers,
    view: AlphaViewMut<'_>,
    f: F,
) -> Result<Vec<R>, ParallelError>
where
    R: Send,
    F: Fn(usize, AlphaViewMut<'_>) -> R + Sync,
{
    let bands = view.split_bands(workers.num_workers());
    let mut results: Vec<Option<R>> = bands.iter().map(|_| None).collect();
    {
        let f = &f;
        let tasks: Vec<Task<'_>> = bands
            .into_iter()
            .zip(results.iter_mut())
            .map(|((y0, band), slot)| {
                Box::new(move || *slot = Some(f(y0, band))) as Task<'_>
            })
            .collect();
        workers.run(tasks)?;
    }
    Ok(results.into_iter().flatten().collect())
}

/// Run `f` over disjoint groups of consecutive `chunk_len`-long chunks of `data`.
///
/// `f` receives the index of the first chunk of its group and the group itself, whose length
/// is a multiple of `chunk_len`. A trailing partial chunk is left untouched.
///
/// # Errors
///
/// If the workers cannot be started.
pub fn par_chunk_bands<T, R, F>(
    workers: &dyn Workers,
    data: &mut [T],
    chunk_len: usize,
    f: F,
) -> Result<Vec<R>, ParallelError>
where
    T: Send,
    R: Send,
    F: Fn(usize, &mut [T]) -> R + Sync,
{
    let count = if chunk_len == 0 {
        0
    } else {
        data.len() / chunk_len
    };
    let n = workers.num_workers().clamp(1, count.max(1));
    let mut groups = Vec::with_capacity(n);
    let mut rest = &mut data[..count * chunk_len];
    let mut c0 = 0;
    for i in 0..n {
        let c1 = count * (i + 1) / n;
        let (head, tail) = std::mem::take(&mut rest).split_at_mut((c1 - c0) * chunk_len);
        rest = tail;
        groups.push((c0, head));
        c0 = c1;
    }

    let mut results: Vec<Option<R>> = groups.iter().map(|_| None).collect();
    {
        let f = &f;
        let tasks: Vec<Task<'_>> = groups
            .into_iter()
            .zip(results.iter_mut())
            .map(|((c0, group), slot)| Box::new(move || *slot = Some(f(c0, group))) as Task<'_>)
            .collect();
        workers.run(tasks)?;
    }
    Ok(results.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use matte_image::AlphaPlane;

    #[test]
    fn test_serial_runs_in_order() -> Result<(), ParallelError> {
        let mut log = Vec::new();
        {
            let log = std::sync::Mutex::new(&mut log);
            let tasks: Vec<Task<'_>> = (0..4)
                .map(|i| {
                    let log = &log;
                    Box::new(move || log.lock().unwrap().push(i)) as Task<'_>
                })
                .collect();
            ExecutionStrategy::Serial.run(tasks)?;
        }
        assert_eq!(log, vec![0, 1, 2, 3]);
        Ok(())
    }

    #[test]
    fn test_fixed_zero_threads() {
        let res = ExecutionStrategy::Fixed(0).run(Vec::new());
        assert_eq!(res, Err(ParallelError::InvalidThreadCount(0)));
        assert!(matches!(
            WorkerPool::new(0),
            Err(ParallelError::InvalidThreadCount(0))
        ));
    }

    #[test]
    fn test_par_bands_writes_every_row() -> Result<(), ParallelError> {
        for strategy in [
            ExecutionStrategy::Serial,
            ExecutionStrategy::Parallel,
            ExecutionStrategy::Fixed(3),
        ] {
            let mut plane = AlphaPlane::new(5, 11);
            let rows = par_bands(&strategy, plane.view_mut(), |y0, mut band| {
                for y in 0..band.height() {
                    band.row_mut(y).fill((y0 + y) as i16);
                }
                band.height()
            })?;
            assert_eq!(rows.iter().sum::<usize>(), 11);
            for y in 0..11 {
                for x in 0..5 {
                    assert_eq!(plane.get(x, y), y as i16);
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_par_chunk_bands_covers_chunks() -> Result<(), ParallelError> {
        let pool = WorkerPool::new(4)?;
        let mut data = vec![0usize; 3 * 10 + 2];
        let firsts = par_chunk_bands(&pool, &mut data, 3, |c0, group| {
            for (i, chunk) in group.chunks_mut(3).enumerate() {
                chunk.fill(c0 + i);
            }
            c0
        })?;
        assert_eq!(firsts[0], 0);
        for c in 0..10 {
            assert_eq!(&data[3 * c..3 * c + 3], &[c, c, c]);
        }
        assert_eq!(&data[30..], &[0, 0]);
        Ok(())
    }
}
