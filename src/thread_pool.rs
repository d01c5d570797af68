//! Parallel execution helpers.
//!
//! With the `parallel` feature, work runs on rayon: either the global pool or a
//! dedicated pool of `num_threads` workers. Without it everything runs on the
//! calling thread and produces the same results.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Where parallel work runs: the global rayon pool or a dedicated one.
pub struct WorkerPool {
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
}

impl WorkerPool {
    /// Dedicated pool of `num_threads` workers, or the global pool for `None`.
    #[cfg(feature = "parallel")]
    pub fn new(num_threads: Option<usize>) -> Result<Self, String> {
        let pool = num_threads
            .map(|n| {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| format!("failed to build a pool of {n} threads: {e}"))
            })
            .transpose()?;
        Ok(Self { pool })
    }

    #[cfg(not(feature = "parallel"))]
    pub fn new(_num_threads: Option<usize>) -> Result<Self, String> {
        Ok(Self {})
    }

    /// Run `op` inside the pool.
    #[cfg(feature = "parallel")]
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    #[cfg(not(feature = "parallel"))]
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R,
    {
        op()
    }
}

/// `(0..n).map(f)` collected in index order, in parallel when available.
#[cfg(feature = "parallel")]
pub fn map_range<T, F>(n: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    (0..n).into_par_iter().map(f).collect()
}

#[cfg(not(feature = "parallel"))]
pub fn map_range<T, F>(n: usize, f: F) -> Vec<T>
where
    F: Fn(usize) -> T,
{
    (0..n).map(f).collect()
}

/// Map every index to a value and fold the values with `combine`, starting
/// from `identity()`. `combine` must be associative.
#[cfg(feature = "parallel")]
pub fn map_reduce<T, F, I, C>(n: usize, f: F, identity: I, combine: C) -> T
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
    I: Fn() -> T + Sync + Send,
    C: Fn(T, T) -> T + Sync + Send,
{
    (0..n).into_par_iter().map(f).reduce(identity, combine)
}

#[cfg(not(feature = "parallel"))]
pub fn map_reduce<T, F, I, C>(n: usize, f: F, identity: I, combine: C) -> T
where
    F: Fn(usize) -> T,
    I: Fn() -> T,
    C: Fn(T, T) -> T,
{
    (0..n).map(f).fold(identity(), combine)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_range_keeps_order() {
        let out = map_range(1000, |i| i * 2);
        assert_eq!(out.len(), 1000);
        assert!(out.iter().enumerate().all(|(i, &v)| v == i * 2));
    }

    #[test]
    fn test_map_reduce_sums() {
        let total = map_reduce(101, |i| i as u64, || 0, |a, b| a + b);
        assert_eq!(total, 5050);
    }

    #[test]
    fn test_install_with_dedicated_pool() {
        let pool = WorkerPool::new(Some(2)).unwrap();
        let out = pool.install(|| map_range(10, |i| i + 1));
        assert_eq!(out, (1..=10).collect::<Vec<_>>());
    }
}
