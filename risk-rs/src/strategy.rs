//! How the per-draw integrations of a bootstrap batch are executed.

use std::num::NonZeroUsize;

use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

/// Number of parallel execution units the host reports, at least 1.
pub fn worker_count() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Maps independent tasks to results.
///
/// Results come back in submission order whatever order the tasks finish in.
/// The first failing task fails the whole batch.
pub trait EvaluationStrategy {
    fn map<T, R, F>(&self, tasks: Vec<T>, f: F) -> Result<Vec<R>>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> Result<R> + Sync + Send;

    fn workers(&self) -> usize;
}

/// Runs tasks one after another on the calling thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sequential;

impl EvaluationStrategy for Sequential {
    fn map<T, R, F>(&self, tasks: Vec<T>, f: F) -> Result<Vec<R>>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> Result<R> + Sync + Send,
    {
        tasks.into_iter().map(f).collect()
    }

    fn workers(&self) -> usize {
        1
    }
}

/// Runs tasks on a fixed-size thread pool; the caller blocks until all finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pooled {
    workers: usize,
}

impl Pooled {
    pub fn new(workers: usize) -> Self {
        Pooled {
            workers: workers.max(1),
        }
    }

    /// A pool sized to [`worker_count`].
    pub fn available() -> Self {
        Pooled::new(worker_count())
    }
}

impl Default for Pooled {
    fn default() -> Self {
        Pooled::available()
    }
}

impl EvaluationStrategy for Pooled {
    fn map<T, R, F>(&self, tasks: Vec<T>, f: F) -> Result<Vec<R>>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> Result<R> + Sync + Send,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| RiskError::WorkerPool(e.to_string()))?;
        debug!("dispatching {} tasks to {} workers", tasks.len(), self.workers);
        // indexed collect keeps submission order
        pool.install(|| tasks.into_par_iter().map(f).collect())
    }

    fn workers(&self) -> usize {
        self.workers
    }
}

/// Strategy selected from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Pooled {
        /// Defaults to [`worker_count`].
        #[serde(default)]
        workers: Option<usize>,
    },
}

impl EvaluationStrategy for ExecutionMode {
    fn map<T, R, F>(&self, tasks: Vec<T>, f: F) -> Result<Vec<R>>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> Result<R> + Sync + Send,
    {
        match self {
            ExecutionMode::Sequential => Sequential.map(tasks, f),
            ExecutionMode::Pooled { workers } => {
                Pooled::new(workers.unwrap_or_else(worker_count)).map(tasks, f)
            }
        }
    }

    fn workers(&self) -> usize {
        match self {
            ExecutionMode::Sequential => 1,
            ExecutionMode::Pooled { workers } => workers.unwrap_or_else(worker_count).max(1),
        }
    }
}
