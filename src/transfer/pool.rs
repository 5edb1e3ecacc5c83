use crate::error::ItemError;
use crate::structs::ImportResult;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};
use tracing::{info, warn};

/// Shared, append-only accumulator of per-item outcomes for one run.
#[derive(Debug, Clone, Default)]
pub struct ResultCollector(Arc<Mutex<ImportResult>>);

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut ImportResult) -> T) -> T {
        let mut guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn success(&self, name: &str) {
        info!(file = name, "Imported");
        self.with(|result| result.files_imported += 1);
    }

    pub fn failure(&self, error: ItemError) {
        warn!(file = error.file(), error = %error, "Not imported");
        self.with(|result| {
            result.files_not_imported.push(error.file().to_string());
            result.errors.push(error);
        });
    }

    pub fn record(&self, name: &str, outcome: Result<(), ItemError>) {
        match outcome {
            Ok(()) => self.success(name),
            Err(error) => self.failure(error),
        }
    }

    /// Takes the accumulated result, leaving an empty one behind.
    pub fn finish(&self) -> ImportResult {
        self.with(std::mem::take)
    }
}

/// A bounded set of transfer tasks with a single join point.
///
/// At most `workers` jobs run at once; the rest wait for a permit. Every job's outcome, including
/// a panic, ends up in the collector.
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    tasks: JoinSet<Result<(), ItemError>>,
    names: HashMap<Id, String>,
    collector: ResultCollector,
}

impl WorkerPool {
    pub fn new(workers: usize, collector: ResultCollector) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(workers.max(1))),
            tasks: JoinSet::new(),
            names: HashMap::new(),
            collector,
        }
    }

    pub fn collector(&self) -> &ResultCollector {
        &self.collector
    }

    /// Queues one item. `name` is what gets recorded if the job ends abnormally.
    pub fn spawn<F>(&mut self, name: impl Into<String>, job: F)
    where
        F: Future<Output = Result<(), ItemError>> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let handle = self.tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            job.await
        });
        self.names.insert(handle.id(), name.into());
    }

    /// Waits for every queued job and records its outcome.
    pub async fn join(mut self) {
        while let Some(joined) = self.tasks.join_next_with_id().await {
            let (id, outcome) = match joined {
                Ok((id, outcome)) => (id, outcome),
                Err(err) => {
                    let id = err.id();
                    let file = self.names.get(&id).cloned().unwrap_or_default();
                    (
                        id,
                        Err(ItemError::Aborted {
                            file,
                            reason: err.to_string(),
                        }),
                    )
                }
            };
            let name = self.names.remove(&id).unwrap_or_default();
            self.collector.record(&name, outcome);
        }
    }
}
