use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

/// Bounded in-process queue for export runs. At most `max_concurrency`
/// queued futures make progress at once; the rest wait for a permit.
#[derive(Debug, Clone)]
pub struct InProcessQueue {
    semaphore: Arc<Semaphore>,
}

impl InProcessQueue {
    pub fn new(max_concurrency: usize) -> Self {
        let permits = max_concurrency.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn spawn<F>(&self, label: String, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        tokio::spawn(async move {
            tracing::debug!(job = %label, "waiting for queue slot");
            let Ok(_permit) = semaphore.acquire_owned().await else {
                tracing::error!(job = %label, "export queue closed; dropping job");
                return;
            };
            tracing::debug!(job = %label, "queue slot acquired");
            fut.await;
        });
    }
}
