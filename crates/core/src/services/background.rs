//! Detached work that must not block or fail the request that started it.

use std::future::Future;
use std::sync::Arc;

use keyward_common::{AppError, AppResult};
use tokio::task::JoinHandle;

/// Receives failures of background tasks.
pub trait TaskFailureReporter: Send + Sync {
    /// Called once per failed task.
    fn report(&self, task: &str, error: &AppError);
}

/// Reports failures through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFailureReporter;

impl TaskFailureReporter for TracingFailureReporter {
    fn report(&self, task: &str, error: &AppError) {
        tracing::error!(task = %task, error = %error, "Background task failed");
    }
}

/// Spawns fire-and-forget tasks on the current runtime.
#[derive(Clone)]
pub struct BackgroundTasks {
    reporter: Arc<dyn TaskFailureReporter>,
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new(Arc::new(TracingFailureReporter))
    }
}

impl BackgroundTasks {
    /// Create a spawner reporting failures to `reporter`.
    #[must_use]
    pub fn new(reporter: Arc<dyn TaskFailureReporter>) -> Self {
        Self { reporter }
    }

    /// Run `task` detached. Errors go to the reporter, never to the caller.
    ///
    /// The handle is only useful to tests; production callers drop it.
    pub fn spawn<F>(&self, name: &'static str, task: F) -> JoinHandle<()>
    where
        F: Future<Output = AppResult<()>> + Send + 'static,
    {
        let reporter = Arc::clone(&self.reporter);
        tokio::spawn(async move {
            if let Err(e) = task.await {
                reporter.report(name, &e);
            }
        })
    }
}
