use std::fmt::Display;
use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::warn;

use super::Diagnostics;
use crate::domain::DomainError;

type Step<T> = BoxFuture<'static, (Result<T, DomainError>, Diagnostics)>;

/// Deferred computation of one value
///
/// Stages run in the order they were added, and only once the pipeline is
/// awaited through [`Pipeline::get`]. After a stage fails no later stage
/// runs; the error reaches `get` unchanged.
#[must_use = "a pipeline does nothing until `get` is awaited"]
pub struct Pipeline<T> {
    step: Step<T>,
}

impl<T: Send + 'static> Pipeline<T> {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, DomainError>> + Send + 'static,
    {
        Self {
            step: async move { (future.await, Diagnostics::default()) }.boxed(),
        }
    }

    pub fn ready(value: T) -> Self {
        Self::new(async move { Ok(value) })
    }

    pub fn failed(error: DomainError) -> Self {
        Self::new(async move { Err(error) })
    }

    fn chain<U, F, Fut>(self, next: F) -> Pipeline<U>
    where
        U: Send + 'static,
        F: FnOnce(T, Diagnostics) -> Fut + Send + 'static,
        Fut: Future<Output = (Result<U, DomainError>, Diagnostics)> + Send + 'static,
    {
        let step = self.step;
        Pipeline {
            step: async move {
                match step.await {
                    (Ok(value), diagnostics) => next(value, diagnostics).await,
                    (Err(error), diagnostics) => (Err(error), diagnostics),
                }
            }
            .boxed(),
        }
    }

    pub fn transform<U, F>(self, f: F) -> Pipeline<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.chain(move |value, diagnostics| async move { (Ok(f(value)), diagnostics) })
    }

    pub fn try_transform<U, F>(self, f: F) -> Pipeline<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Result<U, DomainError> + Send + 'static,
    {
        self.chain(move |value, diagnostics| async move { (f(value), diagnostics) })
    }

    pub fn transform_async<U, F, Fut>(self, f: F) -> Pipeline<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Fut + Send + 'static,
        Fut: Future<Output = Result<U, DomainError>> + Send + 'static,
    {
        self.chain(move |value, diagnostics| async move { (f(value).await, diagnostics) })
    }

    /// Run a side effect on the value; its failure is logged and ignored
    pub fn on_each<F, E>(self, hook: &'static str, f: F) -> Self
    where
        F: FnOnce(&T) -> Result<(), E> + Send + 'static,
        E: Display,
    {
        self.chain(move |value, diagnostics| async move {
            if let Err(e) = f(&value) {
                warn!(hook, error = %e, "Pipeline hook failed");
            }
            (Ok(value), diagnostics)
        })
    }

    /// Like [`Pipeline::on_each`], but keeps the failure for [`Pipeline::get_with_diagnostics`]
    pub fn on_each_reported<F, E>(self, hook: &'static str, f: F) -> Self
    where
        F: FnOnce(&T) -> Result<(), E> + Send + 'static,
        E: Display,
    {
        self.chain(move |value, mut diagnostics| async move {
            if let Err(e) = f(&value) {
                warn!(hook, error = %e, "Pipeline hook failed");
                diagnostics.record(hook, e.to_string());
            }
            (Ok(value), diagnostics)
        })
    }

    pub async fn get(self) -> Result<T, DomainError> {
        self.step.await.0
    }

    pub async fn get_with_diagnostics(self) -> (Result<T, DomainError>, Diagnostics) {
        self.step.await
    }

    /// Drive the pipeline to completion on a private current-thread runtime
    ///
    /// Must not be called from within an async context.
    pub fn blocking_get(self) -> Result<T, DomainError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DomainError::internal(format!("Failed to start runtime: {}", e)))?;

        runtime.block_on(self.get())
    }
}

impl<T> std::fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Pipeline(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_transforms_run_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let (first, second) = (order.clone(), order.clone());

        let value = Pipeline::ready(2)
            .transform(move |v| {
                first.lock().unwrap().push("double");
                v * 2
            })
            .transform_async(move |v| async move {
                second.lock().unwrap().push("add");
                Ok(v + 1)
            })
            .get()
            .await
            .unwrap();

        assert_eq!(value, 5);
        assert_eq!(*order.lock().unwrap(), vec!["double", "add"]);
    }

    #[tokio::test]
    async fn test_error_short_circuits() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = Pipeline::<u32>::failed(DomainError::fatal("embedding", "HTTP 401"))
            .transform(move |v| {
                counter.fetch_add(1, Ordering::SeqCst);
                v + 1
            })
            .get()
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        match result {
            Err(DomainError::FatalEndpoint { endpoint, message }) => {
                assert_eq!(endpoint, "embedding");
                assert_eq!(message, "HTTP 401");
            }
            other => panic!("Expected the original error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_try_transform_failure_stops_chain() {
        let result = Pipeline::ready("x")
            .try_transform(|_| Err::<u32, _>(DomainError::template("bad")))
            .transform(|v| v * 10)
            .get()
            .await;

        assert!(matches!(result, Err(DomainError::TemplateCompilation { .. })));
    }

    #[tokio::test]
    async fn test_nothing_runs_before_get() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let pipeline = Pipeline::ready(1).transform(move |v| {
            counter.fetch_add(1, Ordering::SeqCst);
            v
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        pipeline.get().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hook_failure_is_swallowed() {
        let value = Pipeline::ready(7)
            .on_each("audit", |_| Err::<(), _>("disk full"))
            .transform(|v| v + 1)
            .get()
            .await
            .unwrap();

        assert_eq!(value, 8);
    }

    #[tokio::test]
    async fn test_hook_failure_is_reported() {
        let (result, diagnostics) = Pipeline::ready(7)
            .on_each_reported("audit", |_| Err::<(), _>("disk full"))
            .on_each_reported("metrics", |_| Ok::<(), String>(()))
            .get_with_diagnostics()
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.failures()[0].hook, "audit");
        assert_eq!(diagnostics.failures()[0].message, "disk full");
    }

    #[test]
    fn test_blocking_get() {
        let value = Pipeline::new(async { Ok("done".to_string()) })
            .transform(|s| s.len())
            .blocking_get()
            .unwrap();

        assert_eq!(value, 4);
    }
}
