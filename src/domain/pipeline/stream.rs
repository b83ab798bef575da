use std::fmt::Display;

use futures::future;
use futures::stream::{BoxStream, Stream, StreamExt, TryStreamExt};
use tracing::warn;

use super::Pipeline;
use crate::domain::DomainError;

/// Streaming counterpart of [`Pipeline`]
///
/// The first `Err` item is delivered and ends the sequence.
#[must_use = "streams do nothing unless polled"]
pub struct PipelineStream<T> {
    inner: BoxStream<'static, Result<T, DomainError>>,
}

impl<T: Send + 'static> PipelineStream<T> {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<T, DomainError>> + Send + 'static,
    {
        let inner = stream
            .scan(false, |failed, item| {
                if *failed {
                    return future::ready(None);
                }
                *failed = item.is_err();
                future::ready(Some(item))
            })
            .boxed();

        Self { inner }
    }

    pub fn transform<U, F>(self, mut f: F) -> PipelineStream<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> U + Send + 'static,
    {
        PipelineStream {
            inner: self.inner.map_ok(move |item| f(item)).boxed(),
        }
    }

    /// Run a side effect once per fragment; failures are logged and ignored
    pub fn on_each<F, E>(self, hook: &'static str, mut f: F) -> Self
    where
        F: FnMut(&T) -> Result<(), E> + Send + 'static,
        E: Display,
    {
        Self {
            inner: self
                .inner
                .inspect_ok(move |item| {
                    if let Err(e) = f(item) {
                        warn!(hook, error = %e, "Stream hook failed");
                    }
                })
                .boxed(),
        }
    }

    /// Gather every fragment, failing on the first error
    pub fn collect(self) -> Pipeline<Vec<T>> {
        Pipeline::new(self.inner.try_collect::<Vec<T>>())
    }

    pub fn into_stream(self) -> BoxStream<'static, Result<T, DomainError>> {
        self.inner
    }
}

impl<T> std::fmt::Debug for PipelineStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PipelineStream(..)")
    }
}
