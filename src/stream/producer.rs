//! Producer seam for the polling scheduler

use std::future::Future;

use async_trait::async_trait;
use eyre::Result;

/// Asynchronous source of candidate values for a polling stream.
///
/// Implementations must eventually settle and must be safe to call
/// repeatedly on a timer. The scheduler never retries a failed call;
/// callers needing timeouts build them into the implementation.
#[async_trait]
pub trait Producer: Send + Sync {
    type Output: Send;

    /// Produce the next candidate value.
    async fn produce(&self) -> Result<Self::Output>;
}

/// [`Producer`] adapter over a plain async closure.
pub struct ProducerFn<F> {
    f: F,
}

/// Wrap an async closure as a [`Producer`].
pub fn producer_fn<F, Fut, T>(f: F) -> ProducerFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<T>> + Send,
    T: Send,
{
    ProducerFn { f }
}

#[async_trait]
impl<F, Fut, T> Producer for ProducerFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<T>> + Send,
    T: Send,
{
    type Output = T;

    async fn produce(&self) -> Result<T> {
        (self.f)().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_producer_fn_adapts_closure() {
        let producer = producer_fn(|| async { Ok::<u32, eyre::Report>(42) });

        let value = producer.produce().await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_producer_fn_propagates_errors() {
        let producer = producer_fn(|| async { Err::<u32, _>(eyre::eyre!("boom")) });

        let result = producer.produce().await;
        assert!(result.is_err());
    }
}
