//! Coalescing request cache
//!
//! A [`Coalescer`] wraps an asynchronous producer so that concurrent calls
//! with an equivalent key share one in-flight execution, and settled
//! successes may be served from a pluggable [`ResultCache`] until they
//! expire. The in-flight entry is registered before the first suspension
//! point, which closes the race window between two near-simultaneous calls
//! for the same key.

mod cache;
mod error;

pub use cache::{ResultCache, TtlCache};
pub use error::CoalesceError;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::Serialize;
use tracing::debug;

type SharedOutcome<R> = Shared<BoxFuture<'static, Result<R, Arc<eyre::Report>>>>;
type RequestFn<A, R> = Arc<dyn Fn(A) -> BoxFuture<'static, eyre::Result<R>> + Send + Sync>;
type KeyFn<A> = Arc<dyn Fn(&A) -> Result<String, CoalesceError> + Send + Sync>;

/// Deduplicating wrapper around an asynchronous producer.
///
/// For a given key, at most one producer invocation is outstanding at any
/// instant; callers arriving while one is outstanding receive the same
/// eventual outcome, success or failure. A failure never populates the
/// result cache and never poisons the key; the next call after settlement
/// starts a fresh invocation.
///
/// A caller-supplied key function that conflates distinct argument sets
/// will cause incorrect result sharing; collisions are not detected.
pub struct Coalescer<A, R> {
    request: RequestFn<A, R>,
    key_fn: KeyFn<A>,
    cache: Option<Arc<dyn ResultCache<R>>>,
    in_flight: Arc<Mutex<HashMap<String, SharedOutcome<R>>>>,
}

impl<A, R> Coalescer<A, R>
where
    A: Send + 'static,
    R: Clone + Send + Sync + 'static,
{
    /// Wrap `producer`, deriving request keys by structurally serializing
    /// the argument value. Distinct values with equal structure share a
    /// key by design.
    pub fn new<F, Fut>(producer: F) -> Self
    where
        A: Serialize,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = eyre::Result<R>> + Send + 'static,
    {
        Self::keyed(producer, |args: &A| {
            serde_json::to_string(args).map_err(|err| CoalesceError::Key(Arc::new(err)))
        })
    }

    /// Wrap `producer` with a caller-supplied key derivation.
    pub fn keyed<F, Fut, K>(producer: F, key_fn: K) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = eyre::Result<R>> + Send + 'static,
        K: Fn(&A) -> Result<String, CoalesceError> + Send + Sync + 'static,
    {
        Self {
            request: Arc::new(move |args| producer(args).boxed()),
            key_fn: Arc::new(key_fn),
            cache: None,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Serve settled successes from `cache` until its expiry policy drops
    /// them. Written only on success.
    pub fn with_cache(mut self, cache: Arc<dyn ResultCache<R>>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Call the wrapped producer, sharing any in-flight execution for the
    /// same key and consulting the result cache first.
    pub async fn call(&self, args: A) -> Result<R, CoalesceError> {
        let key = (self.key_fn)(&args)?;

        if let Some(cache) = &self.cache {
            // Presence check, not a truthiness check: falsy values are hits.
            if let Some(hit) = cache.get_if_present(&key) {
                debug!(%key, "result cache hit");
                return Ok(hit);
            }
        }

        let outcome = {
            let mut in_flight = self.in_flight.lock().expect("in-flight table poisoned");
            match in_flight.get(&key) {
                Some(existing) => {
                    debug!(%key, "joining in-flight request");
                    existing.clone()
                }
                None => {
                    debug!(%key, "starting producer call");
                    let fut = (self.request)(args);
                    let table = Arc::downgrade(&self.in_flight);
                    let cache = self.cache.clone();
                    let flight_key = key.clone();
                    // Settlement cleanup lives inside the shared future, so
                    // whichever caller drives it to completion removes the
                    // entry exactly once. The caller that started the flight
                    // may have been cancelled before settlement.
                    let shared = async move {
                        let settled = fut.await.map_err(Arc::new);
                        if let Some(table) = table.upgrade() {
                            table
                                .lock()
                                .expect("in-flight table poisoned")
                                .remove(&flight_key);
                        }
                        if let (Ok(value), Some(cache)) = (&settled, &cache) {
                            cache.set(&flight_key, value.clone());
                        }
                        settled
                    }
                    .boxed()
                    .shared();
                    // Registered before the first await: a concurrent call
                    // for this key must observe it.
                    in_flight.insert(key.clone(), shared.clone());
                    shared
                }
            }
        };

        outcome.await.map_err(CoalesceError::Producer)
    }
}
