//! Refresh-cycle engine for the polling stream
//!
//! The refresh cycle is an explicit loop in a spawned task, not a chain of
//! composed stream operators, so every suspension point is visible here:
//! parking while below the consumer minimum, the inter-cycle timer, and the
//! producer call itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::cell::LatestCell;

use super::config::StreamConfig;
use super::subscription::StreamSubscription;

/// State shared between the scheduler task and its handles.
pub(super) struct StreamShared<T> {
    /// Latest-value cell: every accepted producer result lands here.
    pub(super) data: LatestCell<T>,
    /// Public result cell: receives change-filtered values; consumer
    /// handlers attach here.
    pub(super) result: LatestCell<T>,
    /// One-shot flag: the next cycle must poll immediately.
    forced: AtomicBool,
    /// Wakes a cycle parked below the consumer minimum or sleeping out
    /// the refresh timer.
    wake: Notify,
}

impl<T: Clone> StreamShared<T> {
    fn new(seed: T) -> Self {
        Self {
            data: LatestCell::new(seed.clone()),
            result: LatestCell::new(seed),
            forced: AtomicBool::new(false),
            wake: Notify::new(),
        }
    }

    /// Request a forced poll at the next scheduling opportunity.
    /// Idempotent; no-op once the stream is stopped.
    pub(super) fn trigger(&self) {
        if self.data.is_stopped() {
            debug!("trigger ignored: stream stopped");
            return;
        }
        self.forced.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    fn take_forced(&self) -> bool {
        self.forced.swap(false, Ordering::SeqCst)
    }
}

/// A lazily polling broadcaster.
///
/// Owns a latest-value cell refreshed by a producer on a schedule, but only
/// while more than [`min_consumers`](super::StreamConfig::with_min_consumers)
/// consumers are attached. Values equal to the previously emitted one (per
/// the change filter) are accepted into the cell but not broadcast. Once a
/// value satisfies the terminal predicate the stream freezes permanently.
///
/// The handle is cloneable; all clones share one scheduler task.
pub struct PollingStream<T> {
    shared: Arc<StreamShared<T>>,
}

impl<T> Clone for PollingStream<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> PollingStream<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Spawn the scheduler task and return a handle to it.
    ///
    /// The task idles until a consumer subscribes; detaching every consumer
    /// suspends polling but does not stop the stream.
    pub fn spawn(config: StreamConfig<T>) -> Self {
        let shared = Arc::new(StreamShared::new(config.seed.clone()));
        tokio::spawn(run_cycles(Arc::clone(&shared), config));
        Self { shared }
    }

    /// Attach `handler` to the stream.
    ///
    /// If the stream is already stopped, `handler` is invoked synchronously
    /// once with the frozen value and `None` is returned. Otherwise the
    /// handler receives every future change-filtered value, and a forced
    /// poll is requested so that attaching is guaranteed to provoke a
    /// refresh opportunity.
    pub fn subscribe(&self, handler: impl Fn(&T) + Send + Sync + 'static) -> Option<StreamSubscription<T>> {
        if self.shared.data.is_stopped() {
            debug!("subscribe after stop: delivering frozen value once");
            handler(&self.shared.data.get());
            return None;
        }

        let id = self.shared.result.attach(handler);
        let subscription = StreamSubscription::new(Arc::clone(&self.shared), id);
        subscription.trigger();
        Some(subscription)
    }

    /// Request a forced poll at the next scheduling opportunity, bypassing
    /// any pending timer delay. No-op once the stream is stopped.
    pub fn trigger(&self) {
        self.shared.trigger();
    }

    /// Read the most recently accepted value.
    pub fn latest(&self) -> T {
        self.shared.data.get()
    }

    /// Whether the stream has reached its terminal state.
    pub fn is_stopped(&self) -> bool {
        self.shared.data.is_stopped()
    }

    /// Number of currently attached consumers.
    pub fn consumer_count(&self) -> usize {
        self.shared.result.observer_count()
    }
}

/// The refresh cycle. Runs until a terminal value is accepted.
async fn run_cycles<T>(shared: Arc<StreamShared<T>>, config: StreamConfig<T>)
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    let StreamConfig {
        producer,
        seed,
        refresh_interval,
        min_consumers,
        is_terminal,
        change_filter,
        on_error,
    } = config;

    let unchanged = change_filter.unwrap_or_else(|| Arc::new(|prev: &T, cur: &T| prev == cur));

    // The first poll emits the seed instead of calling the producer.
    let mut seeded = false;
    // Last value the result cell actually emitted. Starts empty so the
    // seed always reaches the first consumer.
    let mut last_emitted: Option<T> = None;

    loop {
        if shared.data.is_stopped() {
            break;
        }

        if shared.result.observer_count() <= min_consumers {
            debug!(min_consumers, "parked: consumer count at or below minimum");
            shared.wake.notified().await;
            continue;
        }

        if shared.take_forced() {
            debug!("forced poll");
        } else {
            let delay = refresh_interval.resolve();
            debug!(?delay, "waiting out refresh timer");
            tokio::select! {
                _ = sleep(delay) => {}
                // A trigger cancels the pending timer; re-evaluate so the
                // forced flag polls immediately.
                _ = shared.wake.notified() => continue,
            }
            // Consumers may have detached during the wait.
            if shared.result.observer_count() <= min_consumers {
                continue;
            }
        }

        let value = if seeded {
            match producer.produce().await {
                Ok(value) => value,
                Err(err) => {
                    warn!(error = %err, "producer call failed; keeping last value");
                    if let Some(hook) = &on_error {
                        hook(&err);
                    }
                    continue;
                }
            }
        } else {
            seeded = true;
            debug!("initial cycle: emitting seed without producer call");
            seed.clone()
        };

        shared.data.set(value.clone());

        let suppress = match &last_emitted {
            Some(prev) => unchanged(prev, &value),
            None => false,
        };
        if suppress {
            debug!("change filter suppressed notification");
        } else {
            shared.result.set(value.clone());
            last_emitted = Some(value.clone());
        }

        if is_terminal(&value) {
            info!("terminal value accepted; stream stopped");
            shared.data.stop();
            shared.result.stop();
            break;
        }
    }
}
