//! Polling stream configuration

use std::sync::Arc;
use std::time::Duration;

use eyre::Report;

use super::producer::Producer;

/// Delay before the next producer call when idly refreshing.
#[derive(Clone)]
pub enum RefreshInterval {
    /// Same delay every cycle.
    Fixed(Duration),
    /// Resolved once per cycle, e.g. a caller-supplied backoff schedule.
    Dynamic(Arc<dyn Fn() -> Duration + Send + Sync>),
}

impl RefreshInterval {
    pub(super) fn resolve(&self) -> Duration {
        match self {
            RefreshInterval::Fixed(delay) => *delay,
            RefreshInterval::Dynamic(f) => f(),
        }
    }
}

impl Default for RefreshInterval {
    fn default() -> Self {
        RefreshInterval::Fixed(Duration::from_secs(5))
    }
}

/// Configuration for [`PollingStream::spawn`](super::PollingStream::spawn).
///
/// Only the producer and the seed are required; everything else has the
/// defaults described on the builder methods.
pub struct StreamConfig<T> {
    /// Source of candidate values.
    pub(super) producer: Arc<dyn Producer<Output = T>>,
    /// Initial value, emitted to the first consumer without a producer call.
    pub(super) seed: T,
    /// Delay between idle refresh cycles (default 5 s).
    pub(super) refresh_interval: RefreshInterval,
    /// Producer calls are suspended while the attached-consumer count is at
    /// or below this value (default 0).
    pub(super) min_consumers: usize,
    /// Once true for an accepted value, the stream stops permanently.
    pub(super) is_terminal: Arc<dyn Fn(&T) -> bool + Send + Sync>,
    /// Returns true when `current` counts as unchanged relative to
    /// `previous` and should be suppressed. Default: `PartialEq` equality.
    pub(super) change_filter: Option<Arc<dyn Fn(&T, &T) -> bool + Send + Sync>>,
    /// Invoked with each producer failure; the stream keeps scheduling.
    pub(super) on_error: Option<Arc<dyn Fn(&Report) + Send + Sync>>,
}

impl<T> StreamConfig<T> {
    /// Create a configuration with the given producer and seed value.
    pub fn new(producer: impl Producer<Output = T> + 'static, seed: T) -> Self {
        Self {
            producer: Arc::new(producer),
            seed,
            refresh_interval: RefreshInterval::default(),
            min_consumers: 0,
            is_terminal: Arc::new(|_| false),
            change_filter: None,
            on_error: None,
        }
    }

    /// Fixed delay between idle refresh cycles.
    pub fn with_refresh_interval(mut self, delay: Duration) -> Self {
        self.refresh_interval = RefreshInterval::Fixed(delay);
        self
    }

    /// Delay resolved once per cycle (e.g. exponential backoff).
    pub fn with_dynamic_refresh_interval(mut self, f: impl Fn() -> Duration + Send + Sync + 'static) -> Self {
        self.refresh_interval = RefreshInterval::Dynamic(Arc::new(f));
        self
    }

    /// Suspend producer calls while the consumer count is at or below `min`.
    pub fn with_min_consumers(mut self, min: usize) -> Self {
        self.min_consumers = min;
        self
    }

    /// Stop the stream permanently once `f` holds for an accepted value.
    pub fn with_terminal(mut self, f: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.is_terminal = Arc::new(f);
        self
    }

    /// Treat `current` as unchanged (and suppress notification) when `f`
    /// returns true for `(previous, current)`.
    pub fn with_change_filter(mut self, f: impl Fn(&T, &T) -> bool + Send + Sync + 'static) -> Self {
        self.change_filter = Some(Arc::new(f));
        self
    }

    /// Observe producer failures. Failures are never retried and never stop
    /// the stream; this hook is the only way callers see them.
    pub fn with_on_error(mut self, f: impl Fn(&Report) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }
}
