//! Consumer subscription handle

use std::sync::Arc;

use crate::cell::ObserverId;

use super::scheduler::StreamShared;

/// One consumer's attachment to a [`PollingStream`](super::PollingStream).
///
/// Detaching is explicit; dropping the handle leaves the consumer attached.
pub struct StreamSubscription<T> {
    shared: Arc<StreamShared<T>>,
    id: ObserverId,
}

impl<T: Clone> StreamSubscription<T> {
    pub(super) fn new(shared: Arc<StreamShared<T>>, id: ObserverId) -> Self {
        Self { shared, id }
    }

    /// Detach this consumer. Idempotent. Detaching does not stop the
    /// stream; the consumer-count gate alone decides whether polling
    /// continues.
    pub fn detach(&self) {
        self.shared.result.detach(self.id);
    }

    /// Request a forced poll at the next scheduling opportunity, bypassing
    /// any pending timer delay. No-op once the stream is stopped.
    pub fn trigger(&self) {
        self.shared.trigger();
    }
}
