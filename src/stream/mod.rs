//! Lazy polling broadcaster
//!
//! A [`PollingStream`] keeps a consumer-facing value fresh without wasteful
//! work: it re-invokes its producer on a timer, but only while more than a
//! configurable minimum of consumers is attached; it suppresses non-changes
//! before notifying; and it freezes permanently once a terminal value is
//! accepted. An out-of-band [`trigger`](PollingStream::trigger) forces the
//! next poll immediately, bypassing the timer.

mod config;
mod producer;
mod scheduler;
mod subscription;

pub use config::{RefreshInterval, StreamConfig};
pub use producer::{Producer, ProducerFn, producer_fn};
pub use scheduler::PollingStream;
pub use subscription::StreamSubscription;
