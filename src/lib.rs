//! FreshCell - demand-driven value freshness primitives
//!
//! Two independently usable asynchronous-coordination primitives sharing
//! one design philosophy: do work only when someone is watching, and never
//! do the same work twice at once.
//!
//! # Core Concepts
//!
//! - **Lazy polling**: a [`PollingStream`] refreshes its value on a timer,
//!   but only while enough consumers are attached; it never polls into the
//!   void.
//! - **Change filtering**: consumers are notified once per materially new
//!   value, never for repeats.
//! - **Terminal freeze**: once a value satisfies the terminal predicate,
//!   the stream stops permanently and late subscribers get the frozen
//!   value delivered immediately.
//! - **Coalescing**: a [`Coalescer`] shares one in-flight producer call
//!   across every concurrent caller with an equivalent key, optionally
//!   backed by an expiring result cache.
//!
//! # Modules
//!
//! - [`cell`] - multicast latest-value cell
//! - [`stream`] - polling stream scheduler
//! - [`coalesce`] - coalescing request cache

pub mod cell;
pub mod coalesce;
pub mod stream;

// Re-export commonly used types
pub use cell::{LatestCell, ObserverId};
pub use coalesce::{CoalesceError, Coalescer, ResultCache, TtlCache};
pub use stream::{
    PollingStream, Producer, ProducerFn, RefreshInterval, StreamConfig, StreamSubscription, producer_fn,
};
