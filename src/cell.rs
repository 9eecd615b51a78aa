//! Multicast latest-value cell
//!
//! A `LatestCell` holds one current value and notifies every attached
//! observer when the value changes. It replaces a reactive-library
//! multicast subject with an explicit observer registry: attached handlers
//! are keyed by a monotonically increasing id, so iteration order is
//! registration order.
//!
//! The cell carries a one-way stopped flag. Once stopped, `set` is a
//! silent no-op and the stored value is frozen.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

/// Identifier for an attached observer, used to detach it later.
pub type ObserverId = u64;

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct CellState<T> {
    value: T,
    stopped: bool,
    next_id: ObserverId,
    observers: BTreeMap<ObserverId, Handler<T>>,
}

/// A container holding one current value, supporting synchronous read,
/// guarded mutation, and multicast notification on change.
pub struct LatestCell<T> {
    state: Mutex<CellState<T>>,
}

impl<T: Clone> LatestCell<T> {
    /// Create a cell holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            state: Mutex::new(CellState {
                value,
                stopped: false,
                next_id: 0,
                observers: BTreeMap::new(),
            }),
        }
    }

    /// Read the current value.
    pub fn get(&self) -> T {
        self.state.lock().expect("cell lock poisoned").value.clone()
    }

    /// Whether the cell has been stopped.
    pub fn is_stopped(&self) -> bool {
        self.state.lock().expect("cell lock poisoned").stopped
    }

    /// Number of attached observers.
    pub fn observer_count(&self) -> usize {
        self.state.lock().expect("cell lock poisoned").observers.len()
    }

    /// Store a new value and notify every attached observer, in
    /// registration order. Ignored once the cell is stopped.
    pub fn set(&self, value: T) {
        let handlers: Vec<Handler<T>> = {
            let mut state = self.state.lock().expect("cell lock poisoned");
            if state.stopped {
                debug!("set ignored: cell stopped");
                return;
            }
            state.value = value.clone();
            state.observers.values().cloned().collect()
        };

        // Handlers run outside the lock so they may re-enter the cell.
        for handler in handlers {
            handler(&value);
        }
    }

    /// Stop the cell permanently. The current value stays readable;
    /// further `set` calls are ignored and all observers are released.
    pub fn stop(&self) {
        let mut state = self.state.lock().expect("cell lock poisoned");
        state.stopped = true;
        state.observers.clear();
    }

    /// Attach an observer; it receives every subsequent accepted value.
    /// Attaching does not replay the current value.
    pub fn attach(&self, handler: impl Fn(&T) + Send + Sync + 'static) -> ObserverId {
        let mut state = self.state.lock().expect("cell lock poisoned");
        let id = state.next_id;
        state.next_id += 1;
        state.observers.insert(id, Arc::new(handler));
        id
    }

    /// Detach an observer. No-op if the id is unknown or already detached.
    pub fn detach(&self, id: ObserverId) {
        self.state.lock().expect("cell lock poisoned").observers.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_current_value() {
        let cell = LatestCell::new(1);
        assert_eq!(cell.get(), 1);

        cell.set(2);
        assert_eq!(cell.get(), 2);
    }

    #[test]
    fn test_set_notifies_in_registration_order() {
        let cell = LatestCell::new(0);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&seen);
        cell.attach(move |value: &i32| first.lock().unwrap().push(("first", *value)));

        let second = Arc::clone(&seen);
        cell.attach(move |value: &i32| second.lock().unwrap().push(("second", *value)));

        cell.set(7);

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn test_set_after_stop_is_noop() {
        let cell = LatestCell::new(1);
        cell.stop();
        cell.set(2);

        assert_eq!(cell.get(), 1);
        assert!(cell.is_stopped());
    }

    #[test]
    fn test_detach_stops_notifications() {
        let cell = LatestCell::new(0);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let id = cell.attach(move |value: &i32| sink.lock().unwrap().push(*value));

        cell.set(1);
        cell.detach(id);
        cell.set(2);

        assert_eq!(*seen.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_detach_is_idempotent() {
        let cell = LatestCell::new(0);
        let id = cell.attach(|_: &i32| {});

        cell.detach(id);
        cell.detach(id);

        assert_eq!(cell.observer_count(), 0);
    }

    #[test]
    fn test_stop_releases_observers() {
        let cell = LatestCell::new(0);
        cell.attach(|_: &i32| {});
        cell.attach(|_: &i32| {});
        assert_eq!(cell.observer_count(), 2);

        cell.stop();
        assert_eq!(cell.observer_count(), 0);
    }
}
