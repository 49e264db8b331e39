// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Graph guard condition.
//!
//! Wakes threads waiting for graph changes. The trigger is a level, not a
//! counter: several triggers before a waiter consumes it collapse into a
//! single wakeup.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Global counter for unique guard condition IDs
static GUARD_ID_COUNTER: AtomicU64 = AtomicU64::new(2_000_000);

/// Sink for "the graph changed" notifications.
///
/// Listeners only need this; an externally owned guard can implement it.
pub trait GraphSignal: Send + Sync {
    fn signal(&self);
}

/// Trigger-and-consume condition shared by all discovery listeners.
pub struct GraphGuardCondition {
    id: u64,
    triggered: Mutex<bool>,
    cond: Condvar,
    triggers: AtomicU64,
}

impl GraphGuardCondition {
    pub fn new() -> Self {
        Self {
            id: GUARD_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
            triggered: Mutex::new(false),
            cond: Condvar::new(),
            triggers: AtomicU64::new(0),
        }
    }

    /// Process-unique identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Set the trigger value; `true` wakes every waiter.
    pub fn set_trigger_value(&self, value: bool) {
        let mut triggered = self.triggered.lock();
        *triggered = value;
        if value {
            self.triggers.fetch_add(1, Ordering::Relaxed);
            self.cond.notify_all();
        }
    }

    pub fn get_trigger_value(&self) -> bool {
        *self.triggered.lock()
    }

    /// Consume the trigger, returning its previous value.
    pub fn take_trigger(&self) -> bool {
        std::mem::replace(&mut *self.triggered.lock(), false)
    }

    /// Block until triggered or until `timeout` elapses (`None` waits forever).
    ///
    /// Consumes the trigger and returns whether it fired.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        let mut triggered = self.triggered.lock();
        match timeout {
            None => {
                while !*triggered {
                    self.cond.wait(&mut triggered);
                }
            }
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                while !*triggered {
                    if self.cond.wait_until(&mut triggered, deadline).timed_out() {
                        break;
                    }
                }
            }
        }
        std::mem::replace(&mut *triggered, false)
    }

    /// Number of `set_trigger_value(true)` calls so far.
    pub fn trigger_count(&self) -> u64 {
        self.triggers.load(Ordering::Relaxed)
    }
}

impl Default for GraphGuardCondition {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphSignal for GraphGuardCondition {
    fn signal(&self) {
        self.set_trigger_value(true);
    }
}

impl std::fmt::Debug for GraphGuardCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphGuardCondition")
            .field("id", &self.id)
            .field("triggered", &self.get_trigger_value())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_unique_ids() {
        let a = GraphGuardCondition::new();
        let b = GraphGuardCondition::new();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_triggers_collapse() {
        let guard = GraphGuardCondition::new();
        assert!(!guard.get_trigger_value());

        guard.signal();
        guard.signal();
        guard.signal();
        assert_eq!(guard.trigger_count(), 3);

        assert!(guard.take_trigger());
        assert!(!guard.take_trigger());
    }

    #[test]
    fn test_wait_times_out_when_idle() {
        let guard = GraphGuardCondition::new();
        assert!(!guard.wait(Some(Duration::from_millis(10))));
    }

    #[test]
    fn test_wait_consumes_pending_trigger() {
        let guard = GraphGuardCondition::new();
        guard.set_trigger_value(true);
        assert!(guard.wait(Some(Duration::ZERO)));
        assert!(!guard.get_trigger_value());
    }

    #[test]
    fn test_wait_woken_from_other_thread() {
        let guard = Arc::new(GraphGuardCondition::new());
        let signaller = Arc::clone(&guard);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            signaller.signal();
        });

        assert!(guard.wait(Some(Duration::from_secs(5))));
        handle.join().expect("signaller thread");
    }
}
