//! Shared, ordered log of every call made into the test doubles.

use std::sync::{Arc, Mutex};

use crate::SubsystemKind;

/// One call observed by a double.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    /// Allocation or acquisition, [`SubsystemKind::LockGroup`] for the group.
    Acquire(SubsystemKind),
    /// Free or release, [`SubsystemKind::LockGroup`] for the group.
    Release(SubsystemKind),
}

/// Log shared by every double in one test.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl CallLog {
    pub fn record(&self, call: Call) {
        self.calls.lock().expect("call log mutex poisoned").push(call);
    }

    /// Every call in the order it happened.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("call log mutex poisoned").clone()
    }

    /// Kinds acquired, in order.
    #[must_use]
    pub fn acquired(&self) -> Vec<SubsystemKind> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Acquire(kind) => Some(kind),
                Call::Release(_) => None,
            })
            .collect()
    }

    /// Kinds released, in order.
    #[must_use]
    pub fn released(&self) -> Vec<SubsystemKind> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Release(kind) => Some(kind),
                Call::Acquire(_) => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().expect("call log mutex poisoned").clear();
    }
}
