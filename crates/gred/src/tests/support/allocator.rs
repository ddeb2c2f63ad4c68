//! Lock group allocator double.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::{
    LockGroup, LockGroupAllocator, LockGroupAttributes, SubsystemKind, SystemLockGroupAllocator,
};

use super::call_log::{Call, CallLog};

/// Allocator that logs calls and can be told to run out of groups.
#[derive(Debug, Clone)]
pub struct RecordingAllocator {
    log: CallLog,
    inner: SystemLockGroupAllocator,
    exhausted: Arc<AtomicBool>,
    frees: Arc<AtomicUsize>,
}

impl RecordingAllocator {
    #[must_use]
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            inner: SystemLockGroupAllocator::new(),
            exhausted: Arc::new(AtomicBool::new(false)),
            frees: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Makes every later allocation fail.
    pub fn exhaust(&self) {
        self.exhausted.store(true, Ordering::SeqCst);
    }

    /// Number of groups still allocated.
    #[must_use]
    pub fn live(&self) -> usize {
        self.inner.live_groups().len()
    }

    /// Number of frees observed.
    #[must_use]
    pub fn frees(&self) -> usize {
        self.frees.load(Ordering::SeqCst)
    }
}

impl LockGroupAllocator for RecordingAllocator {
    fn allocate(&self, name: &str, attributes: LockGroupAttributes) -> Option<LockGroup> {
        self.log.record(Call::Acquire(SubsystemKind::LockGroup));
        if self.exhausted.load(Ordering::SeqCst) {
            return None;
        }
        self.inner.allocate(name, attributes)
    }

    fn free(&self, group: LockGroup) {
        self.log.record(Call::Release(SubsystemKind::LockGroup));
        self.frees.fetch_add(1, Ordering::SeqCst);
        self.inner.free(group);
    }
}
