//! Named lock group shared by every subsystem.
//!
//! The group must exist before anything else starts and is released only
//! after every other subsystem has let go of it. Holding a [`LockGroup`] is
//! what marks the module as loaded.

use std::collections::BTreeSet;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

const LOCK_GROUP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lock_group");

/// Attributes applied when allocating a lock group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockGroupAttributes {
    /// Collect contention statistics for locks in the group.
    pub statistics: bool,
}

#[derive(Debug)]
struct GroupInner {
    name: String,
    attributes: LockGroupAttributes,
    outstanding: AtomicUsize,
}

/// Handle to an allocated lock group.
///
/// Clones share the same group; the allocator frees it when handed back the
/// controller's handle.
#[derive(Debug, Clone)]
pub struct LockGroup {
    inner: Arc<GroupInner>,
}

impl LockGroup {
    fn new(name: &str, attributes: LockGroupAttributes) -> Self {
        Self {
            inner: Arc::new(GroupInner {
                name: name.to_owned(),
                attributes,
                outstanding: AtomicUsize::new(0),
            }),
        }
    }

    /// Group name supplied at allocation.
    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.name.as_str()
    }

    /// Attributes supplied at allocation.
    #[must_use]
    pub fn attributes(&self) -> LockGroupAttributes {
        self.inner.attributes
    }

    /// Allocates a mutex attributed to this group.
    #[must_use]
    pub fn mutex<T>(&self, value: T) -> GroupMutex<T> {
        self.inner.outstanding.fetch_add(1, Ordering::AcqRel);
        GroupMutex {
            mutex: Mutex::new(value),
            group: Arc::clone(&self.inner),
        }
    }

    /// Number of locks allocated from the group that are still alive.
    #[must_use]
    pub fn outstanding_locks(&self) -> usize {
        self.inner.outstanding.load(Ordering::Acquire)
    }
}

/// Mutex allocated from a [`LockGroup`]; dropping it returns it to the group.
#[derive(Debug)]
pub struct GroupMutex<T> {
    mutex: Mutex<T>,
    group: Arc<GroupInner>,
}

impl<T> GroupMutex<T> {
    /// Name of the group the lock belongs to.
    #[must_use]
    pub fn group_name(&self) -> &str {
        self.group.name.as_str()
    }
}

impl<T> Deref for GroupMutex<T> {
    type Target = Mutex<T>;

    fn deref(&self) -> &Self::Target {
        &self.mutex
    }
}

impl<T> Drop for GroupMutex<T> {
    fn drop(&mut self) {
        self.group.outstanding.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Allocates and frees the module lock group.
pub trait LockGroupAllocator: Send {
    /// Allocates a named group, returning `None` when resources are exhausted.
    fn allocate(&self, name: &str, attributes: LockGroupAttributes) -> Option<LockGroup>;

    /// Frees a group previously returned by [`LockGroupAllocator::allocate`].
    fn free(&self, group: LockGroup);
}

/// In-process allocator that tracks live groups and enforces a capacity.
#[derive(Debug, Clone)]
pub struct SystemLockGroupAllocator {
    live: Arc<Mutex<BTreeSet<String>>>,
    capacity: usize,
}

impl SystemLockGroupAllocator {
    /// Upper bound used by [`SystemLockGroupAllocator::new`].
    pub const DEFAULT_CAPACITY: usize = 64;

    /// Builds an allocator with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Builds an allocator that refuses allocations past `capacity` live groups.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            live: Arc::new(Mutex::new(BTreeSet::new())),
            capacity,
        }
    }

    /// Names of the groups currently allocated.
    #[must_use]
    pub fn live_groups(&self) -> Vec<String> {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

impl Default for SystemLockGroupAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl LockGroupAllocator for SystemLockGroupAllocator {
    fn allocate(&self, name: &str, attributes: LockGroupAttributes) -> Option<LockGroup> {
        let mut live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        if live.len() >= self.capacity || live.contains(name) {
            return None;
        }
        live.insert(name.to_owned());
        Some(LockGroup::new(name, attributes))
    }

    fn free(&self, group: LockGroup) {
        let outstanding = group.outstanding_locks();
        if outstanding > 0 {
            warn!(
                target: LOCK_GROUP_TARGET,
                group = group.name(),
                outstanding,
                "freeing lock group with locks still allocated"
            );
        }
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(group.name());
    }
}
