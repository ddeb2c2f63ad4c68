use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::{Arc, PoisonError, RwLock};

use crate::lock_group::{GroupMutex, LockGroup};
use crate::subsystem::{Subsystem, SubsystemError, SubsystemKind};

use super::HostError;

/// Outer addresses identifying a tunnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TunnelEndpoints {
    /// Local outer address.
    pub local: Ipv4Addr,
    /// Remote outer address.
    pub remote: Ipv4Addr,
}

type Entries = BTreeMap<TunnelEndpoints, u32>;
type Slot = Arc<RwLock<Option<Arc<GroupMutex<Entries>>>>>;

/// Lookup table from tunnel endpoints to interface unit.
///
/// The table lock is allocated from the module's lock group on acquire and
/// dropped on release.
#[derive(Debug, Default)]
pub struct TunnelTable {
    slot: Slot,
}

/// Shared view of a [`TunnelTable`] usable while it is initialised.
#[derive(Debug, Clone)]
pub struct TunnelTableHandle {
    slot: Slot,
}

impl TunnelTable {
    /// Builds an uninitialised table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle observing this table.
    #[must_use]
    pub fn handle(&self) -> TunnelTableHandle {
        TunnelTableHandle {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl Subsystem for TunnelTable {
    fn kind(&self) -> SubsystemKind {
        SubsystemKind::TunnelTable
    }

    fn acquire(&mut self, group: &LockGroup) -> Result<(), SubsystemError> {
        let table = Arc::new(group.mutex(Entries::new()));
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(table);
        Ok(())
    }

    fn release(&mut self) -> Result<(), SubsystemError> {
        self.slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }
}

impl TunnelTableHandle {
    fn with_entries<R>(&self, apply: impl FnOnce(&mut Entries) -> R) -> Result<R, HostError> {
        let table = self
            .slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(HostError::TableDown)?;
        let mut entries = table.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(apply(&mut entries))
    }

    /// Returns `true` while the table is initialised.
    #[must_use]
    pub fn is_up(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Maps `endpoints` to `unit`, returning the previous unit.
    pub fn insert(&self, endpoints: TunnelEndpoints, unit: u32) -> Result<Option<u32>, HostError> {
        self.with_entries(|entries| entries.insert(endpoints, unit))
    }

    /// Unit mapped to `endpoints`.
    pub fn lookup(&self, endpoints: TunnelEndpoints) -> Result<Option<u32>, HostError> {
        self.with_entries(|entries| entries.get(&endpoints).copied())
    }

    /// Removes the mapping for `endpoints`.
    pub fn remove(&self, endpoints: TunnelEndpoints) -> Result<Option<u32>, HostError> {
        self.with_entries(|entries| entries.remove(&endpoints))
    }

    /// Number of mapped tunnels.
    pub fn len(&self) -> Result<usize, HostError> {
        self.with_entries(|entries| entries.len())
    }

    /// Returns `true` when no tunnel is mapped.
    pub fn is_empty(&self) -> Result<bool, HostError> {
        self.with_entries(|entries| entries.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::lock_group::{LockGroupAllocator, LockGroupAttributes, SystemLockGroupAllocator};

    #[rstest]
    fn table_lock_comes_from_the_group_and_goes_on_release() {
        let group = SystemLockGroupAllocator::new()
            .allocate("test locks", LockGroupAttributes::default())
            .expect("allocation succeeds");
        let mut table = TunnelTable::new();
        let handle = table.handle();
        let endpoints = TunnelEndpoints {
            local: Ipv4Addr::new(192, 0, 2, 1),
            remote: Ipv4Addr::new(198, 51, 100, 7),
        };

        assert_eq!(handle.lookup(endpoints), Err(HostError::TableDown));

        table.acquire(&group).expect("table initialises");
        assert_eq!(group.outstanding_locks(), 1);
        handle.insert(endpoints, 3).expect("table is up");
        assert_eq!(handle.lookup(endpoints), Ok(Some(3)));
        assert_eq!(handle.len(), Ok(1));

        table.release().expect("release is infallible");
        assert_eq!(group.outstanding_locks(), 0);
        assert!(!handle.is_up());
    }
}
