use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};

use crate::lock_group::{GroupMutex, LockGroup};
use crate::subsystem::{Subsystem, SubsystemError, SubsystemKind};

use super::HostError;

/// Host registry of interface families and their attached units.
#[derive(Debug, Clone, Default)]
pub struct InterfaceRegistry {
    families: Arc<Mutex<BTreeMap<String, BTreeSet<u32>>>>,
}

impl InterfaceRegistry {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `family` with no attached units.
    pub fn register(&self, family: &str) -> Result<(), HostError> {
        let mut families = self.families.lock().unwrap_or_else(PoisonError::into_inner);
        if families.contains_key(family) {
            return Err(HostError::FamilyTaken {
                family: family.to_owned(),
            });
        }
        families.insert(family.to_owned(), BTreeSet::new());
        Ok(())
    }

    /// Removes `family`, refusing while units are still attached.
    pub fn unregister(&self, family: &str) -> Result<(), HostError> {
        let mut families = self.families.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(count) = families.get(family).map(BTreeSet::len) else {
            return Ok(());
        };
        if count > 0 {
            return Err(HostError::InterfacesAttached { count });
        }
        families.remove(family);
        Ok(())
    }

    /// Returns `true` when `family` is registered.
    #[must_use]
    pub fn is_registered(&self, family: &str) -> bool {
        self.families
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(family)
    }

    fn attach(&self, family: &str, unit: u32) -> Result<bool, HostError> {
        let mut families = self.families.lock().unwrap_or_else(PoisonError::into_inner);
        let units = families.get_mut(family).ok_or_else(|| HostError::FamilyDown {
            family: family.to_owned(),
        })?;
        Ok(units.insert(unit))
    }

    fn detach(&self, family: &str, unit: u32) -> bool {
        self.families
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(family)
            .is_some_and(|units| units.remove(&unit))
    }

    fn attached(&self, family: &str) -> Vec<u32> {
        self.families
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(family)
            .map(|units| units.iter().copied().collect())
            .unwrap_or_default()
    }
}

/// Registers the GRE interface family and refuses to go away while tunnels
/// are attached.
#[derive(Debug)]
pub struct InterfaceManager {
    registry: InterfaceRegistry,
    family: String,
    lock: Option<GroupMutex<()>>,
}

/// Attach surface for virtual interfaces of one family.
#[derive(Debug, Clone)]
pub struct InterfaceManagerHandle {
    registry: InterfaceRegistry,
    family: String,
}

impl InterfaceManager {
    /// Builds a manager for `family` in `registry`.
    #[must_use]
    pub fn new(registry: InterfaceRegistry, family: impl Into<String>) -> Self {
        Self {
            registry,
            family: family.into(),
            lock: None,
        }
    }

    /// Handle attaching units to this manager's family.
    #[must_use]
    pub fn handle(&self) -> InterfaceManagerHandle {
        InterfaceManagerHandle {
            registry: self.registry.clone(),
            family: self.family.clone(),
        }
    }
}

impl Subsystem for InterfaceManager {
    fn kind(&self) -> SubsystemKind {
        SubsystemKind::Interfaces
    }

    fn acquire(&mut self, group: &LockGroup) -> Result<(), SubsystemError> {
        self.registry.register(&self.family).map_err(|source| {
            SubsystemError::with_source(
                SubsystemKind::Interfaces,
                format!("cannot register interface family '{}'", self.family),
                source,
            )
        })?;
        self.lock = Some(group.mutex(()));
        Ok(())
    }

    fn release(&mut self) -> Result<(), SubsystemError> {
        self.registry.unregister(&self.family).map_err(|source| {
            SubsystemError::with_source(
                SubsystemKind::Interfaces,
                format!("cannot dispose interface family '{}'", self.family),
                source,
            )
        })?;
        self.lock = None;
        Ok(())
    }
}

impl InterfaceManagerHandle {
    /// Attaches `unit`. Returns `false` when it was already attached.
    pub fn attach(&self, unit: u32) -> Result<bool, HostError> {
        self.registry.attach(&self.family, unit)
    }

    /// Detaches `unit`. Returns `false` when it was not attached.
    pub fn detach(&self, unit: u32) -> bool {
        self.registry.detach(&self.family, unit)
    }

    /// Attached units in ascending order.
    #[must_use]
    pub fn attached(&self) -> Vec<u32> {
        self.registry.attached(&self.family)
    }
}
