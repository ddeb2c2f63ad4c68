use std::sync::{Arc, Mutex, PoisonError};

use crate::lock_group::LockGroup;
use crate::subsystem::{Subsystem, SubsystemError, SubsystemKind};

use super::HostError;

/// Ordered chain of installed IP filters.
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    filters: Arc<Mutex<Vec<String>>>,
}

impl FilterChain {
    /// Builds an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `name` to the chain.
    pub fn install(&self, name: &str) -> Result<(), HostError> {
        let mut filters = self.filters.lock().unwrap_or_else(PoisonError::into_inner);
        if filters.iter().any(|installed| installed == name) {
            return Err(HostError::FilterInstalled {
                name: name.to_owned(),
            });
        }
        filters.push(name.to_owned());
        Ok(())
    }

    /// Removes `name` from the chain.
    pub fn remove(&self, name: &str) -> Result<(), HostError> {
        let mut filters = self.filters.lock().unwrap_or_else(PoisonError::into_inner);
        let position = filters
            .iter()
            .position(|installed| installed == name)
            .ok_or_else(|| HostError::FilterMissing {
                name: name.to_owned(),
            })?;
        filters.remove(position);
        Ok(())
    }

    /// Installed filter names in chain order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.filters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Installs the module's packet filter hook.
#[derive(Debug)]
pub struct PacketFilterHook {
    chain: FilterChain,
    name: String,
}

impl PacketFilterHook {
    /// Builds a hook called `name` on `chain`.
    #[must_use]
    pub fn new(chain: FilterChain, name: impl Into<String>) -> Self {
        Self {
            chain,
            name: name.into(),
        }
    }
}

impl Subsystem for PacketFilterHook {
    fn kind(&self) -> SubsystemKind {
        SubsystemKind::PacketFilter
    }

    fn acquire(&mut self, _group: &LockGroup) -> Result<(), SubsystemError> {
        self.chain.install(&self.name).map_err(|source| {
            SubsystemError::with_source(
                SubsystemKind::PacketFilter,
                "cannot install packet filter",
                source,
            )
        })
    }

    fn release(&mut self) -> Result<(), SubsystemError> {
        self.chain.remove(&self.name).map_err(|source| {
            SubsystemError::with_source(
                SubsystemKind::PacketFilter,
                "cannot remove packet filter",
                source,
            )
        })
    }
}
