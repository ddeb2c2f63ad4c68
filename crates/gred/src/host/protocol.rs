use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::lock_group::LockGroup;
use crate::subsystem::{Subsystem, SubsystemError, SubsystemKind};

use super::{GRE_NAME, HostError};

/// IP protocol switch table keyed by protocol number.
#[derive(Debug, Clone, Default)]
pub struct ProtocolTable {
    slots: Arc<Mutex<BTreeMap<u8, String>>>,
}

impl ProtocolTable {
    /// Builds an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `number` for `owner`.
    pub fn register(&self, number: u8, owner: &str) -> Result<(), HostError> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = slots.get(&number) {
            return Err(HostError::ProtocolTaken {
                number,
                owner: current.clone(),
            });
        }
        slots.insert(number, owner.to_owned());
        Ok(())
    }

    /// Frees `number`. Returns the previous owner.
    pub fn unregister(&self, number: u8) -> Option<String> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&number)
    }

    /// Current owner of `number`.
    #[must_use]
    pub fn owner(&self, number: u8) -> Option<String> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&number)
            .cloned()
    }
}

/// Registers the GRE protocol handler.
#[derive(Debug)]
pub struct GreProtocol {
    table: ProtocolTable,
    number: u8,
}

impl GreProtocol {
    /// Builds a registrar claiming `number` in `table`.
    #[must_use]
    pub fn new(table: ProtocolTable, number: u8) -> Self {
        Self { table, number }
    }
}

impl Subsystem for GreProtocol {
    fn kind(&self) -> SubsystemKind {
        SubsystemKind::Protocol
    }

    fn acquire(&mut self, _group: &LockGroup) -> Result<(), SubsystemError> {
        self.table
            .register(self.number, GRE_NAME)
            .map_err(|source| {
                SubsystemError::with_source(
                    SubsystemKind::Protocol,
                    format!("cannot register IP protocol {}", self.number),
                    source,
                )
            })
    }

    fn release(&mut self) -> Result<(), SubsystemError> {
        self.table.unregister(self.number);
        Ok(())
    }
}
