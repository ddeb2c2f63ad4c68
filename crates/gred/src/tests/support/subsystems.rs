//! Recording subsystems with injectable failures.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::{
    DiagnosticsNode, DiagnosticsRegistry, LifecyclePhase, LockGroup, ModuleSubsystems, Subsystem,
    SubsystemError, SubsystemKind,
};

use super::allocator::RecordingAllocator;
use super::call_log::{Call, CallLog};

/// Failures to inject, keyed by subsystem and phase.
///
/// [`LifecyclePhase::Release`] faults also apply to rollback releases.
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    faults: Arc<Mutex<HashMap<(SubsystemKind, LifecyclePhase), String>>>,
}

impl FaultPlan {
    /// Makes `kind` fail in `phase` until cleared.
    pub fn fail_on(&self, kind: SubsystemKind, phase: LifecyclePhase, message: impl Into<String>) {
        self.faults
            .lock()
            .expect("fault plan mutex poisoned")
            .insert((kind, phase), message.into());
    }

    /// Removes the fault for `kind` in `phase`.
    pub fn heal(&self, kind: SubsystemKind, phase: LifecyclePhase) {
        self.faults
            .lock()
            .expect("fault plan mutex poisoned")
            .remove(&(kind, phase));
    }

    fn check(&self, kind: SubsystemKind, phase: LifecyclePhase) -> Result<(), SubsystemError> {
        let fault = self
            .faults
            .lock()
            .expect("fault plan mutex poisoned")
            .get(&(kind, phase))
            .cloned();
        match fault {
            Some(message) => Err(SubsystemError::new(kind, message)),
            None => Ok(()),
        }
    }
}

/// Subsystem that logs calls and consults a [`FaultPlan`].
pub struct RecordingSubsystem {
    kind: SubsystemKind,
    log: CallLog,
    faults: FaultPlan,
}

impl RecordingSubsystem {
    #[must_use]
    pub fn new(kind: SubsystemKind, log: CallLog, faults: FaultPlan) -> Self {
        Self { kind, log, faults }
    }
}

impl Subsystem for RecordingSubsystem {
    fn kind(&self) -> SubsystemKind {
        self.kind
    }

    fn acquire(&mut self, _group: &LockGroup) -> Result<(), SubsystemError> {
        self.log.record(Call::Acquire(self.kind));
        self.faults.check(self.kind, LifecyclePhase::Acquire)
    }

    fn release(&mut self) -> Result<(), SubsystemError> {
        self.log.record(Call::Release(self.kind));
        self.faults.check(self.kind, LifecyclePhase::Release)
    }
}

/// Diagnostics registry that logs registrations as diagnostics calls.
#[derive(Clone, Default)]
pub struct RecordingRegistry {
    log: CallLog,
    nodes: Arc<Mutex<Vec<Arc<DiagnosticsNode>>>>,
}

impl RecordingRegistry {
    #[must_use]
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            nodes: Arc::default(),
        }
    }

    /// Nodes currently registered.
    #[must_use]
    pub fn nodes(&self) -> Vec<Arc<DiagnosticsNode>> {
        self.nodes.lock().expect("registry mutex poisoned").clone()
    }
}

impl DiagnosticsRegistry for RecordingRegistry {
    fn register(&mut self, node: Arc<DiagnosticsNode>) {
        self.log.record(Call::Acquire(SubsystemKind::Diagnostics));
        self.nodes.lock().expect("registry mutex poisoned").push(node);
    }

    fn unregister(&mut self, name: &str) {
        self.log.record(Call::Release(SubsystemKind::Diagnostics));
        self.nodes
            .lock()
            .expect("registry mutex poisoned")
            .retain(|node| node.name() != name);
    }
}

/// Builds a full set of recording doubles sharing one log and fault plan.
#[derive(Clone, Default)]
pub struct RecordingHost {
    pub log: CallLog,
    pub faults: FaultPlan,
    pub registry: RecordingRegistry,
}

impl RecordingHost {
    #[must_use]
    pub fn new() -> Self {
        let log = CallLog::default();
        Self {
            registry: RecordingRegistry::new(log.clone()),
            log,
            faults: FaultPlan::default(),
        }
    }

    #[must_use]
    pub fn allocator(&self) -> RecordingAllocator {
        RecordingAllocator::new(self.log.clone())
    }

    #[must_use]
    pub fn subsystems(&self) -> ModuleSubsystems {
        ModuleSubsystems {
            protocol: self.leaf(SubsystemKind::Protocol),
            tunnel_table: self.leaf(SubsystemKind::TunnelTable),
            interfaces: self.leaf(SubsystemKind::Interfaces),
            packet_filter: self.leaf(SubsystemKind::PacketFilter),
            diagnostics: Box::new(self.registry.clone()),
        }
    }

    fn leaf(&self, kind: SubsystemKind) -> Box<dyn Subsystem> {
        Box::new(RecordingSubsystem::new(
            kind,
            self.log.clone(),
            self.faults.clone(),
        ))
    }
}
