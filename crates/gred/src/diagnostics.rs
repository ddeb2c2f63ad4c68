//! Read-only diagnostics node publishing the module status.
//!
//! The node is the module's only window for operators: reading it renders
//! the current [`ModuleStatus`](crate::ModuleStatus) as JSON. Registration has
//! no failure path, so the controller treats it as an infallible final step.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::warn;

use crate::lock_group::LockGroup;
use crate::state::StatusHandle;
use crate::subsystem::{Subsystem, SubsystemError, SubsystemKind};

const DIAGNOSTICS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::diagnostics");

/// Description attached to the module's diagnostics node.
pub const NODE_DESCRIPTION: &str = "Generic Routing Encapsulation";

/// Access flags declared by a diagnostics node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeFlags {
    /// The node accepts writes from the host (children may be writable).
    pub read_write: bool,
    /// Handlers run under the host's registry lock.
    pub locked: bool,
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self {
            read_write: true,
            locked: true,
        }
    }
}

/// Node exposing module status to the host environment.
#[derive(Debug)]
pub struct DiagnosticsNode {
    name: String,
    description: &'static str,
    flags: NodeFlags,
    status: StatusHandle,
}

impl DiagnosticsNode {
    /// Builds a node called `name` that reads from `status`.
    #[must_use]
    pub fn new(name: impl Into<String>, status: StatusHandle) -> Self {
        Self {
            name: name.into(),
            description: NODE_DESCRIPTION,
            flags: NodeFlags::default(),
            status,
        }
    }

    /// Dotted node name, e.g. `net.gre`.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Human-readable description.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        self.description
    }

    /// Declared access flags.
    #[must_use]
    pub const fn flags(&self) -> NodeFlags {
        self.flags
    }

    /// Renders the current module status as JSON.
    pub fn read(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.status.snapshot())
    }
}

/// Host registry that diagnostics nodes are published into.
pub trait DiagnosticsRegistry: Send {
    /// Publishes `node`.
    fn register(&mut self, node: Arc<DiagnosticsNode>);

    /// Withdraws the node called `name`.
    fn unregister(&mut self, name: &str);
}

impl<T> DiagnosticsRegistry for Box<T>
where
    T: DiagnosticsRegistry + ?Sized,
{
    fn register(&mut self, node: Arc<DiagnosticsNode>) {
        (**self).register(node);
    }

    fn unregister(&mut self, name: &str) {
        (**self).unregister(name);
    }
}

/// In-process registry modelled on a sysctl tree.
#[derive(Debug, Clone, Default)]
pub struct SysctlTree {
    nodes: Arc<RwLock<BTreeMap<String, Arc<DiagnosticsNode>>>>,
}

impl SysctlTree {
    /// Builds an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when a node called `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Reads the node called `name`, if registered.
    #[must_use]
    pub fn read(&self, name: &str) -> Option<Result<String, serde_json::Error>> {
        let node = self
            .nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()?;
        Some(node.read())
    }

    /// Registered node names in lexical order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

impl DiagnosticsRegistry for SysctlTree {
    fn register(&mut self, node: Arc<DiagnosticsNode>) {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        if nodes.contains_key(node.name()) {
            warn!(
                target: DIAGNOSTICS_TARGET,
                node = node.name(),
                "replacing existing diagnostics node"
            );
        }
        nodes.insert(node.name().to_owned(), node);
    }

    fn unregister(&mut self, name: &str) {
        let removed = self
            .nodes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        if removed.is_none() {
            warn!(
                target: DIAGNOSTICS_TARGET,
                node = name,
                "diagnostics node was not registered"
            );
        }
    }
}

/// Adapts a [`DiagnosticsRegistry`] into an infallible acquisition step.
pub struct DiagnosticsStep<R> {
    registry: R,
    node: Arc<DiagnosticsNode>,
}

impl<R> DiagnosticsStep<R> {
    /// Builds a step that publishes `node` into `registry`.
    #[must_use]
    pub fn new(registry: R, node: DiagnosticsNode) -> Self {
        Self {
            registry,
            node: Arc::new(node),
        }
    }

    /// Node published by this step.
    #[must_use]
    pub fn node(&self) -> &DiagnosticsNode {
        &self.node
    }
}

impl<R> Subsystem for DiagnosticsStep<R>
where
    R: DiagnosticsRegistry,
{
    fn kind(&self) -> SubsystemKind {
        SubsystemKind::Diagnostics
    }

    fn acquire(&mut self, _group: &LockGroup) -> Result<(), SubsystemError> {
        self.registry.register(Arc::clone(&self.node));
        Ok(())
    }

    fn release(&mut self) -> Result<(), SubsystemError> {
        self.registry.unregister(self.node.name());
        Ok(())
    }
}
