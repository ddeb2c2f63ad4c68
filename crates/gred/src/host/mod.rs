//! In-process stand-ins for the host networking stack.
//!
//! Each leaf honours the [`Subsystem`](crate::Subsystem) contract against a
//! shared registry owned by [`HostStack`]. The registries expose just enough
//! surface for callers to drive the failure paths a real host produces:
//! protocol slots already claimed, interfaces still attached and filters that
//! vanished underneath the module.

mod interfaces;
mod ip_filter;
mod protocol;
mod tunnel_table;

use thiserror::Error;

use gre_config::Config;

use crate::controller::ModuleSubsystems;
use crate::diagnostics::SysctlTree;

pub use interfaces::{InterfaceManager, InterfaceManagerHandle, InterfaceRegistry};
pub use ip_filter::{FilterChain, PacketFilterHook};
pub use protocol::{GreProtocol, ProtocolTable};
pub use tunnel_table::{TunnelEndpoints, TunnelTable, TunnelTableHandle};

/// Interface family and filter name registered by the module.
pub const GRE_NAME: &str = "gre";

/// Failures reported by the in-process host registries.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HostError {
    /// The IP protocol slot is owned by someone else.
    #[error("IP protocol {number} is already registered by '{owner}'")]
    ProtocolTaken {
        /// Protocol number requested.
        number: u8,
        /// Current owner of the slot.
        owner: String,
    },
    /// The interface family is already registered.
    #[error("interface family '{family}' is already registered")]
    FamilyTaken {
        /// Family requested.
        family: String,
    },
    /// Virtual interfaces are still attached to the family.
    #[error("{count} interface(s) still attached")]
    InterfacesAttached {
        /// Number of interfaces attached.
        count: usize,
    },
    /// The interface family is not registered.
    #[error("interface family '{family}' is not registered")]
    FamilyDown {
        /// Family the caller tried to use.
        family: String,
    },
    /// A filter with the same name is already installed.
    #[error("packet filter '{name}' is already installed")]
    FilterInstalled {
        /// Filter name.
        name: String,
    },
    /// The filter disappeared before the module removed it.
    #[error("packet filter '{name}' is not installed")]
    FilterMissing {
        /// Filter name.
        name: String,
    },
    /// The tunnel table has not been initialised.
    #[error("tunnel table is not initialised")]
    TableDown,
}

/// Shared registries modelling the host the module plugs into.
#[derive(Debug, Clone, Default)]
pub struct HostStack {
    protocols: ProtocolTable,
    interfaces: InterfaceRegistry,
    filters: FilterChain,
    sysctl: SysctlTree,
}

/// Leaves built for one module instance plus handles onto their live state.
pub struct HostLeaves {
    /// Subsystems handed to the controller.
    pub subsystems: ModuleSubsystems,
    /// Lookup surface of the tunnel table.
    pub tunnels: TunnelTableHandle,
    /// Attach surface of the interface manager.
    pub interfaces: InterfaceManagerHandle,
}

impl HostStack {
    /// Builds a host with empty registries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// IP protocol switch table.
    #[must_use]
    pub fn protocols(&self) -> &ProtocolTable {
        &self.protocols
    }

    /// Interface family registry.
    #[must_use]
    pub fn interfaces(&self) -> &InterfaceRegistry {
        &self.interfaces
    }

    /// IP filter chain.
    #[must_use]
    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }

    /// Diagnostics tree.
    #[must_use]
    pub fn sysctl(&self) -> &SysctlTree {
        &self.sysctl
    }

    /// Builds the module's leaves against this host.
    #[must_use]
    pub fn leaves(&self, config: &Config) -> HostLeaves {
        let tunnel_table = TunnelTable::new();
        let tunnels = tunnel_table.handle();
        let interface_manager = InterfaceManager::new(self.interfaces.clone(), GRE_NAME);
        let interfaces = interface_manager.handle();

        let subsystems = ModuleSubsystems {
            protocol: Box::new(GreProtocol::new(
                self.protocols.clone(),
                config.protocol_number(),
            )),
            tunnel_table: Box::new(tunnel_table),
            interfaces: Box::new(interface_manager),
            packet_filter: Box::new(PacketFilterHook::new(self.filters.clone(), GRE_NAME)),
            diagnostics: Box::new(self.sysctl.clone()),
        };

        HostLeaves {
            subsystems,
            tunnels,
            interfaces,
        }
    }
}
