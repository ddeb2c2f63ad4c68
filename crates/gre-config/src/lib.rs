//! Shared configuration for the GRE module host.
//!
//! Values are layered by [`ortho_config`]: built-in defaults, then an optional
//! configuration file, then `GRE_*` environment variables, then command-line
//! flags. The resolved [`Config`] tells the lifecycle controller which lock
//! group to allocate, where diagnostics are published, which protocol number
//! to register, and how to behave when teardown fails.

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod defaults;
mod logging;
mod teardown;

pub use defaults::{
    DEFAULT_DIAGNOSTICS_NODE, DEFAULT_LOCK_GROUP_NAME, DEFAULT_LOG_FILTER,
    DEFAULT_PROTOCOL_NUMBER, default_diagnostics_node, default_lock_group_name,
    default_log_filter_string, default_log_format, default_protocol_number,
    default_teardown_policy,
};
pub use logging::LogFormat;
pub use teardown::TeardownPolicy;

/// Resolved configuration for the module host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "GRE")]
pub struct Config {
    /// Name of the lock group every subsystem allocates its locks from.
    #[serde(default = "default_lock_group_name")]
    #[ortho_config(default = default_lock_group_name())]
    pub lock_group_name: String,
    /// Name of the read-only diagnostics node.
    #[serde(default = "default_diagnostics_node")]
    #[ortho_config(default = default_diagnostics_node())]
    pub diagnostics_node: String,
    /// IP protocol number registered with the host networking stack.
    #[serde(default = "default_protocol_number")]
    #[ortho_config(default = default_protocol_number())]
    pub protocol_number: u8,
    /// Behaviour when a subsystem fails to release during deactivation.
    #[serde(default = "default_teardown_policy")]
    #[ortho_config(default = default_teardown_policy())]
    pub teardown_policy: TeardownPolicy,
    /// `tracing` filter directive applied by the subscriber.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format used by the subscriber.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lock_group_name: default_lock_group_name(),
            diagnostics_node: default_diagnostics_node(),
            protocol_number: default_protocol_number(),
            teardown_policy: default_teardown_policy(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

/// Errors raised when a loaded configuration cannot drive the module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The lock group name was empty.
    #[error("lock group name must not be empty")]
    EmptyLockGroupName,
    /// The diagnostics node name was empty.
    #[error("diagnostics node name must not be empty")]
    EmptyDiagnosticsNode,
    /// Protocol number zero is reserved.
    #[error("protocol number {0} is reserved")]
    ReservedProtocol(u8),
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        Self::load_from_iter(std::env::args_os())
    }

    /// Loads configuration from an explicit argument list.
    ///
    /// The first item is treated as the binary name, matching
    /// [`std::env::args_os`].
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args).map_err(Into::into)
    }

    /// Checks invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lock_group_name.trim().is_empty() {
            return Err(ConfigError::EmptyLockGroupName);
        }
        if self.diagnostics_node.trim().is_empty() {
            return Err(ConfigError::EmptyDiagnosticsNode);
        }
        if self.protocol_number == 0 {
            return Err(ConfigError::ReservedProtocol(self.protocol_number));
        }
        Ok(())
    }

    /// Lock group name passed to the allocator.
    #[must_use]
    pub fn lock_group_name(&self) -> &str {
        self.lock_group_name.as_str()
    }

    /// Diagnostics node name.
    #[must_use]
    pub fn diagnostics_node(&self) -> &str {
        self.diagnostics_node.as_str()
    }

    /// Protocol number registered by the protocol subsystem.
    #[must_use]
    pub const fn protocol_number(&self) -> u8 {
        self.protocol_number
    }

    /// Teardown policy applied on deactivation.
    #[must_use]
    pub const fn teardown_policy(&self) -> TeardownPolicy {
        self.teardown_policy
    }

    /// Log filter directive.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
