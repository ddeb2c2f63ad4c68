use crate::logging::LogFormat;
use crate::teardown::TeardownPolicy;

/// Lock group name allocated before any subsystem starts.
pub const DEFAULT_LOCK_GROUP_NAME: &str = "GRE locks";

/// Diagnostics node exposing read-only module status.
pub const DEFAULT_DIAGNOSTICS_NODE: &str = "net.gre";

/// IP protocol number assigned to Generic Routing Encapsulation.
pub const DEFAULT_PROTOCOL_NUMBER: u8 = 47;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Owned lock group name used where allocation is required (e.g. serde).
pub fn default_lock_group_name() -> String {
    DEFAULT_LOCK_GROUP_NAME.to_owned()
}

/// Owned diagnostics node name used where allocation is required.
pub fn default_diagnostics_node() -> String {
    DEFAULT_DIAGNOSTICS_NODE.to_owned()
}

/// Protocol number registered with the host networking stack.
pub const fn default_protocol_number() -> u8 {
    DEFAULT_PROTOCOL_NUMBER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default teardown policy applied on deactivation.
pub const fn default_teardown_policy() -> TeardownPolicy {
    TeardownPolicy::Exhaustive
}
