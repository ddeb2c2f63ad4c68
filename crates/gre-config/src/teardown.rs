use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Strategy applied when a subsystem fails to release during deactivation.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TeardownPolicy {
    /// Stop at the first failing release and leave the rest held.
    FailFast,
    /// Attempt every release and report all failures together.
    #[default]
    Exhaustive,
}

impl TeardownPolicy {
    /// Returns `true` when teardown halts on the first failure.
    #[must_use]
    pub const fn stops_on_failure(self) -> bool {
        matches!(self, Self::FailFast)
    }
}
