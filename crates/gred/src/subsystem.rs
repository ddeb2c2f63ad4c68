//! Capability contract shared by every subsystem the controller sequences.
//!
//! The controller never looks inside a subsystem. It only asks each one to
//! acquire its resources against the module lock group and, later, to release
//! them again. Everything else (tunnel state, interface drivers, packet
//! inspection) stays behind this trait.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::lock_group::LockGroup;

/// Subsystems brought up by the lifecycle controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubsystemKind {
    /// Process-wide lock group every other subsystem allocates from.
    LockGroup,
    /// Protocol registration with the host networking stack.
    Protocol,
    /// Tunnel identifier lookup table.
    TunnelTable,
    /// Virtual network interface manager.
    Interfaces,
    /// IP packet filter hook.
    PacketFilter,
    /// Read-only diagnostics node.
    Diagnostics,
}

impl SubsystemKind {
    /// Acquisition order used by activation. Deactivation walks it backwards.
    pub const ACTIVATION_ORDER: [Self; 6] = [
        Self::LockGroup,
        Self::Protocol,
        Self::TunnelTable,
        Self::Interfaces,
        Self::PacketFilter,
        Self::Diagnostics,
    ];

    /// Short stable label used in logs and diagnostics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::LockGroup => "group",
            Self::Protocol => "protocol",
            Self::TunnelTable => "table",
            Self::Interfaces => "interfaces",
            Self::PacketFilter => "filter",
            Self::Diagnostics => "diagnostics",
        }
    }
}

impl fmt::Display for SubsystemKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

impl Serialize for SubsystemKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Error returned when parsing a subsystem kind fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown subsystem: {0}")]
pub struct SubsystemKindParseError(String);

impl SubsystemKindParseError {
    /// Creates a parse error describing the unsupported value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the offending value that could not be parsed.
    #[must_use]
    pub fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for SubsystemKind {
    type Err = SubsystemKindParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "group" | "lock_group" => Ok(Self::LockGroup),
            "protocol" => Ok(Self::Protocol),
            "table" | "tunnel_table" => Ok(Self::TunnelTable),
            "interfaces" => Ok(Self::Interfaces),
            "filter" | "packet_filter" => Ok(Self::PacketFilter),
            "diagnostics" => Ok(Self::Diagnostics),
            other => Err(SubsystemKindParseError::new(other)),
        }
    }
}

/// Failure reported by a subsystem while acquiring or releasing.
#[derive(Debug, Error)]
#[error("{kind} subsystem: {message}")]
pub struct SubsystemError {
    /// Subsystem that failed.
    pub kind: SubsystemKind,
    message: String,
    /// Optional source error reported by the subsystem implementation.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SubsystemError {
    /// Builds an error without an underlying source.
    #[must_use]
    pub fn new(kind: SubsystemKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Builds an error that wraps an underlying source.
    #[must_use]
    pub fn with_source(
        kind: SubsystemKind,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Human-readable message describing the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// A lifecycle-managed resource.
///
/// `acquire` and `release` are blocking and are never called concurrently
/// for the same subsystem. The controller calls `release` only after a
/// successful `acquire`, and calls `release` again on a later deactivation if
/// the previous release failed.
pub trait Subsystem: Send {
    /// Which subsystem this is.
    fn kind(&self) -> SubsystemKind;

    /// Acquires the subsystem's resources, allocating locks from `group`.
    fn acquire(&mut self, group: &LockGroup) -> Result<(), SubsystemError>;

    /// Releases everything acquired by [`Subsystem::acquire`].
    fn release(&mut self) -> Result<(), SubsystemError>;
}

impl<T> Subsystem for Box<T>
where
    T: Subsystem + ?Sized,
{
    fn kind(&self) -> SubsystemKind {
        (**self).kind()
    }

    fn acquire(&mut self, group: &LockGroup) -> Result<(), SubsystemError> {
        (**self).acquire(group)
    }

    fn release(&mut self) -> Result<(), SubsystemError> {
        (**self).release()
    }
}
