//! Entry points invoked by the host when loading and unloading the module.

use tracing::error;

use crate::controller::ModuleController;
use crate::lock_group::LockGroupAllocator;

const ENTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::entry");

/// Status returned to the host loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernReturn {
    /// The request completed.
    Success,
    /// The request failed; the host refuses the load or unload.
    Failure,
}

impl KernReturn {
    /// Returns `true` for [`KernReturn::Success`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Host start hook.
pub fn module_start<A>(controller: &mut ModuleController<A>) -> KernReturn
where
    A: LockGroupAllocator,
{
    match controller.activate() {
        Ok(_) => KernReturn::Success,
        Err(error) => {
            error!(target: ENTRY_TARGET, error = %error, "module start failed");
            KernReturn::Failure
        }
    }
}

/// Host stop hook.
pub fn module_stop<A>(controller: &mut ModuleController<A>) -> KernReturn
where
    A: LockGroupAllocator,
{
    match controller.deactivate() {
        Ok(_) => KernReturn::Success,
        Err(error) => {
            error!(target: ENTRY_TARGET, error = %error, "module stop failed");
            KernReturn::Failure
        }
    }
}
