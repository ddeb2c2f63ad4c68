//! Test doubles for the module controller suites.

mod allocator;
mod call_log;
mod config_loader;
mod reporter;
mod subsystems;
mod world;

pub use allocator::RecordingAllocator;
pub use call_log::Call;
pub use config_loader::{ArgumentConfigLoader, failing_config_loader, test_config_loader};
pub use reporter::{LifecycleEvent, RecordingLifecycleReporter};
pub use subsystems::RecordingHost;
pub use world::{TestWorld, Transition, world};
