//! Foreground runner: start the module, wait for a signal, stop it.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::info;

use crate::bootstrap::{BootstrapError, ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::entry::{module_start, module_stop};
use crate::health::{LifecycleReporter, StructuredLifecycleReporter};
use crate::host::HostStack;

const RUN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::run");

/// Abstraction over shutdown notification mechanisms.
pub trait ShutdownSignal: Send + Sync {
    /// Starts listening. Notifications arriving after this returns are held
    /// for [`ShutdownSignal::wait`].
    fn install(&self) -> Result<(), ShutdownError> {
        Ok(())
    }

    /// Blocks until shutdown should proceed.
    fn wait(&self) -> Result<(), ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Shutdown listener that waits for a termination signal.
#[derive(Default)]
pub struct SystemShutdownSignal {
    signals: Mutex<Option<Signals>>,
}

impl SystemShutdownSignal {
    /// Builds a listener with no handlers installed yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn termination_signals() -> Result<Signals, ShutdownError> {
    Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
        .map_err(|source| ShutdownError::Install { source })
}

impl ShutdownSignal for SystemShutdownSignal {
    fn install(&self) -> Result<(), ShutdownError> {
        let mut slot = self.signals.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(termination_signals()?);
        }
        Ok(())
    }

    fn wait(&self) -> Result<(), ShutdownError> {
        let installed = self
            .signals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let mut signals = match installed {
            Some(signals) => signals,
            None => termination_signals()?,
        };
        if let Some(signal) = signals.forever().next() {
            info!(target: RUN_TARGET, signal, "shutdown signal received");
        }
        Ok(())
    }
}

/// Errors surfaced by [`run_module`].
#[derive(Debug, Error)]
pub enum RunError {
    /// The module could not be built.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// Waiting for shutdown failed. The module has been stopped.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
    /// The start hook refused to load the module.
    #[error("module start was refused")]
    StartRefused,
    /// The stop hook refused to unload the module.
    #[error("module stop was refused; resources are still held")]
    StopRefused,
}

/// Runs the module with the production collaborators.
pub fn run_module() -> Result<(), RunError> {
    run_module_with(
        &SystemConfigLoader,
        Arc::new(StructuredLifecycleReporter::new()),
        &SystemShutdownSignal::new(),
    )
}

/// Runs the module with injected collaborators.
pub fn run_module_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn LifecycleReporter>,
    shutdown: &dyn ShutdownSignal,
) -> Result<(), RunError> {
    let mut module = bootstrap_with(loader, reporter, HostStack::new())?;
    info!(
        target: RUN_TARGET,
        lock_group = module.config().lock_group_name(),
        teardown_policy = %module.config().teardown_policy(),
        "starting module"
    );

    shutdown.install()?;

    if !module_start(module.controller_mut()).is_success() {
        return Err(RunError::StartRefused);
    }

    let waited = shutdown.wait();
    if !module_stop(module.controller_mut()).is_success() {
        return Err(RunError::StopRefused);
    }
    waited?;

    info!(target: RUN_TARGET, "module stopped");
    Ok(())
}
