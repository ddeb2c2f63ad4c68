//! Ordered acquisition with reverse-order release.
//!
//! An [`AcquisitionStack`] holds the subsystems in the order they must come
//! up. Acquisition walks forwards and, when a step fails, releases every step
//! it already acquired in reverse before reporting the failure. Release walks
//! backwards under a [`TeardownPolicy`]. Each step carries a held flag, so a
//! failed release leaves exactly the steps that still own resources.

use gre_config::TeardownPolicy;

use crate::health::{LifecyclePhase, LifecycleReporter};
use crate::lock_group::LockGroup;
use crate::subsystem::{Subsystem, SubsystemError, SubsystemKind};

struct Step {
    subsystem: Box<dyn Subsystem>,
    held: bool,
}

/// Acquisition failed and the stack was rolled back.
#[derive(Debug)]
pub struct AcquireFailure {
    /// Error that stopped acquisition.
    pub error: SubsystemError,
    /// Errors reported by releases during rollback.
    pub rollback_failures: Vec<SubsystemError>,
}

/// One or more releases failed; the failing steps are still held.
#[derive(Debug)]
pub struct ReleaseFailure {
    /// First failure in teardown order.
    pub first: SubsystemError,
    /// Later failures, present only under exhaustive teardown.
    pub further: Vec<SubsystemError>,
}

/// Ordered list of subsystems acquired front to back, released back to front.
#[derive(Default)]
pub struct AcquisitionStack {
    steps: Vec<Step>,
}

impl AcquisitionStack {
    /// Builds an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a subsystem after every step already present.
    pub fn push(&mut self, subsystem: Box<dyn Subsystem>) {
        self.steps.push(Step {
            subsystem,
            held: false,
        });
    }

    /// Subsystems in acquisition order, held or not.
    #[must_use]
    pub fn kinds(&self) -> Vec<SubsystemKind> {
        self.steps.iter().map(|step| step.subsystem.kind()).collect()
    }

    /// Subsystems currently held, in acquisition order.
    #[must_use]
    pub fn held(&self) -> Vec<SubsystemKind> {
        self.steps
            .iter()
            .filter(|step| step.held)
            .map(|step| step.subsystem.kind())
            .collect()
    }

    /// Returns `true` when no step is held.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.steps.iter().all(|step| !step.held)
    }

    /// Acquires every step that is not already held, in order.
    ///
    /// On failure every held step is released in reverse order. Rollback
    /// releases are all attempted; their failures are reported and returned
    /// but never stop the unwind, and every step ends up unheld.
    pub fn acquire_all(
        &mut self,
        group: &LockGroup,
        reporter: &dyn LifecycleReporter,
    ) -> Result<(), AcquireFailure> {
        let mut failure = None;
        for step in self.steps.iter_mut().filter(|step| !step.held) {
            match step.subsystem.acquire(group) {
                Ok(()) => {
                    step.held = true;
                    reporter.subsystem_acquired(step.subsystem.kind());
                }
                Err(error) => {
                    reporter.subsystem_failed(LifecyclePhase::Acquire, &error);
                    failure = Some(error);
                    break;
                }
            }
        }

        match failure {
            None => Ok(()),
            Some(error) => Err(AcquireFailure {
                error,
                rollback_failures: self.rollback(reporter),
            }),
        }
    }

    /// Releases held steps in reverse order.
    ///
    /// Under [`TeardownPolicy::FailFast`] the walk stops at the first failure
    /// and every step before it stays held. Under
    /// [`TeardownPolicy::Exhaustive`] every held step is attempted. Either
    /// way a step whose release failed stays held, so calling this again
    /// retries only what is left.
    pub fn release_all(
        &mut self,
        policy: TeardownPolicy,
        reporter: &dyn LifecycleReporter,
    ) -> Result<(), ReleaseFailure> {
        let mut failures = Vec::new();
        for step in self.steps.iter_mut().rev().filter(|step| step.held) {
            match step.subsystem.release() {
                Ok(()) => {
                    step.held = false;
                    reporter.subsystem_released(step.subsystem.kind());
                }
                Err(error) => {
                    reporter.subsystem_failed(LifecyclePhase::Release, &error);
                    failures.push(error);
                    if policy.stops_on_failure() {
                        break;
                    }
                }
            }
        }

        let mut failures = failures.into_iter();
        match failures.next() {
            None => Ok(()),
            Some(first) => Err(ReleaseFailure {
                first,
                further: failures.collect(),
            }),
        }
    }

    fn rollback(&mut self, reporter: &dyn LifecycleReporter) -> Vec<SubsystemError> {
        let mut failures = Vec::new();
        for step in self.steps.iter_mut().rev().filter(|step| step.held) {
            step.held = false;
            match step.subsystem.release() {
                Ok(()) => reporter.subsystem_released(step.subsystem.kind()),
                Err(error) => {
                    reporter.subsystem_failed(LifecyclePhase::Rollback, &error);
                    failures.push(error);
                }
            }
        }
        failures
    }
}
