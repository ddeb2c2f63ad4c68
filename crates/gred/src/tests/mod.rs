//! Test suites for the module lifecycle controller.

mod support;
