//! Log subscriber shared by the runner and the entry points.
//!
//! Events go to stderr. JSON output flattens fields into the top-level object
//! so collectors can index `lock_group`, `subsystem` and `phase` directly.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, debug, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use gre_config::{Config, LogFormat};

const TELEMETRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::telemetry");

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

type BoxedSubscriber = Box<dyn Subscriber + Send + Sync>;

/// Marker returned once the global subscriber is in place.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Failures while building or installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The filter directive did not parse.
    #[error("invalid log filter '{directive}': {message}")]
    Filter {
        /// Directive as configured.
        directive: String,
        /// Why `EnvFilter` rejected it.
        message: String,
    },
    /// Something else claimed the global default first.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(#[source] SetGlobalDefaultError),
}

/// Installs the subscriber for `config` unless one was already installed by
/// this module. The first configuration wins.
///
/// ```rust
/// # fn main() -> Result<(), gred::TelemetryError> {
/// let quiet = gre_config::Config {
///     log_filter: "warn".to_owned(),
///     ..gre_config::Config::default()
/// };
/// gred::telemetry::initialise(&quiet)?;
/// gred::telemetry::initialise(&gre_config::Config::default())?;
/// # Ok(())
/// # }
/// ```
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| {
            tracing::subscriber::set_global_default(build_subscriber(config)?)
                .map_err(TelemetryError::Subscriber)?;
            debug!(
                target: TELEMETRY_TARGET,
                filter = config.log_filter(),
                format = %config.log_format(),
                "log subscriber installed"
            );
            Ok(())
        })
        .map(|_| TelemetryHandle)
}

/// Builds the subscriber for `config` without touching global state.
pub fn build_subscriber(config: &Config) -> Result<BoxedSubscriber, TelemetryError> {
    let directive = config.log_filter();
    let filter = EnvFilter::try_new(directive).map_err(|error| TelemetryError::Filter {
        directive: directive.to_owned(),
        message: error.to_string(),
    })?;

    let stderr_is_tty = io::stderr().is_terminal();
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(stderr_is_tty)
        .with_target(true)
        .with_thread_names(false)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let subscriber: BoxedSubscriber = match config.log_format() {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    };
    Ok(subscriber)
}
