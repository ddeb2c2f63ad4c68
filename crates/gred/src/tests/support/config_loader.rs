//! Configuration loaders for bootstrap tests.

use std::ffi::OsString;
use std::sync::Arc;

use gre_config::Config;
use ortho_config::OrthoError;

use crate::{ConfigLoader, StaticConfigLoader};

/// Loader yielding the built-in defaults.
#[must_use]
pub fn test_config_loader() -> StaticConfigLoader {
    StaticConfigLoader::new(Config::default())
}

/// Loader that runs the layered load over an explicit argument list.
pub struct ArgumentConfigLoader {
    args: Vec<OsString>,
}

impl ArgumentConfigLoader {
    pub fn new<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl ConfigLoader for ArgumentConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter(self.args.clone())
    }
}

/// Loader that fails by passing an unparsable protocol number.
#[must_use]
pub fn failing_config_loader() -> ArgumentConfigLoader {
    ArgumentConfigLoader::new(["gred", "--protocol-number", "not-a-number"])
}
