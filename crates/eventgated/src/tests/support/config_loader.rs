//! Configuration loaders covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::OrthoError;

use eventgate_config::{Config, ListenEndpoint};

use crate::bootstrap::ConfigLoader;

/// Loader producing a loopback configuration on an ephemeral port.
#[derive(Debug, Clone, Default)]
pub struct TestConfigLoader {
    overrides: Option<Config>,
}

impl TestConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `config` with its listen address forced onto loopback.
    pub fn with_config(config: Config) -> Self {
        Self {
            overrides: Some(config),
        }
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let base = self.overrides.clone().unwrap_or_default();
        Ok(Config {
            listen: ListenEndpoint {
                host: "127.0.0.1".to_owned(),
                port: 0,
            },
            ..base
        })
    }
}

/// Loader that fails by passing an unsupported listen address.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("eventgated"),
            OsString::from("--listen"),
            OsString::from("unix:///tmp/eventgate.sock"),
        ];
        Config::load_from_iter(args)
    }
}
