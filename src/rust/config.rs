use std::net::SocketAddr;
use std::path::PathBuf;

use crate::model_manager::ModelManager;
use crate::runtime::RuntimeConfig;

/// Default listen address of the HTTP service
pub const DEFAULT_BIND: &str = "127.0.0.1:5000";

/// Process-wide settings, fixed once at startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind: SocketAddr,
    pub models_dir: PathBuf,
    /// Refuse to start unless the models directory has a manifest
    pub require_manifest: bool,
    pub runtime: RuntimeConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 5000)),
            models_dir: ModelManager::get_default_models_dir(),
            require_manifest: false,
            runtime: RuntimeConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    pub fn with_models_dir(mut self, models_dir: impl Into<PathBuf>) -> Self {
        self.models_dir = models_dir.into();
        self
    }

    pub fn with_runtime_config(mut self, runtime: RuntimeConfig) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn with_require_manifest(mut self, require: bool) -> Self {
        self.require_manifest = require;
        self
    }
}
