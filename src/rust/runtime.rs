use std::sync::OnceLock;

use log::{error, info};
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;

use crate::pipeline::InferenceError;

static ENVIRONMENT: OnceLock<Result<(), String>> = OnceLock::new();

/// Graph optimizations ONNX Runtime applies when a classifier is loaded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OptimizationLevel {
    Disabled,
    Basic,
    Extended,
    #[default]
    All,
}

impl OptimizationLevel {
    fn to_ort(self) -> GraphOptimizationLevel {
        match self {
            Self::Disabled => GraphOptimizationLevel::Disable,
            Self::Basic => GraphOptimizationLevel::Level1,
            Self::Extended => GraphOptimizationLevel::Level2,
            Self::All => GraphOptimizationLevel::Level3,
        }
    }
}

/// ONNX Runtime settings shared by every classifier session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// 0 lets ONNX Runtime decide
    pub inter_threads: usize,
    pub intra_threads: usize,
    pub optimization: OptimizationLevel,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            inter_threads: 0,
            // the models are tiny; one thread per request keeps workers independent
            intra_threads: 1,
            optimization: OptimizationLevel::default(),
        }
    }
}

/// Sets up the process-wide ONNX Runtime environment on first use.
///
/// The outcome of the first attempt is remembered; a failed initialisation
/// is reported to every later caller instead of being retried.
pub fn ensure_initialized() -> Result<(), InferenceError> {
    ENVIRONMENT
        .get_or_init(|| match ort::init().with_name("bharat-agro").commit() {
            Ok(_) => {
                info!("ONNX Runtime environment initialised");
                Ok(())
            }
            Err(e) => {
                error!("Failed to initialize ONNX Runtime environment: {}", e);
                Err(e.to_string())
            }
        })
        .clone()
        .map_err(|msg| InferenceError::ModelError(format!("ONNX Runtime unavailable: {}", msg)))
}

/// Returns a session builder configured from `config`, initialising the
/// runtime environment if needed.
pub fn create_session_builder(config: &RuntimeConfig) -> Result<SessionBuilder, InferenceError> {
    ensure_initialized()?;
    let mut builder = Session::builder()?;

    if config.inter_threads > 0 {
        builder = builder.with_inter_threads(config.inter_threads)?;
    }
    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads)?;
    }

    Ok(builder.with_optimization_level(config.optimization.to_ort())?)
}
