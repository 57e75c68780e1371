//! Crop and fertilizer recommendations from pre-trained classifiers.
//!
//! Client payloads are turned into the fixed feature vector each model was
//! trained on, the model is run, and its output is decoded into a message.
//!
//! # Basic Usage
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use bharat_agro::{InferenceError, ModelInput, Predictor, RawOutput, Recommender, RequestFields};
//!
//! // Any type implementing `Predictor` can stand in for a trained model.
//! #[derive(Debug)]
//! struct AlwaysRice;
//!
//! impl Predictor for AlwaysRice {
//!     fn predict(&self, _input: &ModelInput) -> Result<RawOutput, InferenceError> {
//!         Ok(RawOutput::Label("rice".into()))
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct AlwaysUrea;
//!
//! impl Predictor for AlwaysUrea {
//!     fn predict(&self, _input: &ModelInput) -> Result<RawOutput, InferenceError> {
//!         Ok(RawOutput::Code(6))
//!     }
//! }
//!
//! let recommender = Recommender::builder()
//!     .with_crop_model(AlwaysRice)
//!     .with_fertilizer_model(AlwaysUrea)
//!     .build()?;
//!
//! let request = RequestFields::new()
//!     .with("Nitrogen", 90)
//!     .with("Phosphorus", 42)
//!     .with("Potassium", 43)
//!     .with("Temperature", 20.8)
//!     .with("Humidity", 82)
//!     .with("Ph", 6.5)
//!     .with("Rainfall", 202.9);
//!
//! let recommendation = recommender.recommend_crop(&request)?;
//! assert_eq!(recommendation.message, "rice is the best crop to be cultivated there.");
//! # Ok(())
//! # }
//! ```
//!
//! # Loading trained models
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use bharat_agro::{ModelManager, RuntimeConfig};
//!
//! let manager = ModelManager::new("Models")?;
//! let recommender = manager.load_recommender(&RuntimeConfig::default())?;
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! A [`Recommender`] is immutable after construction. Share it with `Arc`;
//! every predictor is `Send + Sync` and is only ever read.

pub mod config;
pub mod model_manager;
pub mod models;
pub mod pipeline;
mod runtime;
pub mod server;

pub use config::ServiceConfig;
pub use model_manager::{ArtifactInfo, Manifest, ModelError, ModelManager};
pub use models::{ModelCharacteristics, ModelKind, OutputEncoding};
pub use pipeline::{
    FailureKind, Fault, FeatureSchema, FeatureVector, InferenceError, ModelInput, OnnxClassifier,
    PipelineError, Predictor, RawOutput, Recommendation, Recommender, RequestError, RequestFields,
    ResultDecoder, StaticLookup, Vocabulary,
};
pub use runtime::{create_session_builder, OptimizationLevel, RuntimeConfig};

pub fn init_logger() {
    env_logger::init();
}
