//! Feature encoding and inference pipeline.
//!
//! A request flows through four steps:
//! 1. [`FeatureSchema::parse`] pulls the fields a model needs out of the payload
//! 2. [`FeatureSchema::encode`] maps categorical text to vocabulary codes
//! 3. [`Predictor::predict`] runs the model on the assembled [`FeatureVector`]
//! 4. [`ResultDecoder::decode`] turns the raw output back into a label
//!
//! [`Recommender`] drives the steps for each endpoint.

mod adapter;
mod decoder;
mod encoder;
mod error;
mod features;
mod orchestrator;

pub use adapter::{normalize_region, ModelInput, OnnxClassifier, Predictor, RawOutput, StaticLookup};
pub use decoder::{CodeTable, Decoded, ResultDecoder, REGION_NOT_AVAILABLE, UNKNOWN_LABEL};
pub use encoder::{Vocabulary, CROP_TYPES, SOIL_TYPES};
pub use error::{FailureKind, Fault, InferenceError, PipelineError, RequestError, Stage};
pub use features::{
    fields, EncodedCategories, FeatureSchema, FeatureSlot, FeatureVector, ParsedFields, RequestFields,
};
pub use orchestrator::{Recommendation, Recommender, RecommenderBuilder, RegionQuery};
