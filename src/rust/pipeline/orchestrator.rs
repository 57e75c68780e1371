use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::{debug, error, trace, warn};
use serde::{Deserialize, Serialize};

use super::adapter::{normalize_region, ModelInput, Predictor, RawOutput, StaticLookup};
use super::decoder::ResultDecoder;
use super::error::{Fault, PipelineError, RequestError, Stage};
use super::features::{fields, FeatureSchema, RequestFields};
use crate::model_manager::ModelError;
use crate::models::ModelKind;

/// Successful response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub message: String,
}

/// Fields of a regional lookup request. District and season are required
/// but do not influence the answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionQuery {
    pub state: String,
    pub district: String,
    pub season: String,
}

impl RegionQuery {
    pub fn parse(request: &RequestFields) -> Result<Self, RequestError> {
        Ok(Self {
            state: request.text(fields::STATE_NAME)?.to_string(),
            district: request.text(fields::DISTRICT_NAME)?.to_string(),
            season: request.text(fields::SEASON)?.to_string(),
        })
    }
}

/// Runs requests through parse, encode, predict and decode against the
/// models loaded at startup.
///
/// A `Recommender` is immutable once built and is meant to be shared behind
/// an `Arc` by every request handler.
#[derive(Debug, Clone)]
pub struct Recommender {
    crop: Arc<dyn Predictor>,
    fertilizer: Arc<dyn Predictor>,
    region: Arc<dyn Predictor>,
    crop_schema: FeatureSchema,
    fertilizer_schema: FeatureSchema,
    decoder: ResultDecoder,
}

impl Recommender {
    /// Creates a new RecommenderBuilder for fluent construction
    pub fn builder() -> RecommenderBuilder {
        RecommenderBuilder::new()
    }

    pub fn recommend(
        &self,
        kind: ModelKind,
        request: &RequestFields,
    ) -> Result<Recommendation, PipelineError> {
        trace!("{} request: {:?}", kind, Stage::Received);
        let result = match kind {
            ModelKind::Crop => self.run_classifier(kind, &self.crop_schema, self.crop.as_ref(), request),
            ModelKind::Fertilizer => {
                self.run_classifier(kind, &self.fertilizer_schema, self.fertilizer.as_ref(), request)
            }
            ModelKind::Region => self.run_lookup(request),
        };

        match &result {
            Ok(recommendation) => {
                debug!("{} request {:?}: {}", kind, Stage::Responded, recommendation.message)
            }
            Err(err) if err.is_caller_error() => {
                warn!("{} request rejected before {:?}: {}", kind, err.kind().failed_stage(), err)
            }
            Err(err) => error!("{} request failed before {:?}: {}", kind, err.kind().failed_stage(), err),
        }
        result
    }

    pub fn recommend_crop(&self, request: &RequestFields) -> Result<Recommendation, PipelineError> {
        self.recommend(ModelKind::Crop, request)
    }

    pub fn recommend_fertilizer(&self, request: &RequestFields) -> Result<Recommendation, PipelineError> {
        self.recommend(ModelKind::Fertilizer, request)
    }

    pub fn recommend_region(&self, request: &RequestFields) -> Result<Recommendation, PipelineError> {
        self.recommend(ModelKind::Region, request)
    }

    fn run_classifier(
        &self,
        kind: ModelKind,
        schema: &FeatureSchema,
        predictor: &dyn Predictor,
        request: &RequestFields,
    ) -> Result<Recommendation, PipelineError> {
        let parsed = schema.parse(request)?;
        trace!("{} request: {:?}", kind, Stage::Parsed);

        let encoded = schema.encode(&parsed)?;
        let features = schema.build(&parsed, &encoded)?;
        trace!("{} request: {:?} {:?}", kind, Stage::Encoded, features.to_vec());

        let raw = Self::predict(kind, predictor, &ModelInput::Features(features))?;
        self.finish(kind, raw)
    }

    fn run_lookup(&self, request: &RequestFields) -> Result<Recommendation, PipelineError> {
        let kind = ModelKind::Region;
        let query = RegionQuery::parse(request)?;
        trace!("{} request: {:?} {:?}", kind, Stage::Parsed, query);

        let key = normalize_region(&query.state);
        trace!("{} request: {:?} '{}'", kind, Stage::Encoded, key);

        let raw = Self::predict(kind, self.region.as_ref(), &ModelInput::Key(key))?;
        self.finish(kind, raw)
    }

    /// Invokes the model. A panicking model is reported as an unexpected
    /// fault instead of tearing down the worker.
    fn predict(
        kind: ModelKind,
        predictor: &dyn Predictor,
        input: &ModelInput,
    ) -> Result<RawOutput, PipelineError> {
        let raw = panic::catch_unwind(AssertUnwindSafe(|| predictor.predict(input)))
            .map_err(|_| Fault::Unexpected(format!("{} model panicked during prediction", kind)))??;
        trace!("{} request: {:?} {:?}", kind, Stage::Predicted, raw);
        Ok(raw)
    }

    fn finish(&self, kind: ModelKind, raw: RawOutput) -> Result<Recommendation, PipelineError> {
        let decoded = self.decoder.decode(kind, raw);
        trace!("{} request: {:?} {:?}", kind, Stage::Decoded, decoded);
        Ok(Recommendation {
            message: decoded.into_message(kind),
        })
    }
}

/// A builder for constructing a Recommender with a fluent interface.
#[derive(Debug, Default)]
pub struct RecommenderBuilder {
    crop: Option<Arc<dyn Predictor>>,
    fertilizer: Option<Arc<dyn Predictor>>,
    region: Option<Arc<dyn Predictor>>,
    decoder: Option<ResultDecoder>,
}

impl RecommenderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_crop_model(mut self, model: impl Predictor + 'static) -> Self {
        self.crop = Some(Arc::new(model));
        self
    }

    pub fn with_fertilizer_model(mut self, model: impl Predictor + 'static) -> Self {
        self.fertilizer = Some(Arc::new(model));
        self
    }

    /// Replaces the built-in regional table
    pub fn with_region_model(mut self, model: impl Predictor + 'static) -> Self {
        self.region = Some(Arc::new(model));
        self
    }

    pub fn with_decoder(mut self, decoder: ResultDecoder) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Builds and returns the final Recommender instance
    ///
    /// # Errors
    /// `NotConfigured` when the crop or fertilizer model is missing. The
    /// region model falls back to [`StaticLookup::regional_crops`].
    pub fn build(self) -> Result<Recommender, ModelError> {
        let crop = self.crop.ok_or(ModelError::NotConfigured(ModelKind::Crop))?;
        let fertilizer = self
            .fertilizer
            .ok_or(ModelError::NotConfigured(ModelKind::Fertilizer))?;
        let region = self
            .region
            .unwrap_or_else(|| Arc::new(StaticLookup::regional_crops()));

        Ok(Recommender {
            crop,
            fertilizer,
            region,
            crop_schema: FeatureSchema::crop(),
            fertilizer_schema: FeatureSchema::fertilizer(),
            decoder: self.decoder.unwrap_or_default(),
        })
    }
}
