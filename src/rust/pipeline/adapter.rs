use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info};
use ort::session::Session;
use ort::tensor::TensorElementType;
use ort::value::{Tensor, ValueType};
use serde::Deserialize;

use super::error::InferenceError;
use super::features::FeatureVector;
use crate::runtime::{create_session_builder, RuntimeConfig};

/// What a model consumes: an encoded feature vector, or a lookup key for
/// table-backed models.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelInput {
    Features(FeatureVector),
    Key(String),
}

/// Model output before decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawOutput {
    /// A class label the model emits directly
    Label(String),
    /// An opaque numeric class code
    Code(i64),
    /// A lookup model had no entry for the key
    Unmapped,
}

/// Uniform prediction interface over every model family.
///
/// Implementations are loaded once and shared read-only between concurrent
/// requests, so `predict` takes `&self` and must not mutate state.
pub trait Predictor: Send + Sync + fmt::Debug {
    fn predict(&self, input: &ModelInput) -> Result<RawOutput, InferenceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LabelType {
    Text,
    Code,
}

/// A trained classifier exported to ONNX.
///
/// The model is expected to:
/// - Accept one float tensor input of shape `[batch_size, feature_width]`
/// - Emit the predicted label as its first output, either as a string tensor
///   or as an int64 tensor of class codes
///
/// Any further outputs (class probabilities) are ignored.
#[derive(Debug)]
pub struct OnnxClassifier {
    model_path: String,
    session: Arc<Session>,
    input_name: String,
    label_output: String,
    label_type: LabelType,
    feature_width: usize,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<OnnxClassifier>();
        assert_send_sync::<StaticLookup>();
    }
};

impl OnnxClassifier {
    /// Loads the model at `path` and checks it against the expected input
    /// width.
    ///
    /// # Errors
    /// - `ModelError` if the file is missing, is not a valid model, or has an
    ///   unusable input/output structure
    /// - `ShapeMismatch` if the model declares a static width other than
    ///   `feature_width`
    pub fn load(
        path: impl AsRef<Path>,
        feature_width: usize,
        config: &RuntimeConfig,
    ) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(InferenceError::ModelError(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        let session = create_session_builder(config)?.commit_from_file(path)?;
        let (input_name, label_output, label_type) = Self::validate_model(&session, feature_width)?;
        info!(
            "Loaded classifier {:?} (input '{}', label output '{}', {:?} labels)",
            path, input_name, label_output, label_type
        );

        Ok(Self {
            model_path: path.to_string_lossy().to_string(),
            session: Arc::new(session),
            input_name,
            label_output,
            label_type,
            feature_width,
        })
    }

    pub fn model_path(&self) -> &str {
        &self.model_path
    }

    pub fn feature_width(&self) -> usize {
        self.feature_width
    }

    /// Validates that the model has the expected input/output structure
    fn validate_model(
        session: &Session,
        feature_width: usize,
    ) -> Result<(String, String, LabelType), InferenceError> {
        let input = session.inputs.first().ok_or_else(|| {
            InferenceError::ModelError("Model must have at least 1 input for features".into())
        })?;
        if let ValueType::Tensor { dimensions, .. } = &input.input_type {
            // dynamic dimensions are reported as -1
            if let Some(&width) = dimensions.last() {
                if width > 0 && width as usize != feature_width {
                    return Err(InferenceError::ShapeMismatch {
                        expected: feature_width,
                        actual: width as usize,
                    });
                }
            }
        }

        let output = session.outputs.first().ok_or_else(|| {
            InferenceError::ModelError("Model must have at least 1 output for labels".into())
        })?;
        let label_type = match &output.output_type {
            ValueType::Tensor { ty: TensorElementType::String, .. } => LabelType::Text,
            ValueType::Tensor { ty: TensorElementType::Int64, .. } => LabelType::Code,
            other => {
                return Err(InferenceError::ModelError(format!(
                    "Unsupported label output type: {:?}",
                    other
                )))
            }
        };

        Ok((input.name.clone(), output.name.clone(), label_type))
    }

    fn run(&self, features: &FeatureVector) -> Result<RawOutput, InferenceError> {
        if features.len() != self.feature_width {
            return Err(InferenceError::ShapeMismatch {
                expected: self.feature_width,
                actual: features.len(),
            });
        }

        let mut input_tensors = HashMap::new();
        input_tensors.insert(
            self.input_name.as_str(),
            Tensor::from_array(features.to_batch()).map_err(|e| {
                InferenceError::ModelError(format!("Failed to create input tensor: {}", e))
            })?,
        );

        let outputs = self
            .session
            .run(input_tensors)
            .map_err(|e| InferenceError::ModelError(format!("Failed to run model: {}", e)))?;
        let labels = &outputs[self.label_output.as_str()];

        let raw = match self.label_type {
            LabelType::Text => labels
                .try_extract_string_tensor()
                .map_err(|e| InferenceError::OutputError(format!("Failed to extract labels: {}", e)))?
                .iter()
                .next()
                .cloned()
                .map(RawOutput::Label),
            LabelType::Code => labels
                .try_extract_tensor::<i64>()
                .map_err(|e| InferenceError::OutputError(format!("Failed to extract labels: {}", e)))?
                .iter()
                .next()
                .copied()
                .map(RawOutput::Code),
        };
        raw.ok_or_else(|| InferenceError::OutputError("Model returned no label".into()))
    }
}

impl Predictor for OnnxClassifier {
    fn predict(&self, input: &ModelInput) -> Result<RawOutput, InferenceError> {
        match input {
            ModelInput::Features(features) => self.run(features),
            ModelInput::Key(_) => Err(InferenceError::UnsupportedInput(
                "classifier expects a feature vector".into(),
            )),
        }
    }
}

/// A model that is a plain table: region name to crop.
///
/// Keys are normalised with [`normalize_region`] both when the table is built
/// and when it is queried, so lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "HashMap<String, String>")]
pub struct StaticLookup {
    table: HashMap<String, String>,
}

impl StaticLookup {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let table = entries
            .into_iter()
            .map(|(region, crop)| (normalize_region(region.as_ref()), crop.into()))
            .collect();
        Self { table }
    }

    /// The main crop of each Indian state.
    pub fn regional_crops() -> Self {
        Self::new([
            ("Andhra Pradesh", "Rice"),
            ("Arunachal Pradesh", "Oranges"),
            ("Assam", "Tea"),
            ("Bihar", "Rice"),
            ("Chhattisgarh", "Rice"),
            ("Goa", "Coconut"),
            ("Gujarat", "Cotton"),
            ("Haryana", "Wheat"),
            ("Himachal Pradesh", "Apple"),
            ("Jharkhand", "Rice"),
            ("Karnataka", "Sugarcane"),
            ("Kerala", "Rubber"),
            ("Madhya Pradesh", "Wheat"),
            ("Maharashtra", "Sugarcane"),
            ("Manipur", "Rice"),
            ("Meghalaya", "Maize"),
            ("Mizoram", "Maize"),
            ("Nagaland", "Maize"),
            ("Odisha", "Rice"),
            ("Punjab", "Wheat"),
            ("Rajasthan", "Wheat"),
            ("Sikkim", "Maize"),
            ("Tamil Nadu", "Rice"),
            ("Telangana", "Rice"),
            ("Tripura", "Rice"),
            ("Uttar Pradesh", "Sugarcane"),
            ("Uttarakhand", "Rice"),
            ("West Bengal", "Rice"),
        ])
    }

    /// Parses a JSON object of region to crop.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn lookup(&self, region: &str) -> Option<&str> {
        self.table.get(&normalize_region(region)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl From<HashMap<String, String>> for StaticLookup {
    fn from(table: HashMap<String, String>) -> Self {
        Self::new(table)
    }
}

impl Predictor for StaticLookup {
    fn predict(&self, input: &ModelInput) -> Result<RawOutput, InferenceError> {
        match input {
            ModelInput::Key(region) => {
                let raw = self
                    .lookup(region)
                    .map(|crop| RawOutput::Label(crop.to_string()))
                    .unwrap_or(RawOutput::Unmapped);
                debug!("Region lookup '{}' -> {:?}", region, raw);
                Ok(raw)
            }
            ModelInput::Features(_) => Err(InferenceError::UnsupportedInput(
                "lookup table expects a region key".into(),
            )),
        }
    }
}

/// Title-cases a region name: the first letter of every word upper case, the
/// rest lower case. Surrounding whitespace is dropped.
pub fn normalize_region(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut previous_is_letter = false;
    for c in name.trim().chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                normalized.extend(c.to_lowercase());
            } else {
                normalized.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            normalized.push(c);
            previous_is_letter = false;
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_region() {
        assert_eq!(normalize_region("kerala"), "Kerala");
        assert_eq!(normalize_region("TAMIL NADU"), "Tamil Nadu");
        assert_eq!(normalize_region("  west bengal "), "West Bengal");
        assert_eq!(normalize_region("jammu-and-kashmir"), "Jammu-And-Kashmir");
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let table = StaticLookup::regional_crops();
        assert_eq!(table.len(), 28);
        assert_eq!(table.lookup("kerala"), Some("Rubber"));
        assert_eq!(table.lookup("Kerala"), Some("Rubber"));
        assert_eq!(table.lookup("HIMACHAL pradesh"), Some("Apple"));
        assert_eq!(table.lookup("Atlantis"), None);
    }

    #[test]
    fn test_lookup_predictor() {
        let table = StaticLookup::regional_crops();
        assert_eq!(
            table.predict(&ModelInput::Key("assam".into())).unwrap(),
            RawOutput::Label("Tea".into())
        );
        assert_eq!(
            table.predict(&ModelInput::Key("Atlantis".into())).unwrap(),
            RawOutput::Unmapped
        );
        assert!(matches!(
            table.predict(&ModelInput::Features(vec![1.0f32].into())),
            Err(InferenceError::UnsupportedInput(_))
        ));
    }

    #[test]
    fn test_lookup_from_json_normalizes_keys() {
        let table = StaticLookup::from_json(br#"{"goa": "Cashew", "PUNJAB": "Rice"}"#).unwrap();
        assert_eq!(table.lookup("Goa"), Some("Cashew"));
        assert_eq!(table.lookup("punjab"), Some("Rice"));
        assert!(StaticLookup::from_json(b"[1, 2]").is_err());
    }

    #[test]
    fn test_missing_model_file() {
        let result = OnnxClassifier::load("/nonexistent/crop_classifier.onnx", 7, &RuntimeConfig::default());
        assert!(matches!(result, Err(InferenceError::ModelError(_))));
    }
}
