use ort::Error as OrtError;
use std::fmt;

/// Stages a request moves through on its way to a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Parsed,
    Encoded,
    Predicted,
    Decoded,
    Responded,
}

/// Classification of a failed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    MissingField,
    InvalidValue,
    UnknownCategory,
    InferenceError,
    Unexpected,
}

impl FailureKind {
    /// The stage the request could not enter.
    pub fn failed_stage(&self) -> Stage {
        match self {
            Self::MissingField | Self::InvalidValue => Stage::Parsed,
            Self::UnknownCategory => Stage::Encoded,
            Self::InferenceError | Self::Unexpected => Stage::Predicted,
        }
    }

    /// Whether the caller can fix the failure by changing the request
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::MissingField | Self::InvalidValue | Self::UnknownCategory)
    }
}

/// A request the pipeline refuses to process. These are expected outcomes
/// and always name the offending field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("Missing form field - {field}")]
    MissingField { field: String },
    #[error("Invalid form data - {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("Invalid form data - {field}: unknown category '{value}'")]
    UnknownCategory { field: String, value: String },
}

impl RequestError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField { field: field.into() }
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Self::MissingField { field }
            | Self::InvalidValue { field, .. }
            | Self::UnknownCategory { field, .. } => field,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::MissingField { .. } => FailureKind::MissingField,
            Self::InvalidValue { .. } => FailureKind::InvalidValue,
            Self::UnknownCategory { .. } => FailureKind::UnknownCategory,
        }
    }
}

/// Represents the different types of errors a model adapter can raise.
#[derive(Debug)]
pub enum InferenceError {
    /// The feature vector does not have the width the model was trained on
    ShapeMismatch { expected: usize, actual: usize },
    /// The adapter was handed an input variant it cannot consume
    UnsupportedInput(String),
    /// Error occurred while loading or running the ONNX model
    ModelError(String),
    /// The model ran but its output could not be read
    OutputError(String),
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeMismatch { expected, actual } => write!(
                f,
                "Shape mismatch: model expects {} features, got {}",
                expected, actual
            ),
            Self::UnsupportedInput(msg) => write!(f, "Unsupported input: {}", msg),
            Self::ModelError(msg) => write!(f, "Model error: {}", msg),
            Self::OutputError(msg) => write!(f, "Output error: {}", msg),
        }
    }
}

impl std::error::Error for InferenceError {}

impl From<OrtError> for InferenceError {
    fn from(err: OrtError) -> Self {
        InferenceError::ModelError(err.to_string())
    }
}

/// Internal faults. Never the caller's doing, never retried.
#[derive(Debug, thiserror::Error)]
pub enum Fault {
    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Outcome of a failed pipeline run: either a rejected request or a fault.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Rejected(#[from] RequestError),
    #[error(transparent)]
    Fault(#[from] Fault),
}

impl From<InferenceError> for PipelineError {
    fn from(err: InferenceError) -> Self {
        PipelineError::Fault(Fault::Inference(err))
    }
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Rejected(err) => err.kind(),
            Self::Fault(Fault::Inference(_)) => FailureKind::InferenceError,
            Self::Fault(Fault::Unexpected(_)) => FailureKind::Unexpected,
        }
    }

    /// Name of the offending field for rejected requests
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Rejected(err) => Some(err.field()),
            Self::Fault(_) => None,
        }
    }

    pub fn is_caller_error(&self) -> bool {
        self.kind().is_caller_error()
    }
}
