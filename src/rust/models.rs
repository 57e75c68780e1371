use std::fmt;

/// The recommendation models served by the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    /// Crop classifier trained on soil nutrients and climate readings.
    ///
    /// Characteristics:
    /// - Input width: 7
    /// - Output: crop name as a string label
    Crop,
    /// Fertilizer classifier (random forest) over climate, soil and crop type.
    ///
    /// Characteristics:
    /// - Input width: 8 (two label-encoded categorical columns)
    /// - Output: integer fertilizer code
    Fertilizer,
    /// Regional crop table keyed by state name. Not a learned model.
    Region,
}

/// How a model's raw output has to be read back into a label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputEncoding {
    /// The model emits the final label
    Label,
    /// The model emits an opaque class code that needs a lookup table
    Code,
    /// The model is itself a lookup table that may have no entry
    Lookup,
}

/// Characteristics of a model including its input shape and output encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCharacteristics {
    /// Number of features the model consumes (0 for lookup tables)
    pub feature_width: usize,
    /// Encoding of the model output
    pub output: OutputEncoding,
    /// File name of the artifact inside the models directory
    pub artifact_file: &'static str,
    /// Whether startup must fail when the artifact is absent
    pub required: bool,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::Crop, ModelKind::Fertilizer, ModelKind::Region];

    /// Short name used in manifests and log lines
    pub fn name(&self) -> &'static str {
        match self {
            Self::Crop => "crop",
            Self::Fertilizer => "fertilizer",
            Self::Region => "region",
        }
    }

    /// Get the characteristics of the model
    pub fn characteristics(&self) -> ModelCharacteristics {
        match self {
            Self::Crop => ModelCharacteristics {
                feature_width: 7,
                output: OutputEncoding::Label,
                artifact_file: "crop_classifier.onnx",
                required: true,
            },
            Self::Fertilizer => ModelCharacteristics {
                feature_width: 8,
                output: OutputEncoding::Code,
                artifact_file: "fertilizer_classifier.onnx",
                required: true,
            },
            Self::Region => ModelCharacteristics {
                feature_width: 0,
                output: OutputEncoding::Lookup,
                artifact_file: "region_crops.json",
                required: false,
            },
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
