use std::collections::HashMap;

use ndarray::{Array1, Array2, Axis};
use serde_json::{Map, Value};

use super::encoder::{Vocabulary, CROP_TYPES, SOIL_TYPES};
use super::error::RequestError;

/// Request field names, as clients send them.
pub mod fields {
    pub const NITROGEN: &str = "Nitrogen";
    pub const PHOSPHORUS: &str = "Phosphorus";
    pub const POTASSIUM: &str = "Potassium";
    pub const TEMPERATURE: &str = "Temperature";
    pub const HUMIDITY: &str = "Humidity";
    pub const PH: &str = "Ph";
    pub const RAINFALL: &str = "Rainfall";
    pub const SOIL_MOISTURE: &str = "SoilMoisture";
    pub const SOIL_TYPE: &str = "soil_type";
    pub const CROP_TYPE: &str = "crop_type";
    pub const STATE_NAME: &str = "StateName";
    pub const DISTRICT_NAME: &str = "DistrictName";
    pub const SEASON: &str = "Season";
}

/// Raw request payload: field name to JSON value, in whatever order the
/// client sent them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestFields {
    values: Map<String, Value>,
}

impl RequestFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts a decoded JSON body. Anything but an object is rejected.
    pub fn from_json(value: Value) -> Result<Self, RequestError> {
        match value {
            Value::Object(values) => Ok(Self { values }),
            other => Err(RequestError::invalid(
                "body",
                format!("expected a JSON object, found {}", json_type(&other)),
            )),
        }
    }

    /// Builds the payload from form pairs; every value is kept as a string.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), Value::String(v.into())))
            .collect();
        Self { values }
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Reads a numeric field. JSON numbers and strings holding a decimal
    /// number are accepted.
    pub fn number(&self, field: &str) -> Result<f32, RequestError> {
        let value = self.get(field).ok_or_else(|| RequestError::missing(field))?;
        let number = match value {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| RequestError::invalid(field, format!("unrepresentable number {}", n)))?,
            Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
                RequestError::invalid(field, format!("could not convert string to float: '{}'", s))
            })?,
            other => {
                return Err(RequestError::invalid(
                    field,
                    format!("expected a number, found {}", json_type(other)),
                ))
            }
        };

        let number = number as f32;
        if !number.is_finite() {
            return Err(RequestError::invalid(field, "value must be a finite number"));
        }
        Ok(number)
    }

    /// Reads a text field.
    pub fn text(&self, field: &str) -> Result<&str, RequestError> {
        match self.get(field) {
            None => Err(RequestError::missing(field)),
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(RequestError::invalid(
                field,
                format!("expected a string, found {}", json_type(other)),
            )),
        }
    }
}

impl From<Map<String, Value>> for RequestFields {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// One input dimension of a model
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureSlot {
    Numeric(&'static str),
    Categorical(Vocabulary),
}

impl FeatureSlot {
    pub fn field(&self) -> &str {
        match self {
            Self::Numeric(field) => field,
            Self::Categorical(vocabulary) => vocabulary.field(),
        }
    }
}

/// Fixed-order numeric input consumed by a model, batch size 1.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Array1<f32>);

impl FeatureVector {
    pub fn new(values: Array1<f32>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &Array1<f32> {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.0.to_vec()
    }

    /// The vector as a `[1, width]` batch
    pub fn to_batch(&self) -> Array2<f32> {
        self.0.clone().insert_axis(Axis(0))
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(values: Vec<f32>) -> Self {
        Self(Array1::from_vec(values))
    }
}

/// Fields extracted from a request, before categorical encoding
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFields {
    numeric: HashMap<String, f32>,
    categorical: HashMap<String, String>,
}

impl ParsedFields {
    pub fn insert_numeric(&mut self, field: impl Into<String>, value: f32) {
        self.numeric.insert(field.into(), value);
    }

    pub fn insert_categorical(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.categorical.insert(field.into(), value.into());
    }

    pub fn numeric(&self, field: &str) -> Option<f32> {
        self.numeric.get(field).copied()
    }

    pub fn categorical(&self, field: &str) -> Option<&str> {
        self.categorical.get(field).map(String::as_str)
    }
}

/// Codes produced by the categorical encoder, keyed by field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedCategories(HashMap<String, usize>);

impl EncodedCategories {
    pub fn insert(&mut self, field: impl Into<String>, code: usize) {
        self.0.insert(field.into(), code);
    }

    pub fn get(&self, field: &str) -> Option<usize> {
        self.0.get(field).copied()
    }
}

/// The column layout a model was trained on.
///
/// The order of the slots is the order of the training columns and is never
/// inferred from the request.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    slots: Vec<FeatureSlot>,
}

impl FeatureSchema {
    pub fn new(slots: Vec<FeatureSlot>) -> Self {
        Self { slots }
    }

    /// `N, P, K, temperature, humidity, ph, rainfall`
    pub fn crop() -> Self {
        use fields::*;
        Self::new(vec![
            FeatureSlot::Numeric(NITROGEN),
            FeatureSlot::Numeric(PHOSPHORUS),
            FeatureSlot::Numeric(POTASSIUM),
            FeatureSlot::Numeric(TEMPERATURE),
            FeatureSlot::Numeric(HUMIDITY),
            FeatureSlot::Numeric(PH),
            FeatureSlot::Numeric(RAINFALL),
        ])
    }

    /// `temperature, humidity, moisture, soil type, crop type, N, P, K`
    pub fn fertilizer() -> Self {
        use fields::*;
        Self::new(vec![
            FeatureSlot::Numeric(TEMPERATURE),
            FeatureSlot::Numeric(HUMIDITY),
            FeatureSlot::Numeric(SOIL_MOISTURE),
            FeatureSlot::Categorical(Vocabulary::label_encoded(SOIL_TYPE, SOIL_TYPES)),
            FeatureSlot::Categorical(Vocabulary::label_encoded(CROP_TYPE, CROP_TYPES)),
            FeatureSlot::Numeric(NITROGEN),
            FeatureSlot::Numeric(PHOSPHORUS),
            FeatureSlot::Numeric(POTASSIUM),
        ])
    }

    pub fn width(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[FeatureSlot] {
        &self.slots
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(FeatureSlot::field)
    }

    /// Extracts every field the schema needs. Fields are checked in schema
    /// order and the first problem is reported.
    pub fn parse(&self, request: &RequestFields) -> Result<ParsedFields, RequestError> {
        let mut parsed = ParsedFields::default();
        for slot in &self.slots {
            match slot {
                FeatureSlot::Numeric(field) => {
                    parsed.insert_numeric(*field, request.number(field)?);
                }
                FeatureSlot::Categorical(vocabulary) => {
                    let field = vocabulary.field();
                    parsed.insert_categorical(field, request.text(field)?);
                }
            }
        }
        Ok(parsed)
    }

    /// Runs the categorical encoder over every categorical slot.
    pub fn encode(&self, parsed: &ParsedFields) -> Result<EncodedCategories, RequestError> {
        let mut encoded = EncodedCategories::default();
        for slot in &self.slots {
            if let FeatureSlot::Categorical(vocabulary) = slot {
                let field = vocabulary.field();
                let value = parsed
                    .categorical(field)
                    .ok_or_else(|| RequestError::missing(field))?;
                encoded.insert(field, vocabulary.encode(value)?);
            }
        }
        Ok(encoded)
    }

    /// Concatenates numeric fields and category codes in slot order.
    pub fn build(
        &self,
        parsed: &ParsedFields,
        encoded: &EncodedCategories,
    ) -> Result<FeatureVector, RequestError> {
        let values = self
            .slots
            .iter()
            .map(|slot| match slot {
                FeatureSlot::Numeric(field) => parsed
                    .numeric(field)
                    .ok_or_else(|| RequestError::missing(*field)),
                FeatureSlot::Categorical(vocabulary) => encoded
                    .get(vocabulary.field())
                    .map(|code| code as f32)
                    .ok_or_else(|| RequestError::missing(vocabulary.field())),
            })
            .collect::<Result<Vec<f32>, _>>()?;
        Ok(FeatureVector::from(values))
    }
}
